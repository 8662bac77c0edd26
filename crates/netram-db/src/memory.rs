//! In-process document store with optional JSON snapshot persistence.
//!
//! Collections live behind a single `RwLock`. When a snapshot path is set the
//! whole store is loaded from it on open and rewritten after every mutation
//! (written to a temp file, then renamed over the old one).

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::store::{into_fields, Document, DocumentStore, Query, StoreStats};

type Collections = HashMap<String, BTreeMap<String, Document>>;

pub struct MemoryStore {
    collections: RwLock<Collections>,
    snapshot: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Volatile store; contents vanish with the process.
    pub fn new() -> Self {
        Self { collections: RwLock::new(HashMap::new()), snapshot: None }
    }

    /// Open a snapshot-backed store, loading existing contents if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let collections: Collections = if tokio::fs::try_exists(&path).await? {
            let raw = tokio::fs::read(&path).await?;
            if raw.is_empty() {
                HashMap::new()
            } else {
                serde_json::from_slice(&raw)
                    .map_err(|e| StoreError::Snapshot(format!("{}: {e}", path.display())))?
            }
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            HashMap::new()
        };

        let total: usize = collections.values().map(BTreeMap::len).sum();
        info!(path = %path.display(), documents = total, "Opened document store snapshot");

        Ok(Self { collections: RwLock::new(collections), snapshot: Some(path) })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    async fn persist(&self, collections: &Collections) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(collections)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(bytes = bytes.len(), "Snapshot written");
        Ok(())
    }

    /// Puts `doc` under `id` (or removes it when `None`) and persists. A
    /// failed snapshot write restores the previous entry before returning
    /// the error, so memory never runs ahead of disk.
    async fn write_entry(
        &self,
        collections: &mut Collections,
        collection: &str,
        id: &str,
        doc: Option<Document>,
    ) -> Result<()> {
        let created = !collections.contains_key(collection);
        let coll = collections.entry(collection.to_string()).or_default();
        let previous = match doc {
            Some(doc) => coll.insert(id.to_string(), doc),
            None => coll.remove(id),
        };

        let Err(err) = self.persist(collections).await else {
            return Ok(());
        };
        warn!(collection, id, error = %err, "Snapshot write failed; change rolled back");
        if let Some(coll) = collections.get_mut(collection) {
            match previous {
                Some(prev) => {
                    coll.insert(id.to_string(), prev);
                }
                None => {
                    coll.remove(id);
                }
            }
        }
        if created {
            collections.remove(collection);
        }
        Err(err)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, data: Value) -> Result<Document> {
        let id = uuid::Uuid::new_v4().to_string();
        let doc = Document::new(id.clone(), into_fields(data)?);
        let mut guard = self.collections.write().await;
        self.write_entry(&mut guard, collection, &id, Some(doc.clone())).await?;
        Ok(doc)
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<Document> {
        if id.trim().is_empty() {
            return Err(StoreError::InvalidDocument("empty document id".to_string()));
        }
        let fields = into_fields(data)?;
        let mut guard = self.collections.write().await;
        let doc = match guard.get(collection).and_then(|c| c.get(id)) {
            Some(existing) => Document {
                id: id.to_string(),
                created_at: existing.created_at,
                updated_at: Some(Utc::now()),
                data: fields,
            },
            None => Document::new(id.to_string(), fields),
        };
        self.write_entry(&mut guard, collection, id, Some(doc.clone())).await?;
        Ok(doc)
    }

    async fn insert_unique(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        unique_field: &str,
    ) -> Result<Document> {
        if id.trim().is_empty() {
            return Err(StoreError::InvalidDocument("empty document id".to_string()));
        }
        let fields = into_fields(data)?;
        let key = fields.get(unique_field).cloned().unwrap_or(Value::Null);
        let mut guard = self.collections.write().await;
        if let Some(coll) = guard.get(collection) {
            let clash = coll.contains_key(id)
                || coll.values().any(|d| d.data.get(unique_field) == Some(&key));
            if clash {
                let shown = key.as_str().map(str::to_string).unwrap_or_else(|| key.to_string());
                return Err(StoreError::Duplicate(format!("{unique_field} {shown}")));
            }
        }
        let doc = Document::new(id.to_string(), fields);
        self.write_entry(&mut guard, collection, id, Some(doc.clone())).await?;
        Ok(doc)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let guard = self.collections.read().await;
        Ok(guard.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Document> {
        let fields = into_fields(patch)?;
        let mut guard = self.collections.write().await;
        let mut doc = guard
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        for (k, v) in fields {
            doc.data.insert(k, v);
        }
        doc.updated_at = Some(Utc::now());
        self.write_entry(&mut guard, collection, id, Some(doc.clone())).await?;
        Ok(doc)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let mut guard = self.collections.write().await;
        if !guard.get(collection).is_some_and(|c| c.contains_key(id)) {
            return Ok(false);
        }
        self.write_entry(&mut guard, collection, id, None).await?;
        Ok(true)
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let guard = self.collections.read().await;
        Ok(match guard.get(collection) {
            Some(coll) => query.apply(coll.values()),
            None => Vec::new(),
        })
    }

    async fn count(&self, collection: &str, query: &Query) -> Result<u64> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|c| c.values().filter(|d| query.matches(d)).count() as u64)
            .unwrap_or(0))
    }

    async fn stats(&self) -> Result<StoreStats> {
        let guard = self.collections.read().await;
        Ok(StoreStats {
            collections: guard.iter().map(|(k, v)| (k.clone(), v.len() as u64)).collect(),
            persistent: self.snapshot.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Direction, FilterOp};
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_get_update_delete() {
        let store = MemoryStore::new();
        let doc = store.insert("patients", json!({"name": "Jane", "id": "spoofed"})).await.unwrap();
        assert_ne!(doc.id, "spoofed");

        let fetched = store.get("patients", &doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.data["name"], "Jane");
        assert!(fetched.updated_at.is_none());

        let updated = store.update("patients", &doc.id, json!({"phone": "5551234567"})).await.unwrap();
        assert_eq!(updated.data["name"], "Jane");
        assert_eq!(updated.data["phone"], "5551234567");
        assert!(updated.updated_at.is_some());

        assert!(store.delete("patients", &doc.id).await.unwrap());
        assert!(!store.delete("patients", &doc.id).await.unwrap());
        assert!(store.get("patients", &doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update("patients", "nope", json!({"a": 1})).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_set_preserves_created_at() {
        let store = MemoryStore::new();
        let first = store.set("users", "uid-1", json!({"email": "a@b.co"})).await.unwrap();
        let second = store.set("users", "uid-1", json!({"email": "c@d.co"})).await.unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at.is_some());
        assert_eq!(second.data["email"], "c@d.co");
    }

    #[tokio::test]
    async fn test_query_and_count() {
        let store = MemoryStore::new();
        for (date, status) in [("2030-01-01", "Pending"), ("2030-01-02", "Cancelled"), ("2030-01-03", "Confirmed")] {
            store.insert("appointments", json!({"date": date, "status": status})).await.unwrap();
        }
        let q = Query::new()
            .filter("status", FilterOp::Ne, "Cancelled")
            .order_by("date", Direction::Desc);
        let docs = store.query("appointments", &q).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].data["date"], "2030-01-03");
        assert_eq!(store.count("appointments", &q.clone().limit(1)).await.unwrap(), 2);
        assert!(store.query("unknown", &Query::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("netram.json");

        let id = {
            let store = MemoryStore::open(&path).await.unwrap();
            let doc = store.insert("patients", json!({"name": "Jane"})).await.unwrap();
            store.insert("invoices", json!({"amount_cents": 100})).await.unwrap();
            doc.id
        };

        let reopened = MemoryStore::open(&path).await.unwrap();
        let doc = reopened.get("patients", &id).await.unwrap().unwrap();
        assert_eq!(doc.data["name"], "Jane");
        let stats = reopened.stats().await.unwrap();
        assert!(stats.persistent);
        assert_eq!(stats.collections["invoices"], 1);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(MemoryStore::open(&path).await, Err(StoreError::Snapshot(_))));
    }

    #[tokio::test]
    async fn test_insert_unique_rejects_clashes() {
        let store = MemoryStore::new();
        store.insert_unique("users", "u1", json!({"email": "a@b.co"}), "email").await.unwrap();

        let err = store.insert_unique("users", "u2", json!({"email": "a@b.co"}), "email").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref what) if what == "email a@b.co"));
        let err = store.insert_unique("users", "u1", json!({"email": "c@d.co"}), "email").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        store.insert_unique("users", "u3", json!({"email": "c@d.co"}), "email").await.unwrap();
        assert_eq!(store.count("users", &Query::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netram.json");
        let store = MemoryStore::open(&path).await.unwrap();
        let jane = store.insert("patients", json!({"name": "Jane"})).await.unwrap();

        // A directory where the temp file should go makes every write fail.
        let blocker = path.with_extension("tmp");
        std::fs::create_dir(&blocker).unwrap();

        assert!(store.insert("patients", json!({"name": "Ghost"})).await.is_err());
        assert!(store.insert("invoices", json!({"amount_cents": 1})).await.is_err());
        assert!(store.update("patients", &jane.id, json!({"name": "Janet"})).await.is_err());
        assert!(store.delete("patients", &jane.id).await.is_err());

        let patients = store.query("patients", &Query::new()).await.unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].data["name"], "Jane");
        let stats = store.stats().await.unwrap();
        assert!(!stats.collections.contains_key("invoices"));

        std::fs::remove_dir(&blocker).unwrap();
        store.insert("patients", json!({"name": "Ana"})).await.unwrap();
        let reopened = MemoryStore::open(&path).await.unwrap();
        let names: Vec<_> = reopened.query("patients", &Query::new()).await.unwrap()
            .into_iter()
            .map(|d| d.data["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(!names.contains(&"Ghost".to_string()));
    }
}
