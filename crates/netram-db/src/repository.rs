//! Typed view over one collection.
//!
//! Entities round-trip through JSON: the store strips `id` / timestamps on
//! write and re-injects them on read, so an entity's own values for those
//! fields are ignored when saving.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::store::{Document, DocumentStore, Query};

pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    collection: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), collection: self.collection, _marker: PhantomData }
    }
}

pub fn decode<T: DeserializeOwned>(doc: &Document) -> Result<T> {
    Ok(serde_json::from_value(doc.to_value())?)
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn DocumentStore>, collection: &'static str) -> Self {
        Self { store, collection, _marker: PhantomData }
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Insert and return the entity as stored (with its new id).
    pub async fn create(&self, entity: &T) -> Result<T> {
        let doc = self.store.insert(self.collection, serde_json::to_value(entity)?).await?;
        decode(&doc)
    }

    /// Insert or overwrite under a known id.
    pub async fn put(&self, id: &str, entity: &T) -> Result<T> {
        let doc = self.store.set(self.collection, id, serde_json::to_value(entity)?).await?;
        decode(&doc)
    }

    /// Insert under a known id, failing with `Duplicate` when another
    /// entity already has the same `unique_field` value.
    pub async fn put_unique(&self, id: &str, entity: &T, unique_field: &str) -> Result<T> {
        let data = serde_json::to_value(entity)?;
        let doc = self.store.insert_unique(self.collection, id, data, unique_field).await?;
        decode(&doc)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        match self.store.get(self.collection, id).await? {
            Some(doc) => Ok(Some(decode(&doc)?)),
            None => Ok(None),
        }
    }

    /// Like `find_by_id` but a missing document is an error.
    pub async fn get(&self, id: &str) -> Result<T> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found(self.collection, id))
    }

    /// Replace every stored field with the entity's. Fields the entity
    /// no longer serializes are dropped. Fails with `NotFound`.
    pub async fn save(&self, id: &str, entity: &T) -> Result<T> {
        if self.store.get(self.collection, id).await?.is_none() {
            return Err(StoreError::not_found(self.collection, id));
        }
        self.put(id, entity).await
    }

    pub async fn patch(&self, id: &str, patch: Value) -> Result<T> {
        let doc = self.store.update(self.collection, id, patch).await?;
        decode(&doc)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(self.collection, id).await
    }

    pub async fn find(&self, query: &Query) -> Result<Vec<T>> {
        self.store
            .query(self.collection, query)
            .await?
            .iter()
            .map(decode)
            .collect()
    }

    pub async fn count(&self, query: &Query) -> Result<u64> {
        self.store.count(self.collection, query).await
    }
}
