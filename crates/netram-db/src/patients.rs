//! Patient repository.
//!
//! Provides CRUD operations plus the role-scoped listing used by the
//! patient records screen.

use netram_common::entities::Patient;
use std::sync::Arc;

use crate::error::Result;
use crate::repository::Repository;
use crate::store::{Direction, DocumentStore, Query, COLLECTION_PATIENTS};

/// Which patient records a caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientScope {
    All,
    /// Only records registered by this account.
    OwnedBy(String),
}

#[derive(Clone)]
pub struct PatientRepository {
    repo: Repository<Patient>,
}

impl PatientRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { repo: Repository::new(store, COLLECTION_PATIENTS) }
    }

    pub async fn insert(&self, patient: &Patient) -> Result<Patient> {
        self.repo.create(patient).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Patient>> {
        self.repo.find_by_id(id).await
    }

    pub async fn update(&self, patient: &Patient) -> Result<Patient> {
        self.repo.save(&patient.id, patient).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.repo.delete(id).await
    }

    /// Records visible in `scope`, optionally narrowed by a search term,
    /// sorted by name.
    pub async fn list(&self, scope: &PatientScope, search: Option<&str>) -> Result<Vec<Patient>> {
        let mut q = Query::new().order_by("name", Direction::Asc);
        if let PatientScope::OwnedBy(uid) = scope {
            q = q.where_eq("user_id", uid.as_str());
        }
        let patients = self.repo.find(&q).await?;
        Ok(match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => patients.into_iter().filter(|p| p.matches_search(term)).collect(),
            None => patients,
        })
    }

    /// Most recently registered first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<Patient>> {
        let q = Query::new().order_by("created_at", Direction::Desc).limit(limit);
        self.repo.find(&q).await
    }

    pub async fn all(&self) -> Result<Vec<Patient>> {
        self.repo.find(&Query::new()).await
    }

    pub async fn count(&self) -> Result<u64> {
        self.repo.count(&Query::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::{NaiveDate, Utc};

    pub(crate) fn sample(name: &str, owner: &str, tags: &[&str]) -> Patient {
        Patient {
            id: String::new(),
            name: name.into(),
            dob: NaiveDate::from_ymd_opt(1970, 5, 20).unwrap(),
            phone: Some("5550001111".into()),
            email: None,
            address: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            insurance_provider: None,
            insurance_policy_number: None,
            medical_history: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            user_id: owner.into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_scope_limits_listing() {
        let repo = PatientRepository::new(Arc::new(MemoryStore::new()));
        repo.insert(&sample("Zed", "u1", &[])).await.unwrap();
        repo.insert(&sample("Amy", "u2", &[])).await.unwrap();
        repo.insert(&sample("Bob", "u1", &["glaucoma"])).await.unwrap();

        let all = repo.list(&PatientScope::All, None).await.unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Amy", "Bob", "Zed"]);

        let mine = repo.list(&PatientScope::OwnedBy("u1".into()), None).await.unwrap();
        assert_eq!(mine.len(), 2);

        let found = repo.list(&PatientScope::OwnedBy("u1".into()), Some("GLAU")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Bob");
    }

    #[tokio::test]
    async fn test_update_clears_removed_fields() {
        let repo = PatientRepository::new(Arc::new(MemoryStore::new()));
        let mut p = repo.insert(&sample("Amy", "u1", &[])).await.unwrap();
        assert!(!p.id.is_empty());
        p.phone = None;
        let saved = repo.update(&p).await.unwrap();
        assert_eq!(saved.phone, None);
        assert!(saved.updated_at.is_some());
        assert_eq!(repo.find_by_id(&p.id).await.unwrap().unwrap().phone, None);
    }
}
