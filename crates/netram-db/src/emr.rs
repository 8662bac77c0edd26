//! EMR repository.

use netram_common::entities::EmrRecord;
use std::sync::Arc;

use crate::error::Result;
use crate::repository::Repository;
use crate::store::{Direction, DocumentStore, Query, COLLECTION_EMR};

#[derive(Clone)]
pub struct EmrRepository {
    repo: Repository<EmrRecord>,
}

impl EmrRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { repo: Repository::new(store, COLLECTION_EMR) }
    }

    pub async fn insert(&self, record: &EmrRecord) -> Result<EmrRecord> {
        self.repo.create(record).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<EmrRecord>> {
        self.repo.find_by_id(id).await
    }

    pub async fn update(&self, record: &EmrRecord) -> Result<EmrRecord> {
        self.repo.save(&record.id, record).await
    }

    /// A patient's history, latest visit first.
    pub async fn for_patient(&self, patient_id: &str) -> Result<Vec<EmrRecord>> {
        let q = Query::new()
            .where_eq("patient_id", patient_id)
            .order_by("visit_date", Direction::Desc)
            .order_by("created_at", Direction::Desc);
        self.repo.find(&q).await
    }

    /// Records across several patients, latest visit first.
    pub async fn for_patients(&self, patient_ids: &[String]) -> Result<Vec<EmrRecord>> {
        let mut out = Vec::new();
        for pid in patient_ids {
            out.extend(self.for_patient(pid).await?);
        }
        out.sort_by(|a, b| b.visit_date.cmp(&a.visit_date).then(b.created_at.cmp(&a.created_at)));
        Ok(out)
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<EmrRecord>> {
        let q = Query::new()
            .order_by("visit_date", Direction::Desc)
            .limit(limit);
        self.repo.find(&q).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::{NaiveDate, Utc};

    fn record(patient_id: &str, day: u32, diagnosis: Option<&str>) -> EmrRecord {
        EmrRecord {
            id: String::new(),
            patient_id: patient_id.into(),
            author_id: "doc-1".into(),
            visit_date: NaiveDate::from_ymd_opt(2030, 3, day).unwrap(),
            chief_complaint: "Blurred vision".into(),
            findings: None,
            diagnosis: diagnosis.map(String::from),
            prescriptions: vec![],
            notes: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_history_ordering() {
        let repo = EmrRepository::new(Arc::new(MemoryStore::new()));
        repo.insert(&record("p1", 1, None)).await.unwrap();
        repo.insert(&record("p1", 9, Some("Early AMD"))).await.unwrap();
        repo.insert(&record("p2", 5, None)).await.unwrap();

        let history = repo.for_patient("p1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].visit_date.to_string(), "2030-03-09");

        let merged = repo.for_patients(&["p1".into(), "p2".into()]).await.unwrap();
        let days: Vec<String> = merged.iter().map(|r| r.visit_date.to_string()).collect();
        assert_eq!(days, vec!["2030-03-09", "2030-03-05", "2030-03-01"]);
    }
}
