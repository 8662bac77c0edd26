//! Appointment repository.

use chrono::NaiveDate;
use netram_common::entities::{Appointment, AppointmentStatus};
use serde_json::json;
use std::sync::Arc;

use crate::error::Result;
use crate::repository::Repository;
use crate::store::{Direction, DocumentStore, FilterOp, Query, COLLECTION_APPOINTMENTS};

/// Optional listing filters.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub patient_id: Option<String>,
}

#[derive(Clone)]
pub struct AppointmentRepository {
    repo: Repository<Appointment>,
}

fn date_value(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl AppointmentRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { repo: Repository::new(store, COLLECTION_APPOINTMENTS) }
    }

    pub async fn insert(&self, appt: &Appointment) -> Result<Appointment> {
        self.repo.create(appt).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Appointment>> {
        self.repo.find_by_id(id).await
    }

    pub async fn update(&self, appt: &Appointment) -> Result<Appointment> {
        self.repo.save(&appt.id, appt).await
    }

    pub async fn set_status(&self, id: &str, status: AppointmentStatus) -> Result<Appointment> {
        self.repo.patch(id, json!({ "status": status })).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.repo.delete(id).await
    }

    /// Chronological listing.
    pub async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let mut q = Query::new()
            .order_by("date", Direction::Asc)
            .order_by("time", Direction::Asc);
        if let Some(date) = filter.date {
            q = q.where_eq("date", date_value(date));
        }
        if let Some(status) = filter.status {
            q = q.where_eq("status", status.as_str());
        }
        if let Some(pid) = &filter.patient_id {
            q = q.where_eq("patient_id", pid.as_str());
        }
        self.repo.find(&q).await
    }

    /// Non-cancelled appointments on `day`.
    pub async fn count_on(&self, day: NaiveDate) -> Result<u64> {
        let q = Query::new()
            .where_eq("date", date_value(day))
            .filter("status", FilterOp::Ne, AppointmentStatus::Cancelled.as_str());
        self.repo.count(&q).await
    }

    /// Non-cancelled appointments on or after `from`, soonest first.
    pub async fn upcoming(&self, from: NaiveDate, limit: usize) -> Result<Vec<Appointment>> {
        let q = Query::new()
            .filter("date", FilterOp::Gte, date_value(from))
            .filter("status", FilterOp::Ne, AppointmentStatus::Cancelled.as_str())
            .order_by("date", Direction::Asc)
            .order_by("time", Direction::Asc)
            .limit(limit);
        self.repo.find(&q).await
    }

    /// Most recently booked first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<Appointment>> {
        let q = Query::new().order_by("created_at", Direction::Desc).limit(limit);
        self.repo.find(&q).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::Utc;
    use netram_common::entities::AppointmentType;

    pub(crate) fn appt(date: &str, time: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: String::new(),
            patient_id: None,
            patient_name: "John Doe".into(),
            doctor_name: "Dr. Smith".into(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            time: time.into(),
            appointment_type: AppointmentType::Consultation,
            status,
            notes: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_upcoming_skips_cancelled_and_past() {
        let repo = AppointmentRepository::new(Arc::new(MemoryStore::new()));
        repo.insert(&appt("2030-01-01", "10:00", AppointmentStatus::Confirmed)).await.unwrap();
        repo.insert(&appt("2030-01-02", "09:00", AppointmentStatus::Cancelled)).await.unwrap();
        repo.insert(&appt("2030-01-02", "08:00", AppointmentStatus::Pending)).await.unwrap();
        repo.insert(&appt("2030-01-03", "11:00", AppointmentStatus::Confirmed)).await.unwrap();

        let from = NaiveDate::from_ymd_opt(2030, 1, 2).unwrap();
        let upcoming = repo.upcoming(from, 5).await.unwrap();
        let keys: Vec<(String, String)> = upcoming.iter()
            .map(|a| (a.date.to_string(), a.time.clone()))
            .collect();
        assert_eq!(keys, vec![
            ("2030-01-02".to_string(), "08:00".to_string()),
            ("2030-01-03".to_string(), "11:00".to_string()),
        ]);

        assert_eq!(repo.count_on(from).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_status_and_filter() {
        let repo = AppointmentRepository::new(Arc::new(MemoryStore::new()));
        let a = repo.insert(&appt("2030-02-01", "10:00", AppointmentStatus::Pending)).await.unwrap();
        let updated = repo.set_status(&a.id, AppointmentStatus::Cancelled).await.unwrap();
        assert_eq!(updated.status, AppointmentStatus::Cancelled);

        let filter = AppointmentFilter { status: Some(AppointmentStatus::Cancelled), ..Default::default() };
        assert_eq!(repo.list(&filter).await.unwrap().len(), 1);
        let filter = AppointmentFilter { status: Some(AppointmentStatus::Pending), ..Default::default() };
        assert!(repo.list(&filter).await.unwrap().is_empty());
    }
}
