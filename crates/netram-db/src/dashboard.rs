//! Dashboard aggregation over the clinic collections.

use chrono::{DateTime, NaiveDate, Utc};
use netram_common::entities::Appointment;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::appointments::AppointmentRepository;
use crate::error::Result;
use crate::invoices::InvoiceRepository;
use crate::patients::PatientRepository;
use crate::store::DocumentStore;

pub const DEFAULT_UPCOMING_LIMIT: usize = 5;
pub const DEFAULT_ACTIVITY_LIMIT: usize = 5;
pub const UNTAGGED: &str = "Untagged";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    NewPatient,
    Appointment,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub description: String,
    pub link: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConditionCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_patients: u64,
    pub todays_appointments: u64,
    pub upcoming_appointments: Vec<Appointment>,
    pub recent_activities: Vec<Activity>,
    pub patients_by_condition: Vec<ConditionCount>,
    pub pending_bills: u64,
}

#[derive(Clone)]
pub struct DashboardQueries {
    patients: PatientRepository,
    appointments: AppointmentRepository,
    invoices: InvoiceRepository,
}

impl DashboardQueries {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            patients: PatientRepository::new(store.clone()),
            appointments: AppointmentRepository::new(store.clone()),
            invoices: InvoiceRepository::new(store),
        }
    }

    pub async fn total_patients(&self) -> Result<u64> {
        self.patients.count().await
    }

    pub async fn todays_appointments(&self, today: NaiveDate) -> Result<u64> {
        self.appointments.count_on(today).await
    }

    pub async fn upcoming_appointments(&self, today: NaiveDate, limit: usize) -> Result<Vec<Appointment>> {
        self.appointments.upcoming(today, limit).await
    }

    /// Newest patient registrations and bookings, merged newest first.
    pub async fn recent_activities(&self, limit: usize) -> Result<Vec<Activity>> {
        let mut out: Vec<Activity> = self
            .patients
            .recent(limit)
            .await?
            .into_iter()
            .map(|p| Activity {
                kind: ActivityKind::NewPatient,
                description: format!("Patient {} registered.", p.name),
                link: format!("/patients/{}", p.id),
                timestamp: p.created_at,
            })
            .collect();

        out.extend(self.appointments.recent(limit).await?.into_iter().map(|a| Activity {
            kind: ActivityKind::Appointment,
            description: format!(
                "Appointment for {} with {} on {}.",
                a.patient_name, a.doctor_name, a.date
            ),
            link: "/appointments".to_string(),
            timestamp: a.created_at,
        }));

        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out.truncate(limit);
        Ok(out)
    }

    /// Tag frequency across all patients, most common first.
    pub async fn patients_by_condition(&self) -> Result<Vec<ConditionCount>> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for p in self.patients.all().await? {
            let tags: Vec<&str> = p.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
            if tags.is_empty() {
                *counts.entry(UNTAGGED.to_string()).or_default() += 1;
            }
            for tag in tags {
                *counts.entry(tag.to_string()).or_default() += 1;
            }
        }
        let mut out: Vec<ConditionCount> = counts
            .into_iter()
            .map(|(name, count)| ConditionCount { name, count })
            .collect();
        // stable: ties stay alphabetical
        out.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(out)
    }

    pub async fn pending_bills(&self) -> Result<u64> {
        self.invoices.count_pending().await
    }

    pub async fn summary(&self, today: NaiveDate) -> Result<DashboardSummary> {
        Ok(DashboardSummary {
            total_patients: self.total_patients().await?,
            todays_appointments: self.todays_appointments(today).await?,
            upcoming_appointments: self.upcoming_appointments(today, DEFAULT_UPCOMING_LIMIT).await?,
            recent_activities: self.recent_activities(DEFAULT_ACTIVITY_LIMIT).await?,
            patients_by_condition: self.patients_by_condition().await?,
            pending_bills: self.pending_bills().await?,
        })
    }
}
