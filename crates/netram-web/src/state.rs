//! Shared application state for the web server.

use std::sync::Arc;
use tokio::sync::broadcast;
use serde::{Deserialize, Serialize};

use netram_db::{
    AppointmentRepository, DashboardQueries, DocumentStore, EmrRepository, InvoiceRepository,
    PatientRepository, UserRepository,
};
use netram_llm::FlowRunner;
use netram_search::SearchService;

use crate::auth::SessionStore;
use crate::sms::SmsSender;

/// Events pushed to connected clients via SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A patient record was created
    PatientRegistered { patient_id: String, name: String },
    /// An appointment was booked
    AppointmentBooked { appointment_id: String, patient_name: String, date: String, time: String },
    /// An appointment moved to a new status
    AppointmentStatusChanged { appointment_id: String, status: String },
    /// An invoice was issued
    InvoiceIssued { invoice_id: String, patient_name: String, amount_cents: i64 },
    /// An invoice was settled
    InvoicePaid { invoice_id: String },
}

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub flows: FlowRunner,
    pub search: SearchService,
    pub sessions: SessionStore,
    pub sms: Arc<dyn SmsSender>,
    /// Raw upload ceiling for the diagnosis and document endpoints.
    pub max_upload_bytes: usize,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        flows: FlowRunner,
        search: SearchService,
        sessions: SessionStore,
        sms: Arc<dyn SmsSender>,
        max_upload_bytes: usize,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self { store, flows, search, sessions, sms, max_upload_bytes, event_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    /// Fire-and-forget; having no subscribers is fine.
    pub fn publish(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.store.clone())
    }

    pub fn patients(&self) -> PatientRepository {
        PatientRepository::new(self.store.clone())
    }

    pub fn appointments(&self) -> AppointmentRepository {
        AppointmentRepository::new(self.store.clone())
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.store.clone())
    }

    pub fn emr(&self) -> EmrRepository {
        EmrRepository::new(self.store.clone())
    }

    pub fn dashboard(&self) -> DashboardQueries {
        DashboardQueries::new(self.store.clone())
    }
}

pub type SharedState = Arc<AppState>;
