//! Billing repository.

use netram_common::entities::{Invoice, InvoiceStatus};
use serde_json::json;
use std::sync::Arc;

use crate::error::Result;
use crate::repository::Repository;
use crate::store::{Direction, DocumentStore, Query, COLLECTION_INVOICES};

#[derive(Clone)]
pub struct InvoiceRepository {
    repo: Repository<Invoice>,
}

impl InvoiceRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { repo: Repository::new(store, COLLECTION_INVOICES) }
    }

    pub async fn insert(&self, invoice: &Invoice) -> Result<Invoice> {
        self.repo.create(invoice).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>> {
        self.repo.find_by_id(id).await
    }

    pub async fn update(&self, invoice: &Invoice) -> Result<Invoice> {
        self.repo.save(&invoice.id, invoice).await
    }

    pub async fn set_status(&self, id: &str, status: InvoiceStatus) -> Result<Invoice> {
        self.repo.patch(id, json!({ "status": status })).await
    }

    /// Newest first, optionally for a single patient and/or status.
    pub async fn list(&self, patient_id: Option<&str>, status: Option<InvoiceStatus>) -> Result<Vec<Invoice>> {
        let mut q = Query::new()
            .order_by("date", Direction::Desc)
            .order_by("created_at", Direction::Desc);
        if let Some(pid) = patient_id {
            q = q.where_eq("patient_id", pid);
        }
        if let Some(status) = status {
            q = q.where_eq("status", status.as_str());
        }
        self.repo.find(&q).await
    }

    pub async fn count_pending(&self) -> Result<u64> {
        self.repo
            .count(&Query::new().where_eq("status", InvoiceStatus::Pending.as_str()))
            .await
    }
}
