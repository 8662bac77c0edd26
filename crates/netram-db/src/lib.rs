//! Netram Database Layer
//!
//! This crate provides the clinic's document store: a small
//! collection/document abstraction with an in-process implementation that
//! can snapshot itself to a JSON file, plus typed repositories for users,
//! patients, appointments, invoices and EMR records.
//!
//! # Features
//!
//! - Schemaless JSON documents with store-managed `id` and timestamps
//! - Filtered, ordered and limited queries over top-level fields
//! - Optional on-disk persistence (no external server required)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use netram_db::{MemoryStore, PatientRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::open("./data/netram.json").await?;
//!     let patients = PatientRepository::new(Arc::new(store));
//!     println!("{} patients", patients.count().await?);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod store;
pub mod memory;
pub mod repository;
pub mod users;
pub mod patients;
pub mod appointments;
pub mod invoices;
pub mod emr;
pub mod dashboard;

pub use error::{Result, StoreError};
pub use store::{Direction, Document, DocumentStore, Filter, FilterOp, Query, StoreStats};
pub use memory::MemoryStore;
pub use repository::Repository;
pub use users::{OnboardingStep, StoredUser, UserRepository};
pub use patients::{PatientRepository, PatientScope};
pub use appointments::{AppointmentFilter, AppointmentRepository};
pub use invoices::InvoiceRepository;
pub use emr::EmrRepository;
pub use dashboard::{Activity, ActivityKind, ConditionCount, DashboardQueries, DashboardSummary};
