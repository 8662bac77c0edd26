//! netram-common — Shared types, errors, and configuration used across all Netram crates.

pub mod error;
pub mod entities;
pub mod forms;
pub mod validation;
pub mod config;

// Re-export commonly used types
pub use config::NetramConfig;
pub use entities::{Role, UserProfile, Patient, Appointment, Invoice, EmrRecord};
pub use error::{NetramError, Result};
