//! netram-web — HTTP API for the Netram clinic service.
//! Provides:
//!   - Account signup/login with bearer-token sessions and onboarding steps
//!   - Patient, appointment, billing and EMR records with role checks
//!   - Dashboard figures and a live event stream
//!   - AI flows, file-upload diagnosis and medical knowledge search
//!   - System status and the AI audit trail

pub mod error;
pub mod auth;
pub mod access;
pub mod sms;
pub mod router;
pub mod handlers;
pub mod state;
pub mod sse;

pub use error::{ApiError, ApiResult};
pub use router::build_router;
pub use state::{AppEvent, AppState, SharedState};
