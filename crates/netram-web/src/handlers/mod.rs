//! HTTP handlers for all API routes.

pub mod auth;
pub mod patients;
pub mod appointments;
pub mod billing;
pub mod emr;
pub mod dashboard;
pub mod ai;
pub mod uploads;
pub mod search;
pub mod system;
