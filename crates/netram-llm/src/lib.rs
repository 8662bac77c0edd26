//! netram-llm — LLM backend abstraction and the clinic's AI flows.
//!
//! `backend` talks to the hosted (or local) model, `flows` turns typed
//! inputs into prompts and typed outputs, and `audit` keeps a bounded
//! trail of every call.

pub mod backend;
pub mod media;
pub mod audit;
pub mod flows;

pub use audit::{AuditLog, AuditTotals, LlmAuditEntry};
pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
pub use flows::{Flow, FlowError, FlowRunner};
pub use media::{DataUriError, MediaPart};
