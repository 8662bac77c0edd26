//! System status, AI audit trail and liveness.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use netram_common::entities::Role;
use netram_db::StoreStats;
use netram_llm::{AuditTotals, LlmAuditEntry};

use crate::auth::AuthUser;
use crate::error::{ApiQuery, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct LlmStatus {
    pub backend: &'static str,
    pub model: String,
    pub local: bool,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub store: StoreStats,
    pub llm: LlmStatus,
    pub ai_audit: AuditTotals,
    pub active_sessions: usize,
    pub search_cache_entries: u64,
    pub event_subscribers: usize,
}

/// GET /api/system
pub async fn system_status(
    State(state): State<SharedState>,
    user: AuthUser,
) -> ApiResult<Json<SystemStatus>> {
    user.require_any(&[Role::Admin])?;
    let backend = state.flows.backend();
    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        store: state.store.stats().await?,
        llm: LlmStatus {
            backend: backend.name(),
            model: backend.model_id().to_string(),
            local: backend.is_local(),
        },
        ai_audit: state.flows.audit().totals(),
        active_sessions: state.sessions.active().await,
        search_cache_entries: state.search.cache().entry_count(),
        event_subscribers: state.event_tx.receiver_count(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// GET /api/system/ai-audit?limit=
pub async fn ai_audit(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<AuditQuery>,
) -> ApiResult<Json<Vec<LlmAuditEntry>>> {
    user.require_any(&[Role::Admin])?;
    Ok(Json(state.flows.audit().recent(q.limit.unwrap_or(50))))
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
