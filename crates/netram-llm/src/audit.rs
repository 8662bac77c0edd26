//! Audit logging for LLM calls.
//!
//! Every flow invocation leaves one entry: which flow ran on which model,
//! token usage, latency and a SHA-256 of the raw output. Prompts and outputs
//! themselves are never retained.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAuditEntry {
    pub id: Uuid,
    pub flow: String,
    pub model: String,
    pub backend: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub output_hash: String,
    pub latency_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub called_at: chrono::DateTime<Utc>,
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl LlmAuditEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        flow: &str,
        model: String,
        backend: String,
        prompt_tokens: u32,
        completion_tokens: u32,
        output: &str,
        latency_ms: u64,
        error: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            flow: flow.to_string(),
            model,
            backend,
            prompt_tokens,
            completion_tokens,
            output_hash: sha256_hex(output),
            latency_ms,
            success: error.is_none(),
            error,
            called_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AuditTotals {
    pub calls: u64,
    pub failures: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Bounded in-memory audit trail. Oldest entries are evicted first;
/// totals keep counting across evictions.
pub struct AuditLog {
    capacity: usize,
    inner: Mutex<AuditInner>,
}

#[derive(Default)]
struct AuditInner {
    entries: VecDeque<LlmAuditEntry>,
    totals: AuditTotals,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), inner: Mutex::new(AuditInner::default()) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AuditInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, entry: LlmAuditEntry) {
        tracing::info!(
            flow = %entry.flow,
            model = %entry.model,
            prompt_tokens = entry.prompt_tokens,
            completion_tokens = entry.completion_tokens,
            latency_ms = entry.latency_ms,
            success = entry.success,
            "LLM call audited"
        );
        let mut inner = self.lock();
        inner.totals.calls += 1;
        if !entry.success {
            inner.totals.failures += 1;
        }
        inner.totals.prompt_tokens += u64::from(entry.prompt_tokens);
        inner.totals.completion_tokens += u64::from(entry.completion_tokens);
        if inner.entries.len() == self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(entry);
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<LlmAuditEntry> {
        self.lock().entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn totals(&self) -> AuditTotals {
        self.lock().totals.clone()
    }
}
