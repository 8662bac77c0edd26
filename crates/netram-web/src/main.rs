//! Netram Web Server
//!
//! Run with: cargo run -p netram-web

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use netram_common::NetramConfig;
use netram_db::{DocumentStore, MemoryStore};
use netram_llm::backend::{self, LlmBackend, UnavailableBackend};
use netram_llm::{AuditLog, FlowRunner};
use netram_search::SearchService;
use netram_web::auth::SessionStore;
use netram_web::sms::{LogSmsSender, SmsSender, WebhookSmsSender};
use netram_web::{build_router, AppState};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Netram Web Server...");
    let cfg = NetramConfig::load()?;

    let store: Arc<dyn DocumentStore> = match &cfg.store.snapshot_path {
        Some(path) => {
            info!(path = %path.display(), "Opening persistent store");
            Arc::new(MemoryStore::open(path).await?)
        }
        None => {
            warn!("No snapshot path configured; records live in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let llm: Arc<dyn LlmBackend> = match backend::from_config(&cfg.llm) {
        Ok(b) => {
            info!(backend = b.name(), model = b.model_id(), "LLM backend ready");
            b
        }
        Err(e) => {
            warn!(error = %e, "LLM backend unavailable; AI endpoints will return errors");
            Arc::new(UnavailableBackend::new(&cfg.llm.model, e.to_string()))
        }
    };
    let flows = FlowRunner::new(llm, Arc::new(AuditLog::new(cfg.llm.audit_capacity)))
        .with_generation(cfg.llm.max_tokens, cfg.llm.temperature);

    let search = SearchService::from_config(&cfg.search)?;

    let sms: Arc<dyn SmsSender> = match &cfg.sms.webhook_url {
        Some(url) => Arc::new(WebhookSmsSender::new(url.clone())?),
        None => Arc::new(LogSmsSender),
    };

    let state = Arc::new(AppState::new(
        store,
        flows,
        search,
        SessionStore::new(cfg.session.ttl_hours),
        sms,
        cfg.server.max_upload_bytes,
    ));

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            let purged = sweeper.sessions.purge_expired().await;
            if purged > 0 {
                info!(purged, "Expired sessions removed");
            }
        }
    });

    let app = build_router(state);

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
