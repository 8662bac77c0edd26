//! Netram API Gateway
//!
//! Run with: cargo run -p netram-gateway

use tracing::info;
use tracing_subscriber::EnvFilter;

use netram_gateway::{build_router, routes_from};

const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT_API_GATEWAY")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let routes = routes_from(|var| std::env::var(var).ok());
    let app = build_router(routes.clone())?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("API Gateway listening on port {}", port);
    info!("Configured service routes:");
    for r in &routes {
        info!("  {} -> {}", r.prefix, r.target);
    }
    axum::serve(listener, app).await?;

    Ok(())
}
