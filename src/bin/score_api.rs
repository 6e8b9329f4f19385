//! RusterScore API Server
//!
//! REST API for the token scoring engine
//!
//! Usage:
//!   cargo run --bin score_api
//!
//! Environment:
//!   PORT / SCORE_PORT - Server port (default: 8080)
//!   SCORE_HOST        - Server host (default: 0.0.0.0)
//!   RUST_LOG          - Log level (default: info)

use ruster_score::api::{create_router, handlers::AppState, start_cleanup_task};
use ruster_score::{ScorerConfig, TokenScorer};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .compact()
        .init();

    // Build the scorer once; every request shares its adapters and cache
    let scorer = Arc::new(TokenScorer::new(ScorerConfig::default())?);
    let state = Arc::new(AppState::new(scorer));

    // Start background cleanup task for the rate limiter
    start_cleanup_task();
    info!("🧹 Background cleanup task started");

    // Create router
    let app = create_router(state);

    // Get server config from env (PaaS platforms inject PORT)
    let host = std::env::var("SCORE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("SCORE_PORT"))
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("🚀 RusterScore API starting on http://{}", addr);
    info!("");
    info!("Endpoints:");
    info!("  POST /v1/score/token - Composite token risk score");
    info!("  GET  /v1/status      - Provider availability + cache stats");
    info!("  GET  /v1/health      - Health check");
    info!("");
    info!("Press Ctrl+C for graceful shutdown");
    info!("");

    // Start server with graceful shutdown
    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("");
    info!("🛑 RusterScore API shutdown complete");

    Ok(())
}
