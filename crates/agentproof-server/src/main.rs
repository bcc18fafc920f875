//! AgentProof Server
//!
//! Runs the AgentProof HTTP service: issues and verifies Liability Proofs
//! and answers trust lookups.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use agentproof_server::{create_router, AppState, ServerConfig};

/// Interval between sweeps of expired single-use proofs.
const LEDGER_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    // Log to stderr; library `log` records are forwarded through tracing-log.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(config.log_level())
        .init();

    let state = Arc::new(AppState::from_config(&config)?);
    info!(
        bind = %config.bind,
        kid = %state.keys.active_kid(),
        max_ttl_secs = config.max_ttl_secs,
        "Starting AgentProof server"
    );

    let ledger = Arc::clone(&state.ledger);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LEDGER_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = ledger.purge_expired(agentproof::time::now());
            if purged > 0 {
                tracing::debug!(purged, "purged expired single-use proofs");
            }
        }
    });

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;

    info!("Listening on {}", config.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("AgentProof server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
