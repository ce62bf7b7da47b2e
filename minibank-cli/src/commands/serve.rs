//! Serve command - run the GraphQL gateway

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use minibank_cli::gateway;
use minibank_core::BankContext;

use super::load_config;

pub async fn run(data_dir: &Path, host: &str, port: u16) -> Result<()> {
    let config = load_config(data_dir)?;
    tracing::debug!(?config, "configuration loaded");

    let bank = Arc::new(
        BankContext::open(data_dir, config).context("Failed to initialize minibank")?,
    );
    let app = gateway::create_router(bank);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(%addr, "minibank listening, GraphQL at /graphql");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
