//! Dropgate edge - auth routing in front of the marketplace pages.
//!
//! Without arguments this serves the edge gate. The `--sign-in`, `--whoami`
//! and `--sign-out` commands drive the same API client from a terminal using a
//! cookie jar saved in the cache directory.

mod cli;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dropgate_core::Config;
use dropgate_edge::EdgeState;

/// Initialize the tracing subscriber for logging
fn init_tracing(default_level: &str) {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;

    // Check for CLI commands
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(command) = cli::Command::parse(&args) {
        init_tracing("warn");
        return cli::run(command, config).await;
    }

    init_tracing("info");
    serve(config).await
}

async fn serve(config: Config) -> Result<()> {
    let state = Arc::new(EdgeState::from_config(&config)?);
    let app = dropgate_edge::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    info!(
        addr = %config.listen_addr,
        api = %config.api_base_url,
        pages = %config.pages_origin_url,
        "Dropgate edge listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Edge server failed")?;

    info!("Dropgate edge shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
