//! Parley Server - relay between chat clients and a local model
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (port 3001, Ollama on localhost:11434)
//! parley-server
//!
//! # Different model and port
//! parley-server --model qwen2.5 --port 8080
//!
//! # Verbose logging
//! RUST_LOG=debug parley-server
//! ```
//!
//! # Signals
//!
//! - `SIGINT` (Ctrl-C): Graceful shutdown

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use parley_server::{AppState, InferenceEngine, OllamaEngine, ServerConfig};

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "parley_server={level},parley_core={level},tower_http={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C; shutting down");
        return;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    init_logging(&config.log_level);

    info!("Parley server starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let engine = OllamaEngine::new(&config.ollama_host, config.ollama_port, &config.model)
        .context("Failed to create Ollama client")?;

    if engine.health_check().await {
        info!(
            host = %config.ollama_host,
            port = config.ollama_port,
            model = %config.model,
            "Ollama reachable"
        );
    } else {
        warn!(
            host = %config.ollama_host,
            port = config.ollama_port,
            "Ollama not reachable; requests will fail until it is"
        );
    }

    let state = Arc::new(AppState::new(Arc::new(engine), config.query_options()));

    parley_server::run_server_with_shutdown(state, config.socket_addr(), shutdown_signal())
        .await?;

    info!("Parley server stopped");
    Ok(())
}
