//! Parley Server - Streaming Chat Relay
//!
//! Accepts a conversation history on `POST /api/chat`, flattens it into a
//! single prompt, drives an [`InferenceEngine`] and streams the reply back as
//! `data: {"text": …}` records terminated by `data: [DONE]`.
//!
//! # Request Flow
//!
//! ```text
//! client ── POST {messages} ──► validate ──► build prompt
//!                                               │
//!                                               ▼
//! client ◄── data: records ◄── encode ◄── engine events
//! ```
//!
//! # Endpoints
//!
//! - `POST /api/chat`: relay a conversation
//! - `GET /health`: liveness probe
//!
//! [`InferenceEngine`]: engine::InferenceEngine

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod relay;
pub mod routes;
pub mod state;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use engine::{EngineError, EngineEvent, InferenceEngine, OllamaEngine, QueryOptions};
pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the full application: routes plus CORS and request tracing.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve on an already-bound listener until `shutdown_signal` completes.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown_signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal)
        .await?;
    Ok(())
}

/// Bind `addr` and serve until `shutdown_signal` completes.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    addr: SocketAddr,
    shutdown_signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Parley server listening on http://{}", listener.local_addr()?);
    serve(listener, state, shutdown_signal).await
}
