//! HTTP route handlers for the relay.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream;
use tokio::sync::mpsc;

use crate::engine::{EngineError, EngineEvent};
use crate::relay::{self, INTERNAL_ERROR_MESSAGE};
use crate::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat))
        .fallback(not_found)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "parley-server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Relay a conversation to the engine and stream its reply.
async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let prompt = match relay::prompt_from_body(&body) {
        Ok(prompt) => prompt,
        Err(rejection) => {
            tracing::warn!(
                reason = rejection.message(),
                body = %String::from_utf8_lossy(&body),
                "Rejecting chat request"
            );
            return error_response(StatusCode::BAD_REQUEST, rejection.message());
        }
    };

    tracing::debug!(
        engine = state.engine.name(),
        prompt_chars = prompt.chars().count(),
        "Starting query"
    );

    let events = match state.engine.query(&prompt, &state.options).await {
        Ok(events) => events,
        Err(e) => {
            tracing::error!(error = %e, "Query failed to start");
            let status = e
                .downcast_ref::<EngineError>()
                .and_then(|e| StatusCode::from_u16(e.status()).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let message = e.to_string();
            let message = if message.is_empty() {
                INTERNAL_ERROR_MESSAGE
            } else {
                message.as_str()
            };
            return error_response(status, message);
        }
    };

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(event_records(events)),
    )
        .into_response()
}

/// Re-encode engine events as stream records, always ending with `[DONE]`.
fn event_records(
    events: mpsc::Receiver<EngineEvent>,
) -> impl futures::Stream<Item = Result<String, Infallible>> {
    stream::unfold(Some(events), |events| async move {
        let mut events = events?;
        loop {
            let record = match events.recv().await {
                Some(EngineEvent::TextDelta(text)) => {
                    return Some((Ok(relay::text_record(&text)), Some(events)));
                }
                Some(EngineEvent::Other { kind }) => {
                    tracing::trace!(kind = %kind, "Skipping engine event");
                    continue;
                }
                Some(EngineEvent::Result) => relay::done_record(),
                Some(EngineEvent::Error(message)) => {
                    tracing::warn!(error = %message, "Generation failed mid-stream");
                    relay::failure_records(&message)
                }
                None => {
                    tracing::debug!("Engine closed without a result");
                    relay::done_record()
                }
            };
            return Some((Ok(record), None));
        }
    })
}
