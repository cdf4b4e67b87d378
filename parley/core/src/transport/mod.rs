//! Transport Bridge
//!
//! Encodes a conversation's history into one request and decodes the
//! streamed response into [`ProtocolEvent`]s.
//!
//! # Layers
//!
//! - [`request`]: the outbound body
//! - [`decoder`]: byte framing with a carry-over buffer
//! - [`stream`]: the lazy, single-pass [`EventStream`] over a response body
//! - [`http`]: the reqwest-backed [`HttpBackend`]
//!
//! The store only sees the [`ChatBackend`] trait, so tests can substitute a
//! scripted backend without touching the network.
//!
//! [`ProtocolEvent`]: crate::events::ProtocolEvent

pub mod decoder;
pub mod error;
pub mod http;
pub mod request;
pub mod stream;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use decoder::{EventDecoder, DATA_PREFIX, DONE_SENTINEL};
pub use error::TransportError;
pub use http::HttpBackend;
pub use request::{ChatRequest, WireMessage};
pub use stream::{ByteStream, EventStream};

/// Source of streamed chat replies
///
/// Implementations never fail outright: a request that cannot be sent, or a
/// response that breaks, shows up as a single `Error` event at the end of the
/// returned stream.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Get the backend name (e.g., "HTTP")
    fn name(&self) -> &str;

    /// Send the history and stream the reply
    async fn open_stream(&self, request: ChatRequest, cancel: CancellationToken) -> EventStream;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool {
        true
    }
}
