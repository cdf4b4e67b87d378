//! Transport Errors
//!
//! Every failure the bridge can hit between opening the request and reading
//! the last byte. None of these escape as `Err` to the store: the event
//! stream turns each into a single [`ProtocolEvent::Error`] whose message is
//! [`TransportError::user_message`].
//!
//! [`ProtocolEvent::Error`]: crate::events::ProtocolEvent::Error

use thiserror::Error;

/// Used when the endpoint rejects the request without an `error` field
pub const REQUEST_FAILED_MESSAGE: &str = "API request failed";

/// Used when a turn is cancelled by the caller
pub const CANCELLED_MESSAGE: &str = "Request cancelled.";

/// Errors that can occur while talking to the chat endpoint
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint could not be reached (refused, DNS, timeout)
    #[error("Failed to connect to {endpoint}: {detail}")]
    Connect {
        /// Endpoint that was attempted
        endpoint: String,
        /// Underlying error description
        detail: String,
    },

    /// The endpoint answered with a non-success status
    #[error("Endpoint returned {status}: {}", .message.as_deref().unwrap_or("no error detail"))]
    Status {
        /// HTTP status code
        status: u16,
        /// Value of the `error` field of the response body, if present
        message: Option<String>,
    },

    /// The response stream broke after it was opened
    #[error("Response stream from {endpoint} aborted: {detail}")]
    Stream {
        /// Endpoint that was streaming
        endpoint: String,
        /// Underlying error description
        detail: String,
    },

    /// The caller cancelled the turn
    #[error("Request cancelled")]
    Cancelled,
}

impl TransportError {
    /// Text suitable for showing in place of the assistant's reply
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            Self::Status { .. } => REQUEST_FAILED_MESSAGE.to_string(),
            Self::Connect { endpoint, .. } | Self::Stream { endpoint, .. } => {
                unreachable_message(endpoint)
            }
            Self::Cancelled => CANCELLED_MESSAGE.to_string(),
        }
    }
}

/// Fallback text for network-level failures
#[must_use]
pub fn unreachable_message(endpoint: &str) -> String {
    format!(
        "Sorry, I encountered an error. Please make sure the server is reachable at {endpoint}."
    )
}

/// Extract the `error` field from a non-success response body
#[must_use]
pub fn error_field(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("error")?.as_str().map(String::from)
}
