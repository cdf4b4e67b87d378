//! Relay Encoding
//!
//! Request validation, prompt flattening and event encoding for
//! `POST /api/chat`. Kept free of HTTP types so it can be tested directly.

use serde::Deserialize;

use parley_core::transport::{DATA_PREFIX, DONE_SENTINEL};

/// Reply to a body that is not JSON
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON in request body";

/// Reply to a history that does not end with the user
pub const LAST_NOT_USER_MESSAGE: &str = "Last message must be from user";

/// Reply to a failure without a message
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Text streamed when generation fails without a message
pub const GENERATION_FAILED_MESSAGE: &str = "An error occurred while generating the response.";

/// One history entry as the relay accepts it
#[derive(Clone, Debug, Deserialize)]
pub struct RelayMessage {
    /// `"user"` or anything else (treated as the assistant)
    #[serde(default)]
    pub role: String,
    /// Message text
    #[serde(default)]
    pub content: String,
}

impl RelayMessage {
    fn is_user(&self) -> bool {
        self.role == "user"
    }
}

/// Why a request body was rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The body is not JSON
    InvalidJson,
    /// The history is empty or ends with a non-user message
    LastNotUser,
}

impl Rejection {
    /// Text for the `error` field of the response
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidJson => INVALID_JSON_MESSAGE,
            Self::LastNotUser => LAST_NOT_USER_MESSAGE,
        }
    }
}

/// Parse a request body and flatten its history into a prompt
///
/// A body without a usable `messages` array is treated as an empty history.
///
/// # Errors
///
/// Returns a [`Rejection`] if the body is not JSON or the history does not
/// end with a user message.
pub fn prompt_from_body(body: &[u8]) -> Result<String, Rejection> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| Rejection::InvalidJson)?;

    let messages: Vec<RelayMessage> = value
        .get("messages")
        .cloned()
        .and_then(|m| serde_json::from_value(m).ok())
        .unwrap_or_default();

    build_prompt(&messages).ok_or(Rejection::LastNotUser)
}

/// Flatten a history into one prompt
///
/// Returns `None` unless the last message is from the user. Without earlier
/// history the prompt is the last message alone; otherwise earlier messages
/// are rendered as `User: …` / `Assistant: …` blocks separated by blank
/// lines and the last message follows as a final `User:` block.
#[must_use]
pub fn build_prompt(messages: &[RelayMessage]) -> Option<String> {
    let (last, context) = messages.split_last()?;
    if !last.is_user() {
        return None;
    }

    if context.is_empty() {
        return Some(last.content.clone());
    }

    let context = context
        .iter()
        .map(|m| {
            let speaker = if m.is_user() { "User" } else { "Assistant" };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Some(format!("{context}\n\nUser: {}", last.content))
}

/// Encode a text fragment as one stream record
#[must_use]
pub fn text_record(text: &str) -> String {
    let payload = serde_json::json!({ "text": text });
    format!("{DATA_PREFIX}{payload}\n\n")
}

/// The record that ends every stream
#[must_use]
pub fn done_record() -> String {
    format!("{DATA_PREFIX}{DONE_SENTINEL}\n\n")
}

/// Records sent when generation fails mid-stream
#[must_use]
pub fn failure_records(message: &str) -> String {
    let message = if message.is_empty() {
        GENERATION_FAILED_MESSAGE
    } else {
        message
    };
    format!("{}{}", text_record(message), done_record())
}
