//! Events
//!
//! Two event vocabularies flow through the core:
//!
//! - [`ProtocolEvent`]: decoded from the response stream by the transport and
//!   consumed by the store, one turn at a time.
//! - [`StoreChange`]: published by the store to its subscribers after every
//!   mutation, so a UI surface can re-render what changed.

use serde::{Deserialize, Serialize};

use crate::conversation::MessageRole;
use crate::ids::{ConversationId, MessageId};

/// A decoded unit of the streaming response
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// A fragment of assistant text
    TextDelta {
        /// The fragment
        text: String,
    },
    /// The response completed
    Done,
    /// The request failed; the message is meant for the user
    Error {
        /// Human-readable description
        message: String,
    },
}

impl ProtocolEvent {
    /// Create a text delta
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether this event ends the stream
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

/// A change to the conversation collection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreChange {
    /// A conversation was inserted at the front of the collection
    ConversationCreated {
        /// The new conversation
        conversation_id: ConversationId,
    },

    /// The active conversation changed
    ActiveChanged {
        /// The newly active conversation
        conversation_id: ConversationId,
    },

    /// A message was appended to a conversation
    MessageAppended {
        /// Owning conversation
        conversation_id: ConversationId,
        /// The new message
        message_id: MessageId,
        /// Who sent it
        role: MessageRole,
        /// Initial content
        content: String,
    },

    /// Text was appended to a message
    ContentAppended {
        /// Owning conversation
        conversation_id: ConversationId,
        /// Message that grew
        message_id: MessageId,
        /// The appended text
        fragment: String,
    },

    /// A message's content was replaced
    ContentReplaced {
        /// Owning conversation
        conversation_id: ConversationId,
        /// Message that was rewritten
        message_id: MessageId,
        /// The new content
        content: String,
    },

    /// A conversation received its title
    TitleChanged {
        /// The conversation
        conversation_id: ConversationId,
        /// The derived title
        title: String,
    },

    /// The in-flight flag flipped
    InFlightChanged {
        /// New value
        in_flight: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events() {
        assert!(ProtocolEvent::Done.is_terminal());
        assert!(ProtocolEvent::error("boom").is_terminal());
        assert!(!ProtocolEvent::text("hi").is_terminal());
    }
}
