//! Request Encoding
//!
//! The outbound body is the conversation history, role and content only:
//!
//! ```json
//! {"messages":[{"role":"user","content":"Hi"},{"role":"assistant","content":"Hello"}]}
//! ```

use serde::{Deserialize, Serialize};

use crate::conversation::{Conversation, Message, MessageRole};

/// One history entry on the wire
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Who sent the message
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

impl WireMessage {
    /// Create a wire message
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

/// Body of a chat request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Full history, oldest first; the last entry is the new user message
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

impl ChatRequest {
    /// Create a request from history entries
    #[must_use]
    pub fn new(messages: Vec<WireMessage>) -> Self {
        Self { messages }
    }

    /// Snapshot a conversation's current history
    #[must_use]
    pub fn from_conversation(conversation: &Conversation) -> Self {
        Self {
            messages: conversation.messages.iter().map(WireMessage::from).collect(),
        }
    }

    /// Whether the request satisfies the endpoint's contract
    #[must_use]
    pub fn last_is_user(&self) -> bool {
        self.messages
            .last()
            .is_some_and(|m| m.role == MessageRole::User)
    }
}
