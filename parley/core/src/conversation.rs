//! Conversation Model
//!
//! Messages and conversations as the store holds them in memory.
//!
//! # Invariants
//!
//! - A message's role and creation time never change; its content is either
//!   extended (streamed deltas) or replaced wholesale (error fallback).
//! - A conversation's message list is append-only.
//! - A conversation's title is derived once, from the first message when that
//!   message comes from the user, and is never recomputed afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ConversationId, MessageId};

/// Title shown until the first user message arrives
pub const DEFAULT_TITLE: &str = "New conversation";

/// Default number of characters kept when deriving a title
pub const DEFAULT_TITLE_MAX_CHARS: usize = 30;

/// Appended to titles that were cut short
pub const TITLE_TRUNCATION_MARKER: &str = "...";

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input
    User,
    /// Assistant reply
    Assistant,
}

impl MessageRole {
    /// Label used when flattening history into a prompt
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// A message in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Append a streamed fragment
    pub fn append(&mut self, text: &str) {
        self.content.push_str(text);
    }

    /// Replace the whole content
    pub fn replace(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }
}

/// A conversation: an ordered list of messages with a derived title
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,
    /// Display title
    pub title: String,
    /// Messages in conversation order
    pub messages: Vec<Message>,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Create a new empty conversation
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ConversationId::new(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Append a message, deriving the title if this is the first message and
    /// it comes from the user.
    ///
    /// Returns the new message's ID and whether the title changed.
    pub fn push_message(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
        title_max_chars: usize,
    ) -> (MessageId, bool) {
        let msg = Message::new(role, content);
        let id = msg.id.clone();

        let title_changed = self.messages.is_empty() && role == MessageRole::User;
        if title_changed {
            self.title = derive_title(&msg.content, title_max_chars);
        }

        self.messages.push(msg);
        (id, title_changed)
    }

    /// Get message by ID
    #[must_use]
    pub fn get_message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Get a mutable message by ID
    pub fn get_message_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| &m.id == id)
    }

    /// Last message, if any
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

/// Derive a conversation title from message content.
///
/// Keeps the first `max_chars` characters and appends
/// [`TITLE_TRUNCATION_MARKER`] when anything was cut. Counts Unicode scalar
/// values, so a multi-byte character is never split.
#[must_use]
pub fn derive_title(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TITLE_TRUNCATION_MARKER}", &content[..cut]),
        None => content.to_string(),
    }
}
