//! Turns store changes into terminal output.
//!
//! Only the assistant side is printed; the user's own text is already on
//! screen where they typed it.

use parley_core::{MessageRole, StoreChange};

/// Prompt shown before each assistant reply
pub const ASSISTANT_PREFIX: &str = "assistant> ";

/// Stateless mapping from changes to output text
#[derive(Debug, Default)]
pub struct Renderer;

impl Renderer {
    /// Create a renderer
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Text to print for a change, if any
    #[must_use]
    pub fn render(&self, change: &StoreChange) -> Option<String> {
        match change {
            StoreChange::ConversationCreated { .. } => Some("-- new conversation --\n".to_string()),
            StoreChange::MessageAppended {
                role: MessageRole::Assistant,
                content,
                ..
            } => Some(format!("{ASSISTANT_PREFIX}{content}")),
            StoreChange::ContentAppended { fragment, .. } => Some(fragment.clone()),
            StoreChange::ContentReplaced { content, .. } => Some(format!("\n[error] {content}")),
            StoreChange::InFlightChanged { in_flight: false } => Some("\n".to_string()),
            StoreChange::TitleChanged { title, .. } => {
                tracing::debug!(title = %title, "Conversation titled");
                None
            }
            StoreChange::ActiveChanged { .. }
            | StoreChange::MessageAppended { .. }
            | StoreChange::InFlightChanged { in_flight: true } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use parley_core::{ConversationId, MessageId};

    use super::*;

    #[test]
    fn test_streamed_reply_output() {
        let renderer = Renderer::new();
        let conversation_id = ConversationId::new();
        let message_id = MessageId::new();

        let changes = vec![
            StoreChange::MessageAppended {
                conversation_id: conversation_id.clone(),
                message_id: MessageId::new(),
                role: MessageRole::User,
                content: "Hi".to_string(),
            },
            StoreChange::MessageAppended {
                conversation_id: conversation_id.clone(),
                message_id: message_id.clone(),
                role: MessageRole::Assistant,
                content: String::new(),
            },
            StoreChange::InFlightChanged { in_flight: true },
            StoreChange::ContentAppended {
                conversation_id: conversation_id.clone(),
                message_id: message_id.clone(),
                fragment: "Hello".to_string(),
            },
            StoreChange::ContentAppended {
                conversation_id,
                message_id,
                fragment: " there".to_string(),
            },
            StoreChange::InFlightChanged { in_flight: false },
        ];

        let output: String = changes.iter().filter_map(|c| renderer.render(c)).collect();
        assert_eq!(output, "assistant> Hello there\n");
    }

    #[test]
    fn test_failure_output() {
        let renderer = Renderer::new();
        let change = StoreChange::ContentReplaced {
            conversation_id: ConversationId::new(),
            message_id: MessageId::new(),
            content: "rate limited".to_string(),
        };
        assert_eq!(
            renderer.render(&change),
            Some("\n[error] rate limited".to_string())
        );
    }
}
