//! Conversation Store
//!
//! Owns the conversation collection, the active selection and the in-flight
//! flag, and drives one streamed turn at a time against a [`ChatBackend`].
//!
//! # Design Philosophy
//!
//! The store is a plain value owned by the application root. Mutation goes
//! through `&mut self`, so there is exactly one writer. Surfaces that need to
//! re-render call [`ConversationStore::subscribe`] and receive a
//! [`StoreChange`] after every mutation, in the order the mutations happened.
//!
//! # Turn Lifecycle
//!
//! ```text
//! Idle -> UserAppended -> AwaitingStream -> Streaming <-> TextDelta
//!                                             |
//!                                             v
//!                                   Terminated(Done | Error) -> Idle
//! ```
//!
//! The in-flight flag is set for `AwaitingStream` and `Streaming` only, and is
//! cleared by a drop guard on every way out of the turn.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::conversation::{Conversation, MessageRole, DEFAULT_TITLE_MAX_CHARS};
use crate::events::{ProtocolEvent, StoreChange};
use crate::ids::{ConversationId, MessageId};
use crate::transport::{ChatBackend, ChatRequest};

/// Errors returned by store operations
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No conversation with this ID exists
    #[error("Conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    /// The conversation exists but has no message with this ID
    #[error("Message {message_id} not found in conversation {conversation_id}")]
    MessageNotFound {
        /// Conversation that was searched
        conversation_id: ConversationId,
        /// Message that was missing
        message_id: MessageId,
    },

    /// A turn is already streaming
    #[error("A response is already being generated")]
    TurnInFlight,
}

/// How a turn ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The stream completed; the placeholder holds the reply
    Completed {
        /// The assistant message
        message_id: MessageId,
    },
    /// The stream failed; the placeholder holds the error text
    Failed {
        /// The assistant message
        message_id: MessageId,
        /// Text written into the placeholder
        message: String,
    },
}

impl TurnOutcome {
    /// The assistant message the turn wrote into
    #[must_use]
    pub fn message_id(&self) -> &MessageId {
        match self {
            Self::Completed { message_id } | Self::Failed { message_id, .. } => message_id,
        }
    }

    /// Whether the turn completed normally
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Holds the in-flight flag for the lifetime of a turn
struct InFlightGuard {
    flag: Arc<AtomicBool>,
    subscribers: Vec<mpsc::UnboundedSender<StoreChange>>,
}

impl InFlightGuard {
    fn engage(flag: Arc<AtomicBool>, subscribers: Vec<mpsc::UnboundedSender<StoreChange>>) -> Self {
        flag.store(true, Ordering::SeqCst);
        for tx in &subscribers {
            let _ = tx.send(StoreChange::InFlightChanged { in_flight: true });
        }
        Self { flag, subscribers }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        for tx in &self.subscribers {
            let _ = tx.send(StoreChange::InFlightChanged { in_flight: false });
        }
    }
}

/// The conversation collection and its streaming driver
pub struct ConversationStore<B: ChatBackend> {
    /// Where replies come from
    backend: B,
    /// Newest first
    conversations: Vec<Conversation>,
    /// Selected conversation, if any
    active: Option<ConversationId>,
    /// Set while a turn is streaming
    in_flight: Arc<AtomicBool>,
    /// Change listeners
    subscribers: Vec<mpsc::UnboundedSender<StoreChange>>,
    /// Title truncation bound
    title_max_chars: usize,
}

impl<B: ChatBackend> ConversationStore<B> {
    /// Create an empty store
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            conversations: Vec::new(),
            active: None,
            in_flight: Arc::new(AtomicBool::new(false)),
            subscribers: Vec::new(),
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
        }
    }

    /// Set the title truncation bound
    #[must_use]
    pub fn with_title_max_chars(mut self, max_chars: usize) -> Self {
        self.title_max_chars = max_chars;
        self
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Receive a [`StoreChange`] for every subsequent mutation
    ///
    /// The channel is unbounded so no streamed fragment is ever dropped.
    /// Keep the receiver drained or drop it: dropped receivers are pruned
    /// on the next change, but a live receiver that is never read buffers
    /// every change for as long as the store exists.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StoreChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, change: StoreChange) {
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }

    // =========================================================================
    // Collection Operations
    // =========================================================================

    /// Create a conversation at the front of the collection and make it active
    pub fn create_conversation(&mut self) -> ConversationId {
        let conversation = Conversation::new();
        let id = conversation.id.clone();
        self.conversations.insert(0, conversation);
        self.active = Some(id.clone());

        tracing::debug!(conversation_id = %id, "Created conversation");
        self.publish(StoreChange::ConversationCreated {
            conversation_id: id.clone(),
        });
        self.publish(StoreChange::ActiveChanged {
            conversation_id: id.clone(),
        });
        id
    }

    /// Select a conversation.
    ///
    /// The ID is not checked; a dangling selection makes
    /// [`active_conversation`](Self::active_conversation) return `None` and
    /// the next [`send_message`](Self::send_message) start a new conversation.
    pub fn set_active(&mut self, id: ConversationId) {
        self.active = Some(id.clone());
        self.publish(StoreChange::ActiveChanged {
            conversation_id: id,
        });
    }

    /// Append a message to a conversation
    ///
    /// The first message of a conversation sets its title if it comes from
    /// the user; the title is never changed afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConversationNotFound`] if no such conversation exists.
    pub fn append_message(
        &mut self,
        conversation_id: &ConversationId,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Result<MessageId, StoreError> {
        let title_max_chars = self.title_max_chars;
        let conversation = self.conversation_mut(conversation_id)?;
        let (message_id, title_changed) = conversation.push_message(role, content, title_max_chars);
        let title = conversation.title.clone();
        let content = conversation
            .get_message(&message_id)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        self.publish(StoreChange::MessageAppended {
            conversation_id: conversation_id.clone(),
            message_id: message_id.clone(),
            role,
            content,
        });
        if title_changed {
            self.publish(StoreChange::TitleChanged {
                conversation_id: conversation_id.clone(),
                title,
            });
        }
        Ok(message_id)
    }

    /// Overwrite a message's content
    ///
    /// # Errors
    ///
    /// Returns an error if the conversation or message does not exist.
    pub fn replace_message_content(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        content: impl Into<String>,
    ) -> Result<(), StoreError> {
        let content = content.into();
        self.message_mut(conversation_id, message_id)?
            .replace(content.clone());

        self.publish(StoreChange::ContentReplaced {
            conversation_id: conversation_id.clone(),
            message_id: message_id.clone(),
            content,
        });
        Ok(())
    }

    /// Concatenate a fragment onto a message's content
    ///
    /// # Errors
    ///
    /// Returns an error if the conversation or message does not exist.
    pub fn append_to_message_content(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        fragment: &str,
    ) -> Result<(), StoreError> {
        self.message_mut(conversation_id, message_id)?.append(fragment);

        self.publish(StoreChange::ContentAppended {
            conversation_id: conversation_id.clone(),
            message_id: message_id.clone(),
            fragment: fragment.to_string(),
        });
        Ok(())
    }

    // =========================================================================
    // Turns
    // =========================================================================

    /// Send a user message in the active conversation and stream the reply
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TurnInFlight`] if a turn is already streaming.
    /// Transport failures are not errors: they end the turn with
    /// [`TurnOutcome::Failed`] and the failure text in the placeholder.
    pub async fn send_message(
        &mut self,
        content: impl Into<String>,
    ) -> Result<TurnOutcome, StoreError> {
        self.send_message_with_cancel(content, CancellationToken::new())
            .await
    }

    /// Like [`send_message`](Self::send_message), stopping early when
    /// `cancel` fires
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TurnInFlight`] if a turn is already streaming.
    pub async fn send_message_with_cancel(
        &mut self,
        content: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, StoreError> {
        if self.is_in_flight() {
            tracing::warn!("Rejecting message while a response is in flight");
            return Err(StoreError::TurnInFlight);
        }

        let conversation_id = match self.active.clone() {
            Some(id) if self.conversation(&id).is_some() => id,
            _ => self.create_conversation(),
        };

        self.append_message(&conversation_id, MessageRole::User, content)?;

        let request = self
            .conversation(&conversation_id)
            .map(ChatRequest::from_conversation)
            .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.clone()))?;

        let message_id = self.append_message(&conversation_id, MessageRole::Assistant, "")?;

        let _guard = InFlightGuard::engage(Arc::clone(&self.in_flight), self.subscribers.clone());

        tracing::info!(
            conversation_id = %conversation_id,
            backend = self.backend.name(),
            history = request.messages.len(),
            "Starting turn"
        );

        let mut events = self.backend.open_stream(request, cancel).await;
        let mut fragments = 0usize;

        let outcome = loop {
            match events.next().await {
                Some(ProtocolEvent::TextDelta { text }) => {
                    fragments += 1;
                    self.append_to_message_content(&conversation_id, &message_id, &text)?;
                }
                Some(ProtocolEvent::Done) | None => {
                    tracing::info!(
                        conversation_id = %conversation_id,
                        fragments,
                        "Turn completed"
                    );
                    break TurnOutcome::Completed { message_id };
                }
                Some(ProtocolEvent::Error { message }) => {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        error = %message,
                        "Turn failed"
                    );
                    self.replace_message_content(&conversation_id, &message_id, message.clone())?;
                    break TurnOutcome::Failed {
                        message_id,
                        message,
                    };
                }
            }
        };

        Ok(outcome)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The active conversation, if the selection refers to one
    #[must_use]
    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active.as_ref().and_then(|id| self.conversation(id))
    }

    /// The active selection, which may be dangling
    #[must_use]
    pub fn active_id(&self) -> Option<&ConversationId> {
        self.active.as_ref()
    }

    /// All conversations, newest first
    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Look up a conversation
    #[must_use]
    pub fn conversation(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == id)
    }

    /// Whether a turn is streaming
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// The backend replies come from
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn conversation_mut(&mut self, id: &ConversationId) -> Result<&mut Conversation, StoreError> {
        self.conversations
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| StoreError::ConversationNotFound(id.clone()))
    }

    fn message_mut(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> Result<&mut crate::conversation::Message, StoreError> {
        self.conversation_mut(conversation_id)?
            .get_message_mut(message_id)
            .ok_or_else(|| StoreError::MessageNotFound {
                conversation_id: conversation_id.clone(),
                message_id: message_id.clone(),
            })
    }
}

impl<B: ChatBackend> std::fmt::Debug for ConversationStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("backend", &self.backend.name())
            .field("conversations", &self.conversations.len())
            .field("active", &self.active)
            .field("in_flight", &self.is_in_flight())
            .finish_non_exhaustive()
    }
}
