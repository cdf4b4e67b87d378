//! Parley Core - Streaming Chat Ingestion and Conversation State
//!
//! This crate holds everything a chat surface needs except the surface
//! itself: the conversation model, the transport that turns a streamed HTTP
//! response into discrete events, and the store that folds those events into
//! an observed conversation collection.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         UI Surface                             │
//! │        (terminal client, tests, anything that renders)         │
//! └──────────────┬───────────────────────────────▲────────────────┘
//!                │ send_message(content)         │ StoreChange
//!                ▼                               │
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     ConversationStore                          │
//! │   conversations (newest first) · active · in-flight flag       │
//! └──────────────┬───────────────────────────────▲────────────────┘
//!                │ ChatRequest                   │ ProtocolEvent
//!                ▼                               │
//! ┌───────────────────────────────────────────────────────────────┐
//! │                 ChatBackend (HttpBackend)                      │
//! │     POST body  ──►  bytes  ──►  EventDecoder  ──►  EventStream │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ConversationStore`]: owns conversations and drives streamed turns
//! - [`ChatBackend`]: where replies come from
//! - [`HttpBackend`]: the reqwest implementation of [`ChatBackend`]
//! - [`EventStream`]: decoded [`ProtocolEvent`]s for one turn
//! - [`StoreChange`]: what subscribers are told after each mutation
//!
//! # Quick Start
//!
//! ```ignore
//! use parley_core::{config::load_config, ConversationStore, HttpBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let backend = HttpBackend::from_config(&config)?;
//!     let mut store = ConversationStore::new(backend);
//!     let mut changes = store.subscribe();
//!
//!     store.send_message("Hello!").await?;
//!
//!     while let Ok(change) = changes.try_recv() {
//!         // Render the change
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`config`]: TOML + environment configuration for the client
//! - [`conversation`]: messages, conversations and title derivation
//! - [`events`]: protocol events and store change notifications
//! - [`ids`]: opaque identifiers
//! - [`store`]: the conversation store
//! - [`transport`]: request encoding, stream decoding, HTTP backend
//!
//! # No UI Dependencies
//!
//! This crate has no dependency on a terminal library or web framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod conversation;
pub mod events;
pub mod ids;
pub mod store;
pub mod transport;

pub use conversation::{derive_title, Conversation, Message, MessageRole, DEFAULT_TITLE};
pub use events::{ProtocolEvent, StoreChange};
pub use ids::{ConversationId, MessageId};
pub use store::{ConversationStore, StoreError, TurnOutcome};
pub use transport::{
    ChatBackend, ChatRequest, EventDecoder, EventStream, HttpBackend, TransportError, WireMessage,
};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ClientConfig, ClientToml,
    ConfigError, ConfigOverrides, ConfigSource,
};
