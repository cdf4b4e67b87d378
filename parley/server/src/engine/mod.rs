//! Inference Engine Abstraction
//!
//! The relay does not care which model produces the text. It hands a prompt
//! and [`QueryOptions`] to an [`InferenceEngine`] and reads
//! [`EngineEvent`]s until a result or error arrives.
//!
//! # Design Philosophy
//!
//! - **Channel out**: `query` returns a receiver, so the engine can keep
//!   generating on its own task while the relay forwards text
//! - **Drop to stop**: the relay drops the receiver when the client goes
//!   away; engines stop as soon as a send fails
//! - **Opaque extras**: events the relay has no use for arrive as
//!   [`EngineEvent::Other`] and are skipped

pub mod ollama;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub use ollama::OllamaEngine;

/// One event from an engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// A fragment of generated text
    TextDelta(String),
    /// Generation finished
    Result,
    /// Generation failed after it started
    Error(String),
    /// Anything else (thinking traces, tool activity, ...)
    Other {
        /// What kind of event this was
        kind: String,
    },
}

/// Options passed with every query
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryOptions {
    /// System prompt for the model
    pub system_prompt: Option<String>,
    /// Tools the engine may use; the relay never allows any
    pub allowed_tools: Vec<String>,
    /// Whether partial text should be streamed
    pub streaming_enabled: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            system_prompt: None,
            allowed_tools: Vec::new(),
            streaming_enabled: true,
        }
    }
}

impl QueryOptions {
    /// Set the system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Enable or disable partial streaming
    #[must_use]
    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.streaming_enabled = enabled;
        self
    }
}

/// Errors an engine reports before any event is produced
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine refused the query
    #[error("{message}")]
    Rejected {
        /// HTTP-style status to forward to the client
        status: u16,
        /// Human-readable reason
        message: String,
    },
}

impl EngineError {
    /// Status code to report for this error
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Rejected { status, .. } => *status,
        }
    }
}

/// Source of generated text
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Get the engine name (e.g., "Ollama")
    fn name(&self) -> &str;

    /// Check if the engine is reachable
    async fn health_check(&self) -> bool;

    /// Start generating a reply to `prompt`
    ///
    /// # Errors
    ///
    /// Returns an error if generation cannot start. An [`EngineError`] in the
    /// chain carries the status the relay should answer with.
    async fn query(
        &self,
        prompt: &str,
        options: &QueryOptions,
    ) -> anyhow::Result<mpsc::Receiver<EngineEvent>>;
}
