//! Shared state for request handlers.

use std::sync::Arc;

use crate::engine::{InferenceEngine, QueryOptions};

/// State shared by every request
pub struct AppState {
    /// Where replies come from
    pub engine: Arc<dyn InferenceEngine>,
    /// Options sent with every query
    pub options: QueryOptions,
}

impl AppState {
    /// Create handler state
    pub fn new(engine: Arc<dyn InferenceEngine>, options: QueryOptions) -> Self {
        Self { engine, options }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine.name())
            .field("options", &self.options)
            .finish()
    }
}
