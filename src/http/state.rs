use crate::session::SessionRegistry;
use crate::storage::{MemoryStore, TranscriptStore};
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live call sessions
    pub registry: SessionRegistry,

    /// Where finished calls' transcripts are persisted
    pub store: Arc<dyn TranscriptStore>,
}

impl AppState {
    pub fn new(registry: SessionRegistry) -> Self {
        Self {
            registry,
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Serve persisted transcripts from `store`
    pub fn with_store(mut self, store: Arc<dyn TranscriptStore>) -> Self {
        self.store = store;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(SessionRegistry::default())
    }
}
