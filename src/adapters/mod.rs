//! Service adapters used by the turn engine
//!
//! Each adapter wraps one network service behind a narrow request/response
//! call. Vendor clients implement these traits; the engine wraps every call
//! in its own timeout, so implementations need not enforce one.

pub mod prompt;

use std::sync::Arc;

use crate::audio::AudioFrame;
use crate::conversation::{Message, Voice};
use crate::error::AdapterError;

/// Audio → text
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one complete utterance spoken in `language` (BCP-47)
    async fn transcribe(&self, audio: &AudioFrame, language: &str) -> Result<String, AdapterError>;
}

/// Parameters for one text completion
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prefix followed by the conversation so far
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub stop: Vec<String>,
    /// Number of candidates to generate
    pub n: u32,
    /// Opaque end-user id for abuse monitoring
    pub user: Option<String>,
}

/// Conversation → candidate responses
#[async_trait::async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Vec<String>, AdapterError>;
}

/// Text → audio in the session format
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &Voice) -> Result<AudioFrame, AdapterError>;
}

/// The three services a call depends on, constructed once at process start
#[derive(Clone)]
pub struct Adapters {
    pub transcriber: Arc<dyn Transcriber>,
    pub completer: Arc<dyn Completer>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

impl Adapters {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        completer: Arc<dyn Completer>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            transcriber,
            completer,
            synthesizer,
        }
    }
}
