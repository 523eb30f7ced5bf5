//! Transcript persistence
//!
//! The turn loop never waits on storage: snapshots and audio go through the
//! `Outbox`, which keeps at most one transcript write in flight per call.

mod file;
mod memory;
mod outbox;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use outbox::Outbox;

use anyhow::Result;

use crate::audio::AudioFrame;
use crate::conversation::{AudioRef, Role, Transcript};

/// Durable home for transcripts and their audio
#[async_trait::async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Write the full transcript, replacing any earlier version
    async fn save(&self, transcript: &Transcript) -> Result<()>;

    async fn save_audio(&self, audio: &AudioRef, frame: &AudioFrame) -> Result<()>;

    async fn load(&self, transcript_id: &str) -> Result<Transcript>;
}

/// Storage reference for the audio of the `index`-th message of a transcript
pub fn audio_ref(transcript_id: &str, index: usize, role: Role) -> AudioRef {
    AudioRef {
        path: format!("{}/{:03}-{}.wav", transcript_id, index, role),
    }
}
