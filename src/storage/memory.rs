use anyhow::{Context, Result};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::TranscriptStore;
use crate::audio::AudioFrame;
use crate::conversation::{AudioRef, Transcript};

/// In-process store, for tests and for running without a disk
#[derive(Default)]
pub struct MemoryStore {
    transcripts: Mutex<HashMap<String, Transcript>>,
    audio: Mutex<HashMap<String, AudioFrame>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of every stored audio clip
    pub async fn audio_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.audio.lock().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait::async_trait]
impl TranscriptStore for MemoryStore {
    async fn save(&self, transcript: &Transcript) -> Result<()> {
        let mut transcripts = self.transcripts.lock().await;
        transcripts.insert(transcript.id.clone(), transcript.clone());
        Ok(())
    }

    async fn save_audio(&self, audio: &AudioRef, frame: &AudioFrame) -> Result<()> {
        let mut clips = self.audio.lock().await;
        clips.insert(audio.path.clone(), frame.clone());
        Ok(())
    }

    async fn load(&self, transcript_id: &str) -> Result<Transcript> {
        let transcripts = self.transcripts.lock().await;
        transcripts
            .get(transcript_id)
            .cloned()
            .with_context(|| format!("Transcript {} not found", transcript_id))
    }
}
