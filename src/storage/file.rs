use anyhow::{bail, Context, Result};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use super::TranscriptStore;
use crate::audio::{encode_wav, AudioFrame};
use crate::conversation::{AudioRef, Transcript};

/// Stores each transcript as `<root>/<id>.json` and its audio as WAV under `<root>/<id>/`
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create transcript directory {:?}", root))?;
        info!("Transcript store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn transcript_path(&self, transcript_id: &str) -> Result<PathBuf> {
        Ok(self.root.join(format!("{}.json", checked(transcript_id)?)))
    }

    fn audio_path(&self, audio: &AudioRef) -> Result<PathBuf> {
        Ok(self.root.join(checked(&audio.path)?))
    }
}

/// Reject ids that would escape the store root
fn checked(relative: &str) -> Result<&str> {
    let escapes = Path::new(relative)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if relative.is_empty() || escapes {
        bail!("Invalid storage path: {:?}", relative);
    }
    Ok(relative)
}

/// Write via a temporary file so an aborted write never leaves a torn file
async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {:?}", tmp))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move {:?} into place", path))?;
    Ok(())
}

#[async_trait::async_trait]
impl TranscriptStore for JsonFileStore {
    async fn save(&self, transcript: &Transcript) -> Result<()> {
        let path = self.transcript_path(&transcript.id)?;
        let bytes = serde_json::to_vec_pretty(transcript)?;
        write_atomic(&path, bytes).await?;
        debug!(
            "Saved transcript {} ({} messages)",
            transcript.id,
            transcript.len()
        );
        Ok(())
    }

    async fn save_audio(&self, audio: &AudioRef, frame: &AudioFrame) -> Result<()> {
        let path = self.audio_path(audio)?;
        let bytes = encode_wav(frame)?;
        write_atomic(&path, bytes).await?;
        debug!("Saved {:.3}s of audio to {}", frame.seconds(), audio.path);
        Ok(())
    }

    async fn load(&self, transcript_id: &str) -> Result<Transcript> {
        let path = self.transcript_path(transcript_id)?;
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Transcript {} not found", transcript_id))?;
        let transcript = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse transcript {}", transcript_id))?;
        Ok(transcript)
    }
}
