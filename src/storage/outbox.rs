use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, warn};

use super::TranscriptStore;
use crate::audio::AudioFrame;
use crate::conversation::{AudioRef, Transcript};

/// Background persistence for one call
///
/// Transcript snapshots are single-slot: submitting a newer snapshot aborts an
/// unfinished write of an older one, since the newer one supersedes it. Audio
/// clips are distinct objects and are all written.
#[derive(Clone)]
pub struct Outbox {
    store: Arc<dyn TranscriptStore>,

    /// The in-flight transcript write, if any
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,

    /// In-flight audio writes
    audio: Arc<Mutex<JoinSet<()>>>,
}

impl Outbox {
    pub fn new(store: Arc<dyn TranscriptStore>) -> Self {
        Self {
            store,
            pending: Arc::new(Mutex::new(None)),
            audio: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Queue a transcript snapshot for writing
    pub async fn submit(&self, snapshot: Transcript) {
        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.take() {
            if !previous.is_finished() {
                debug!("Superseding unfinished transcript write");
                previous.abort();
            }
        }

        let store = Arc::clone(&self.store);
        *pending = Some(tokio::spawn(async move {
            if let Err(e) = store.save(&snapshot).await {
                error!("Failed to save transcript {}: {:#}", snapshot.id, e);
            }
        }));
    }

    /// Queue one audio clip for writing
    pub async fn store_audio(&self, reference: AudioRef, frame: AudioFrame) {
        let store = Arc::clone(&self.store);
        let mut audio = self.audio.lock().await;
        // Reap clips that already landed
        while audio.try_join_next().is_some() {}
        audio.spawn(async move {
            if let Err(e) = store.save_audio(&reference, &frame).await {
                error!("Failed to save audio {}: {:#}", reference.path, e);
            }
        });
    }

    /// Wait for every queued write, giving up after `limit`
    ///
    /// Returns false if writes were still running when the limit expired.
    pub async fn flush(&self, limit: Duration) -> bool {
        let drain = async {
            if let Some(task) = self.pending.lock().await.take() {
                if let Err(e) = task.await {
                    if !e.is_cancelled() {
                        error!("Transcript write panicked: {}", e);
                    }
                }
            }
            let mut audio = self.audio.lock().await;
            while let Some(result) = audio.join_next().await {
                if let Err(e) = result {
                    error!("Audio write panicked: {}", e);
                }
            }
        };

        match tokio::time::timeout(limit, drain).await {
            Ok(()) => true,
            Err(_) => {
                warn!("Storage writes still pending after {:?}", limit);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ActivityType, Message};
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_flush_persists_latest_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let outbox = Outbox::new(store.clone());

        let mut transcript = Transcript::new(ActivityType::Unstructured, "en-US");
        outbox.submit(transcript.clone()).await;
        transcript.push(Message::user("hello")).unwrap();
        outbox.submit(transcript.clone()).await;

        assert!(outbox.flush(Duration::from_secs(1)).await);
        let saved = store.load(&transcript.id).await.unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test]
    async fn test_flush_with_nothing_queued() {
        let outbox = Outbox::new(Arc::new(MemoryStore::new()));
        assert!(outbox.flush(Duration::from_millis(10)).await);
    }
}
