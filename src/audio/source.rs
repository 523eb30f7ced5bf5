use std::fmt;
use tokio::sync::mpsc;

use super::frame::AudioFrame;
use crate::error::MediaStreamError;

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Liveness of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Ended,
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackState::Live => write!(f, "live"),
            TrackState::Ended => write!(f, "ended"),
        }
    }
}

/// Inbound media track provided by the session transport
///
/// Implementations:
/// - `ChannelSource`: frames pushed through an mpsc channel by the transport
#[async_trait::async_trait]
pub trait AudioSource: Send + Sync {
    /// Receive the next frame
    ///
    /// Returns `MediaStreamError` once the remote end has gone away.
    async fn recv(&mut self) -> Result<AudioFrame, MediaStreamError>;

    fn kind(&self) -> TrackKind;

    fn state(&self) -> TrackState;

    /// Track label for logging
    fn label(&self) -> &str {
        "audio"
    }
}

/// Audio source fed by a channel sender held by the transport
///
/// Dropping every sender ends the stream.
pub struct ChannelSource {
    label: String,
    rx: mpsc::Receiver<AudioFrame>,
    ended: bool,
}

impl ChannelSource {
    pub fn new(label: impl Into<String>, rx: mpsc::Receiver<AudioFrame>) -> Self {
        Self {
            label: label.into(),
            rx,
            ended: false,
        }
    }

    /// Create a source together with the sender the transport writes frames into
    pub fn channel(label: impl Into<String>, capacity: usize) -> (mpsc::Sender<AudioFrame>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(label, rx))
    }
}

#[async_trait::async_trait]
impl AudioSource for ChannelSource {
    async fn recv(&mut self) -> Result<AudioFrame, MediaStreamError> {
        match self.rx.recv().await {
            Some(frame) => Ok(frame),
            None => {
                self.ended = true;
                Err(MediaStreamError)
            }
        }
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Audio
    }

    fn state(&self) -> TrackState {
        if self.ended {
            TrackState::Ended
        } else {
            TrackState::Live
        }
    }

    fn label(&self) -> &str {
        &self.label
    }
}
