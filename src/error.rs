//! Error types for the call engine.
//!
//! Component errors are typed so the turn loop can classify them into
//! in-loop remediation, user-facing resets, transport faults and internal
//! faults. Application plumbing uses `anyhow`.

use std::time::Duration;
use thiserror::Error;

use crate::audio::{AudioFormat, TrackKind, TrackState};
use crate::conversation::Role;

/// The remote end stopped sending media (hang-up or disconnect).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("media stream ended")]
pub struct MediaStreamError;

/// The control channel to the remote peer is closed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("control channel closed")]
pub struct ChannelClosed;

/// A track was rejected when binding it to the detector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    #[error("non-audio tracks not supported, got {kind} track '{label}'")]
    NotAudio { kind: TrackKind, label: String },

    #[error("non-live tracks not supported, got {state} track '{label}'")]
    NotLive { state: TrackState, label: String },
}

/// Failures from `UtteranceDetector::get_utterance`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    /// The user did not start speaking in time.
    #[error("utterance not started within {timeout:?}")]
    NotStarted { timeout: Duration },

    /// A single utterance exceeded the length cap.
    #[error("utterance too long: {seconds:.3} sec > {max:?}")]
    TooLong { seconds: f64, max: Duration },

    #[error("no audio track bound")]
    NoTrack,

    #[error(transparent)]
    Stream(#[from] MediaStreamError),
}

/// Failures from `ResponsePlayer::send_utterance`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// The transport stopped pulling frames.
    #[error("utterance not sent within {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("audio format mismatch: expected {expected:?}, got {got:?}")]
    Format { expected: AudioFormat, got: AudioFormat },

    #[error(transparent)]
    Stream(#[from] MediaStreamError),
}

/// Failures from the transcription, completion and synthesis services.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("completion failed: {0}")]
    Completion(String),

    #[error("synthesis failed: {0}")]
    Synthesis(String),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

/// Rejected transcript appends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("{got} message out of order, expected {expected}")]
    OutOfOrder { expected: Role, got: Role },

    #[error("system messages belong to the activity prompt, not the transcript")]
    SystemMessage,
}
