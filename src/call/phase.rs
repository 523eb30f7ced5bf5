use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a call was reset; the user is expected to start a new call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResetReason {
    /// Too many consecutive listens without the user speaking
    UsrNotSpeaking,
    /// The completion service produced nothing to say
    EmptyResponse,
    /// The transport stopped pulling response audio
    Timeout,
}

impl ResetReason {
    /// Code sent to the peer
    pub fn code(&self) -> &'static str {
        match self {
            ResetReason::UsrNotSpeaking => "usrNotSpeaking",
            ResetReason::EmptyResponse => "empty assistant response",
            ResetReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Lifecycle phase of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "reason", rename_all = "lowercase")]
pub enum Phase {
    /// Waiting for the control channel and audio track
    Idle,
    Listening,
    Transcribing,
    Thinking,
    Speaking,
    /// Finished normally: loop cap, hang-up or stop
    Ended,
    /// Finished on a user-facing condition
    Reset(ResetReason),
    /// Finished on an internal fault
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Ended | Phase::Reset(_) | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => f.write_str("idle"),
            Phase::Listening => f.write_str("listening"),
            Phase::Transcribing => f.write_str("transcribing"),
            Phase::Thinking => f.write_str("thinking"),
            Phase::Speaking => f.write_str("speaking"),
            Phase::Ended => f.write_str("ended"),
            Phase::Reset(reason) => write!(f, "reset ({})", reason),
            Phase::Failed => f.write_str("failed"),
        }
    }
}
