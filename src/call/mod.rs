//! Conversation turn engine
//!
//! - `UtteranceDetector`: inbound track → one utterance per call
//! - `ResponsePlayer`: one synthesized utterance → paced outbound track
//! - `Notifier`: status/transcript/error messages over the control channel
//! - the turn loop that sequences listen → transcribe → think → speak

pub mod control;
pub mod detector;
pub mod phase;
pub mod player;
pub(crate) mod turn;

pub use control::{ControlChannel, MpscControlChannel, Notifier, PeerError, Status};
pub use detector::UtteranceDetector;
pub use phase::{Phase, ResetReason};
pub use player::{PlayerTrack, ResponsePlayer};
