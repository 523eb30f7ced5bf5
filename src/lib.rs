pub mod adapters;
pub mod audio;
pub mod call;
pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod session;
pub mod storage;

pub use adapters::{Adapters, Completer, CompletionRequest, Synthesizer, Transcriber};
pub use audio::{AudioFifo, AudioFile, AudioFormat, AudioFrame, AudioSource, ChannelSource};
pub use call::{
    ControlChannel, MpscControlChannel, Phase, PlayerTrack, ResetReason, ResponsePlayer,
    UtteranceDetector,
};
pub use config::Config;
pub use conversation::{Activity, ActivityType, Character, Message, Role, Transcript, Voice};
pub use error::{AdapterError, ChannelClosed, DetectorError, MediaStreamError, PlayerError};
pub use http::{create_router, AppState};
pub use session::{CallSession, SessionConfig, SessionRegistry, SessionStats};
pub use storage::{JsonFileStore, MemoryStore, Outbox, TranscriptStore};
