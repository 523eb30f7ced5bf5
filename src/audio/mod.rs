pub mod fifo;
pub mod file;
pub mod frame;
pub mod source;

pub use fifo::AudioFifo;
pub use file::{decode_wav, encode_wav, write_wav, AudioFile};
pub use frame::{AudioFormat, AudioFrame};
pub use source::{AudioSource, ChannelSource, TrackKind, TrackState};
