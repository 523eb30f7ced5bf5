use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::AudioFormat;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub adapters: AdapterConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "moshi-call".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Session-wide audio format
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let format = AudioFormat::default();
        Self {
            sample_rate: format.sample_rate,
            channels: format.channels,
        }
    }
}

impl AudioConfig {
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// Utterance boundary policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Wait this long for the user to start speaking
    pub start_timeout_ms: u64,
    /// A gap of this length between frames ends the utterance
    pub end_timeout_ms: u64,
    /// Maximum length of one utterance
    pub max_len_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            start_timeout_ms: 5_000,
            end_timeout_ms: 80,
            max_len_ms: 25_000,
        }
    }
}

impl DetectorConfig {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn end_timeout(&self) -> Duration {
        Duration::from_millis(self.end_timeout_ms)
    }

    pub fn max_len(&self) -> Duration {
        Duration::from_millis(self.max_len_ms)
    }
}

/// Response pacing policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Samples per channel in each frame handed to the transport
    pub frame_size: usize,
    /// How far ahead of wall clock audio may be buffered on the client
    pub buffer_ahead_ms: u64,
    /// Slack beyond the utterance length for the transport to drain it
    pub frame_send_timeout_ms: u64,
    /// Re-poll interval while the FIFO is empty
    pub poll_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            frame_size: 960,
            buffer_ahead_ms: 500,
            frame_send_timeout_ms: 500,
            poll_interval_ms: 50,
        }
    }
}

impl PlayerConfig {
    pub fn buffer_ahead(&self) -> Duration {
        Duration::from_millis(self.buffer_ahead_ms)
    }

    pub fn frame_send_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_send_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Turn loop policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Loop iterations per call; 0 disables the cap
    pub max_loops: usize,
    /// Consecutive silent listens answered with a prompt before resetting
    pub utt_start_max_count: u32,
    pub max_response_tokens: u32,
    pub stop_tokens: Vec<String>,
    /// Spoken when the user does not start talking
    pub still_there_prompt: String,
    /// How long `start()` waits for the control channel
    pub handshake_timeout_ms: u64,
    /// How long teardown waits for the last transcript write
    pub flush_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_loops: 30,
            utt_start_max_count: 2,
            max_response_tokens: 64,
            stop_tokens: vec!["1:".to_string()],
            still_there_prompt: "Are you still there?".to_string(),
            handshake_timeout_ms: 2_000,
            flush_timeout_ms: 2_000,
        }
    }
}

impl EngineConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

/// Ceilings for the service calls made each turn
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub transcribe_timeout_ms: u64,
    pub complete_timeout_ms: u64,
    pub synthesize_timeout_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            transcribe_timeout_ms: 10_000,
            complete_timeout_ms: 10_000,
            synthesize_timeout_ms: 5_000,
        }
    }
}

impl AdapterConfig {
    pub fn transcribe_timeout(&self) -> Duration {
        Duration::from_millis(self.transcribe_timeout_ms)
    }

    pub fn complete_timeout(&self) -> Duration {
        Duration::from_millis(self.complete_timeout_ms)
    }

    pub fn synthesize_timeout(&self) -> Duration {
        Duration::from_millis(self.synthesize_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub transcripts_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            transcripts_path: PathBuf::from("data/transcripts"),
        }
    }
}

impl Config {
    /// Load from a config file (any format the `config` crate knows) with
    /// `MOSHI__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("MOSHI").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }
}
