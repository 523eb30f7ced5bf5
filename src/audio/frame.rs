use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session-wide audio format (16-bit PCM, interleaved)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48000, // WebRTC Opus rate
            channels: 2,        // Stereo
        }
    }
}

/// Audio sample data (16-bit PCM, interleaved)
///
/// A complete utterance is also represented as a single `AudioFrame`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Presentation timestamp, in samples per channel since the stream started
    pub pts: u64,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, format: AudioFormat, pts: u64) -> Self {
        Self {
            samples,
            sample_rate: format.sample_rate,
            channels: format.channels,
            pts,
        }
    }

    /// A frame of `samples_per_channel` zeroed samples.
    pub fn silence(samples_per_channel: usize, format: AudioFormat, pts: u64) -> Self {
        Self::new(
            vec![0; samples_per_channel * format.channels as usize],
            format,
            pts,
        )
    }

    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Number of samples per channel
    pub fn samples_per_channel(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length of the frame in seconds
    pub fn seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples_per_channel() as f64 / self.sample_rate as f64
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.seconds())
    }

    /// RMS energy of the frame.
    ///
    /// Squares are accumulated as i64; i16 is too small for typical signal strength.
    pub fn energy(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: i64 = self
            .samples
            .iter()
            .map(|&s| {
                let s = s as i64;
                s * s
            })
            .sum();
        (sum as f64 / self.samples.len() as f64).sqrt()
    }

    /// Concatenate frames of the same format into one frame, keeping the first pts.
    ///
    /// Returns `None` for an empty input.
    pub fn concat<'a>(frames: impl IntoIterator<Item = &'a AudioFrame>) -> Option<AudioFrame> {
        let mut iter = frames.into_iter();
        let first = iter.next()?;
        let mut merged = first.clone();
        for frame in iter {
            merged.samples.extend_from_slice(&frame.samples);
        }
        Some(merged)
    }
}
