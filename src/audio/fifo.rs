// Sample FIFO for accumulating and re-chunking audio
//
// Frames of any size go in; frames of an exact size (or everything that is
// buffered) come out. Timestamps on the way out are derived from the number
// of samples already read, so re-chunked output is contiguous.

use std::collections::VecDeque;
use tracing::warn;

use super::frame::{AudioFormat, AudioFrame};

#[derive(Debug)]
pub struct AudioFifo {
    format: AudioFormat,
    samples: VecDeque<i16>,
    /// Samples per channel ever written
    samples_written: u64,
    /// Samples per channel ever read (or discarded)
    samples_read: u64,
}

impl AudioFifo {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            samples: VecDeque::new(),
            samples_written: 0,
            samples_read: 0,
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Append a frame. Frames in a different format are dropped.
    pub fn write(&mut self, frame: &AudioFrame) -> bool {
        if frame.format() != self.format {
            warn!(
                "FIFO format mismatch: expected {}Hz/{}ch, got {}Hz/{}ch. Dropping frame.",
                self.format.sample_rate,
                self.format.channels,
                frame.sample_rate,
                frame.channels
            );
            return false;
        }
        self.samples.extend(frame.samples.iter().copied());
        self.samples_written += frame.samples_per_channel() as u64;
        true
    }

    /// Read exactly `samples_per_channel` samples, or `None` if fewer are buffered.
    pub fn read(&mut self, samples_per_channel: usize) -> Option<AudioFrame> {
        if samples_per_channel == 0 || self.samples_available() < samples_per_channel {
            return None;
        }
        Some(self.take(samples_per_channel))
    }

    /// Read everything that is buffered, or `None` if the FIFO is empty.
    pub fn read_all(&mut self) -> Option<AudioFrame> {
        let available = self.samples_available();
        if available == 0 {
            return None;
        }
        Some(self.take(available))
    }

    /// Discard everything that is buffered.
    pub fn clear(&mut self) {
        self.samples_read += self.samples_available() as u64;
        self.samples.clear();
    }

    /// Samples per channel currently buffered
    pub fn samples_available(&self) -> usize {
        self.samples.len() / self.format.channels.max(1) as usize
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Seconds of audio currently buffered
    pub fn seconds_available(&self) -> f64 {
        self.samples_available() as f64 / self.format.sample_rate.max(1) as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn take(&mut self, samples_per_channel: usize) -> AudioFrame {
        let count = samples_per_channel * self.format.channels.max(1) as usize;
        let samples: Vec<i16> = self.samples.drain(..count).collect();
        let frame = AudioFrame::new(samples, self.format, self.samples_read);
        self.samples_read += samples_per_channel as u64;
        frame
    }
}
