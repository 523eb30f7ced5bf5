// Utterance detection on an inbound audio track
//
// An utterance starts with the first frame received and ends when no frame
// arrives for `end_timeout`. The transport only forwards frames while the
// user is talking, so inter-frame gaps are the end-of-speech signal.

use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace, warn};

use crate::audio::{AudioFifo, AudioFormat, AudioFrame, AudioSource, TrackKind, TrackState};
use crate::config::DetectorConfig;
use crate::error::{DetectorError, TrackError};

/// An audio sink that cuts a track into utterances
pub struct UtteranceDetector {
    config: DetectorConfig,
    fifo: AudioFifo,
    track: Option<Box<dyn AudioSource>>,
}

impl UtteranceDetector {
    pub fn new(config: DetectorConfig, format: AudioFormat) -> Self {
        Self {
            config,
            fifo: AudioFifo::new(format),
            track: None,
        }
    }

    /// Set the audio track to listen to
    pub fn bind(&mut self, track: Box<dyn AudioSource>) -> Result<(), TrackError> {
        if track.kind() != TrackKind::Audio {
            return Err(TrackError::NotAudio {
                kind: track.kind(),
                label: track.label().to_string(),
            });
        }
        if track.state() != TrackState::Live {
            return Err(TrackError::NotLive {
                state: track.state(),
                label: track.label().to_string(),
            });
        }
        if let Some(old) = &self.track {
            warn!("Track already set: {}, replacing", old.label());
        }
        debug!("Track set: {}", track.label());
        self.track = Some(track);
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.track.is_some()
    }

    /// Release the bound track
    pub fn unbind(&mut self) -> Option<Box<dyn AudioSource>> {
        self.fifo.clear();
        self.track.take()
    }

    /// Wait for the next complete utterance
    ///
    /// Errors:
    /// - `NotStarted` if no frame arrives within `start_timeout`
    /// - `TooLong` once buffered audio exceeds `max_len`; the buffered audio is discarded
    /// - `Stream` if the user hangs up
    pub async fn get_utterance(&mut self) -> Result<AudioFrame, DetectorError> {
        let result = self.collect().await;
        if result.is_err() {
            self.fifo.clear();
        }
        result
    }

    async fn collect(&mut self) -> Result<AudioFrame, DetectorError> {
        let track = self.track.as_mut().ok_or(DetectorError::NoTrack)?;
        let fifo = &mut self.fifo;
        let format = fifo.format();
        fifo.clear();

        trace!("Waiting for utterance to start...");
        let start_deadline = Instant::now() + self.config.start_timeout();
        loop {
            let frame = match timeout_at(start_deadline, track.recv()).await {
                Ok(frame) => frame?,
                Err(_) => {
                    return Err(DetectorError::NotStarted {
                        timeout: self.config.start_timeout(),
                    })
                }
            };
            if accept(&frame, format) && fifo.write(&frame) {
                break;
            }
        }
        trace!("Utterance started");

        let max_len = self.config.max_len().as_secs_f64();
        loop {
            let seconds = fifo.seconds_available();
            if seconds > max_len {
                return Err(DetectorError::TooLong {
                    seconds,
                    max: self.config.max_len(),
                });
            }

            // Rejected frames do not count as activity, so the idle deadline
            // is measured from the last accepted frame.
            let idle_deadline = Instant::now() + self.config.end_timeout();
            loop {
                match timeout_at(idle_deadline, track.recv()).await {
                    Ok(frame) => {
                        let frame = frame?;
                        if accept(&frame, format) && fifo.write(&frame) {
                            break;
                        }
                    }
                    Err(_) => {
                        trace!("Utterance ended");
                        return Ok(finish(fifo));
                    }
                }
            }
        }
    }
}

fn finish(fifo: &mut AudioFifo) -> AudioFrame {
    let seconds = fifo.seconds_available();
    debug!("Detected utterance that is {:.3} sec long", seconds);
    // Never empty: the first accepted frame is already buffered.
    fifo.read_all()
        .unwrap_or_else(|| AudioFrame::silence(0, fifo.format(), 0))
}

fn accept(frame: &AudioFrame, format: AudioFormat) -> bool {
    if frame.is_empty() {
        trace!("Skipping empty frame at pts {}", frame.pts);
        return false;
    }
    if frame.format() != format {
        warn!(
            "Frame format mismatch: expected {}Hz/{}ch, got {}Hz/{}ch. Dropping frame.",
            format.sample_rate, format.channels, frame.sample_rate, frame.channels
        );
        return false;
    }
    true
}

