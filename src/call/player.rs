// Response playback to the remote client's speakers
//
// `send_utterance` writes a whole synthesized response into a FIFO and waits.
// The transport pulls fixed-size frames out through `PlayerTrack::recv` at
// its own cadence. Pacing happens on the pull side: the client buffers
// whatever it is handed and silently drops audio once its buffer overflows,
// so frames are held back whenever playback would run more than
// `buffer_ahead` ahead of wall clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, trace};

use crate::audio::{AudioFifo, AudioFormat, AudioFrame};
use crate::config::PlayerConfig;
use crate::error::{MediaStreamError, PlayerError};

struct PlaybackState {
    fifo: AudioFifo,
    /// When the in-flight send began
    send_started: Option<Instant>,
    /// Seconds of audio handed to the transport since the send began
    sent_secs: f64,
    /// A send is waiting for the FIFO to drain
    pending: bool,
}

struct Shared {
    state: Mutex<PlaybackState>,
    drained: Notify,
    closed: AtomicBool,
    frame_size: usize,
    buffer_ahead: Duration,
    poll_interval: Duration,
}

/// Outgoing audio track handed to the transport
///
/// Cloning yields another handle to the same track.
#[derive(Clone)]
pub struct PlayerTrack {
    shared: Arc<Shared>,
}

impl PlayerTrack {
    fn new(config: &PlayerConfig, format: AudioFormat) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PlaybackState {
                    fifo: AudioFifo::new(format),
                    send_started: None,
                    sent_secs: 0.0,
                    pending: false,
                }),
                drained: Notify::new(),
                closed: AtomicBool::new(false),
                frame_size: config.frame_size,
                buffer_ahead: config.buffer_ahead(),
                poll_interval: config.poll_interval(),
            }),
        }
    }

    /// Next frame of response audio, waiting until there is some
    ///
    /// Every frame carries exactly `frame_size` samples per channel; the tail
    /// of an utterance is padded with silence. Returns `MediaStreamError`
    /// once the track is closed.
    pub async fn recv(&self) -> Result<AudioFrame, MediaStreamError> {
        let shared = &self.shared;
        loop {
            if self.is_closed() {
                return Err(MediaStreamError);
            }

            let next = {
                let mut state = shared.state.lock().await;
                match state.fifo.read(shared.frame_size) {
                    Some(frame) => Some(frame),
                    // Partial frames must be flushed now; left behind they
                    // come out as a noise spike at the end of the utterance.
                    None => match state.fifo.read_all() {
                        Some(partial) => Some(pad(partial, shared.frame_size)),
                        None => {
                            if state.pending {
                                state.pending = false;
                                shared.drained.notify_one();
                            }
                            None
                        }
                    },
                }
            };

            match next {
                Some(frame) => {
                    self.pace(frame.seconds()).await;
                    return Ok(frame);
                }
                None => sleep(shared.poll_interval).await,
            }
        }
    }

    /// Close the track; pending and future `recv` calls fail.
    pub fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            debug!("Player track closed");
        }
        self.shared.drained.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Hold the frame back until releasing it keeps playback within `buffer_ahead`
    async fn pace(&self, frame_secs: f64) {
        let shared = &self.shared;
        let buffer_ahead = shared.buffer_ahead.as_secs_f64();
        loop {
            let ahead = {
                let state = shared.state.lock().await;
                match state.send_started {
                    Some(started) => state.sent_secs + frame_secs - started.elapsed().as_secs_f64(),
                    None => 0.0,
                }
            };
            if ahead <= buffer_ahead || self.is_closed() {
                break;
            }
            let throttle = shared.buffer_ahead / 3;
            trace!("Playback throttled {:?} ({:.3}s ahead)", throttle, ahead);
            sleep(throttle).await;
        }
        shared.state.lock().await.sent_secs += frame_secs;
    }

    async fn send_audio(&self, frame: &AudioFrame) -> Result<(), MediaStreamError> {
        {
            let mut state = self.shared.state.lock().await;
            state.send_started = Some(Instant::now());
            state.sent_secs = 0.0;
            state.fifo.write(frame);
            state.pending = !state.fifo.is_empty();
        }

        loop {
            if self.is_closed() {
                return Err(MediaStreamError);
            }
            let pending = self.shared.state.lock().await.pending;
            if !pending {
                return Ok(());
            }
            self.shared.drained.notified().await;
        }
    }

    async fn abort_send(&self) {
        let mut state = self.shared.state.lock().await;
        state.fifo.clear();
        state.pending = false;
        state.send_started = None;
    }
}

fn pad(mut frame: AudioFrame, samples_per_channel: usize) -> AudioFrame {
    let target = samples_per_channel * frame.channels as usize;
    if frame.samples.len() < target {
        frame.samples.resize(target, 0);
    }
    frame
}

/// Plays one synthesized utterance at a time over a `PlayerTrack`
pub struct ResponsePlayer {
    config: PlayerConfig,
    format: AudioFormat,
    track: PlayerTrack,
}

impl ResponsePlayer {
    pub fn new(config: PlayerConfig, format: AudioFormat) -> Self {
        debug!("Using transport frame size: {}", config.frame_size);
        let track = PlayerTrack::new(&config, format);
        Self {
            config,
            format,
            track,
        }
    }

    /// The outgoing track for the transport to pull from
    pub fn track(&self) -> PlayerTrack {
        self.track.clone()
    }

    /// Write the utterance to the track, returning once the transport has pulled all of it
    ///
    /// Errors:
    /// - `Timeout` if the track is still busy `frame_send_timeout` past the utterance length
    /// - `Stream` if the remote client hangs up
    /// - `Format` if the audio is not in the session format
    ///
    /// Only one send may be in flight at a time.
    pub async fn send_utterance(&self, audio: &AudioFrame) -> Result<(), PlayerError> {
        if audio.format() != self.format {
            return Err(PlayerError::Format {
                expected: self.format,
                got: audio.format(),
            });
        }

        trace!("Sending utterance of length: {:.3} sec", audio.seconds());
        let limit = audio.duration() + self.config.frame_send_timeout();
        match timeout(limit, self.track.send_audio(audio)).await {
            Ok(result) => {
                result?;
                trace!("Utterance sent");
                Ok(())
            }
            Err(_) => {
                self.track.abort_send().await;
                Err(PlayerError::Timeout { timeout: limit })
            }
        }
    }

    /// Stop playback and close the track
    pub fn close(&self) {
        self.track.close();
    }
}
