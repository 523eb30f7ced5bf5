use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::adapters::Adapters;
use crate::audio::AudioSource;
use crate::call::turn::TurnLoop;
use crate::call::{ControlChannel, Notifier, Phase, PlayerTrack, ResponsePlayer, Status, UtteranceDetector};
use crate::config::Config;
use crate::conversation::Transcript;
use crate::storage::{Outbox, TranscriptStore};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

/// One voice call: an inbound audio track, an outbound track and a control
/// channel, driven by a turn loop running on its own task
pub struct CallSession {
    /// Session configuration
    config: SessionConfig,

    /// Service-wide settings the session was created with
    settings: Config,

    adapters: Adapters,

    notifier: Notifier,

    /// Taken by the loop task on start
    detector: Mutex<Option<UtteranceDetector>>,
    player: Mutex<Option<ResponsePlayer>>,

    /// Outgoing track, also held here so teardown can close it
    track: PlayerTrack,

    outbox: Outbox,

    transcript: Arc<RwLock<Transcript>>,

    phase: Arc<watch::Sender<Phase>>,

    /// Loop iterations started
    loops: Arc<AtomicUsize>,

    /// When the session was created
    started_at: chrono::DateTime<chrono::Utc>,

    started: AtomicBool,
    stopped: AtomicBool,

    cancel: CancellationToken,

    /// Handle for the turn loop task
    task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl CallSession {
    /// Create a new call session
    pub fn new(
        config: SessionConfig,
        settings: &Config,
        adapters: Adapters,
        store: Arc<dyn TranscriptStore>,
    ) -> Self {
        info!("Creating call session: {}", config.session_id);

        let format = settings.audio.format();
        let detector = UtteranceDetector::new(settings.detector.clone(), format);
        let player = ResponsePlayer::new(settings.player.clone(), format);
        let track = player.track();
        let transcript = Transcript::new(config.activity.kind(), config.language.clone());
        let (phase, _) = watch::channel(Phase::Idle);

        Self {
            config,
            settings: settings.clone(),
            adapters,
            notifier: Notifier::new(),
            detector: Mutex::new(Some(detector)),
            player: Mutex::new(Some(player)),
            track,
            outbox: Outbox::new(store),
            transcript: Arc::new(RwLock::new(transcript)),
            phase: Arc::new(phase),
            loops: Arc::new(AtomicUsize::new(0)),
            started_at: Utc::now(),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.session_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Bind the user's inbound audio track
    pub async fn bind_audio(&self, source: Box<dyn AudioSource>) -> Result<()> {
        let mut detector = self.detector.lock().await;
        let Some(detector) = detector.as_mut() else {
            bail!("Session {} already started", self.id());
        };
        detector
            .bind(source)
            .with_context(|| format!("Failed to bind audio for session {}", self.id()))
    }

    /// Attach the control channel to the peer
    pub fn attach_control(&self, channel: Arc<dyn ControlChannel>) -> Result<()> {
        self.notifier.attach(channel)
    }

    /// The track the transport pulls response audio from
    pub fn outbound_track(&self) -> PlayerTrack {
        self.track.clone()
    }

    /// Start the conversation once the peer is connected
    ///
    /// Waits up to the handshake timeout for the control channel. Fails if the
    /// channel never shows up or no audio track is bound.
    pub async fn start(&self) -> Result<()> {
        if self.stopped.load(Ordering::SeqCst) {
            bail!("Session {} already stopped", self.id());
        }
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Session already started");
            return Ok(());
        }

        match self.spawn_loop().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.started.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn spawn_loop(&self) -> Result<()> {
        info!("Starting call session: {}", self.id());

        self.notifier
            .wait_connected(self.settings.engine.handshake_timeout())
            .await
            .context("Handshake failed")?;

        let (detector, player) = {
            let mut detector = self.detector.lock().await;
            let mut player = self.player.lock().await;
            if !detector.as_ref().is_some_and(|d| d.is_bound()) {
                bail!("No audio track bound to session {}", self.id());
            }
            match (detector.take(), player.take()) {
                (Some(detector), Some(player)) => (detector, player),
                _ => bail!("Session {} components already in use", self.id()),
            }
        };

        let transcript_id = self.transcript.read().await.id.clone();
        // Best effort: the loop notices a closed channel on its first send
        let _ = self.notifier.status(Status::Start);
        let _ = self.notifier.info("tid", &transcript_id);

        let turn_loop = TurnLoop {
            engine: self.settings.engine.clone(),
            timeouts: self.settings.adapters.clone(),
            detector,
            player,
            notifier: self.notifier.clone(),
            adapters: self.adapters.clone(),
            prompt: self.config.activity.base_prompt(),
            language: self.config.language.clone(),
            voice: self.config.character.voice.clone(),
            user_id: self.config.user_id.clone(),
            transcript: Arc::clone(&self.transcript),
            outbox: self.outbox.clone(),
            phase: Arc::clone(&self.phase),
            loops: Arc::clone(&self.loops),
            utt_start_count: 0,
        };

        let cancel = self.cancel.clone();
        let track = self.track.clone();
        let outbox = self.outbox.clone();
        let phase = Arc::clone(&self.phase);
        let flush_timeout = self.settings.engine.flush_timeout();
        let span = info_span!("call", session = %self.config.session_id);

        let task = tokio::spawn(
            async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!("Call cancelled");
                        Phase::Ended
                    }
                    outcome = turn_loop.run() => outcome,
                };

                track.close();
                if !outbox.flush(flush_timeout).await {
                    warn!("Final transcript flush incomplete");
                }
                phase.send_replace(outcome);
                info!("Call finished: {}", outcome);
            }
            .instrument(span),
        );

        {
            let mut handle = self.task_handle.lock().await;
            *handle = Some(task);
        }

        info!("Call session started successfully");
        Ok(())
    }

    /// Stop the call at whatever phase it is in
    ///
    /// Never fails; calling it again returns the same final stats.
    pub async fn stop(&self) -> SessionStats {
        if self.stopped.swap(true, Ordering::SeqCst) {
            self.wait_finished().await;
            return self.stats().await;
        }

        info!("Stopping call session: {}", self.id());

        if !self.phase().is_terminal() {
            let _ = self.notifier.status(Status::Stop);
        }
        self.cancel.cancel();

        let task = self.task_handle.lock().await.take();
        match task {
            Some(task) => {
                if let Err(e) = task.await {
                    error!("Call task panicked: {}", e);
                    self.phase.send_replace(Phase::Failed);
                }
            }
            None => {
                // Never started: nothing is running, release the track
                self.track.close();
                self.detector.lock().await.take();
                self.phase.send_replace(Phase::Ended);
            }
        }

        info!("Call session stopped");
        self.stats().await
    }

    /// Wait until the call reaches a terminal phase
    pub async fn wait_finished(&self) -> Phase {
        let mut rx = self.phase.subscribe();
        let finished = match rx.wait_for(|phase| phase.is_terminal()).await {
            Ok(phase) => *phase,
            Err(_) => self.phase(),
        };
        finished
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.phase().is_terminal()
    }

    /// Get current session statistics
    pub async fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);
        let (transcript_id, turns) = {
            let transcript = self.transcript.read().await;
            (transcript.id.clone(), transcript.turns())
        };

        SessionStats {
            session_id: self.config.session_id.clone(),
            transcript_id,
            phase: self.phase(),
            loops: self.loops.load(Ordering::SeqCst),
            turns,
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
        }
    }

    /// Snapshot of the conversation so far
    pub async fn transcript(&self) -> Transcript {
        self.transcript.read().await.clone()
    }
}
