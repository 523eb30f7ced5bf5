// Shared fixtures for the call engine integration tests
//
// Mock adapters, a scripted remote user driving the inbound track and control
// channel, and a transport loop pulling the outbound track.

#![allow(dead_code)]

use moshi_call::adapters::{Adapters, Completer, CompletionRequest, Synthesizer, Transcriber};
use moshi_call::audio::{AudioFormat, AudioFrame, ChannelSource};
use moshi_call::call::{MpscControlChannel, PlayerTrack};
use moshi_call::config::Config;
use moshi_call::conversation::Voice;
use moshi_call::error::AdapterError;
use moshi_call::session::{CallSession, SessionConfig};
use moshi_call::storage::MemoryStore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const FORMAT: AudioFormat = AudioFormat {
    sample_rate: 48000,
    channels: 2,
};

/// Config with timeouts short enough for tests
pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.detector.start_timeout_ms = 300;
    cfg.detector.end_timeout_ms = 60;
    cfg.detector.max_len_ms = 1_000;
    cfg.player.buffer_ahead_ms = 100;
    cfg.player.frame_send_timeout_ms = 300;
    cfg.player.poll_interval_ms = 5;
    cfg.engine.handshake_timeout_ms = 300;
    cfg.engine.flush_timeout_ms = 500;
    cfg.adapters.transcribe_timeout_ms = 300;
    cfg.adapters.complete_timeout_ms = 300;
    cfg.adapters.synthesize_timeout_ms = 300;
    cfg
}

/// `ms` milliseconds of a non-silent signal
pub fn speech(ms: u64, pts: u64) -> AudioFrame {
    let per_channel = (FORMAT.sample_rate as u64 * ms / 1000) as usize;
    let samples = (0..per_channel * FORMAT.channels as usize)
        .map(|i| ((i % 64) as i16 - 32) * 200)
        .collect();
    AudioFrame::new(samples, FORMAT, pts)
}

/// One spoken utterance as the transport would deliver it: 20 ms frames
pub fn utterance(ms: u64) -> Vec<AudioFrame> {
    let per_frame = FORMAT.sample_rate as u64 / 50;
    (0..ms / 20).map(|i| speech(20, i * per_frame)).collect()
}

// ============================================================================
// Mock adapters
// ============================================================================

pub struct MockTranscriber {
    pub text: String,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockTranscriber {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, audio: &AudioFrame, _language: &str) -> Result<String, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!audio.is_empty(), "transcriber got an empty utterance");
        if self.fail {
            return Err(AdapterError::Transcription("service unavailable".to_string()));
        }
        Ok(self.text.clone())
    }
}

/// Returns scripted responses in order, then `fallback`
pub struct ScriptedCompleter {
    responses: Mutex<VecDeque<String>>,
    fallback: String,
    fail: bool,
    /// Held before answering
    delay: Option<Duration>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompleter {
    pub fn new(responses: &[&str], fallback: &str) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            fallback: fallback.to_string(),
            fail: false,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(response: &str) -> Self {
        Self::new(&[], response)
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::always("")
        }
    }

    /// Answers only after `delay`
    pub fn stalled(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::always("too late")
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Completer for ScriptedCompleter {
    async fn complete(&self, request: CompletionRequest) -> Result<Vec<String>, AdapterError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AdapterError::Completion("model overloaded".to_string()));
        }
        let next = self.responses.lock().unwrap().pop_front();
        Ok(vec![next.unwrap_or_else(|| self.fallback.clone())])
    }
}

/// Synthesizes `ms` of silence per call
pub struct MockSynthesizer {
    pub ms: u64,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub texts: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    pub fn new(ms: u64) -> Self {
        Self {
            ms,
            fail: false,
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(0)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &Voice) -> Result<AudioFrame, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(AdapterError::Synthesis("voice unavailable".to_string()));
        }
        let per_channel = (FORMAT.sample_rate as u64 * self.ms / 1000) as usize;
        Ok(AudioFrame::silence(per_channel, FORMAT, 0))
    }
}

// ============================================================================
// Remote peer
// ============================================================================

/// What the scripted user does each time the engine starts listening
pub enum UserTurn {
    Speak(Vec<AudioFrame>),
    Silent,
    HangUp,
}

/// Control messages that end the conversation from the peer's point of view
fn is_final(msg: &str) -> bool {
    matches!(
        msg,
        "status bye" | "status maxlen" | "status stop" | "error internal"
    )
}

/// The scripted remote user: answers `status listening` from a script and
/// records every control message it receives
pub struct User {
    pub messages: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl User {
    pub fn spawn(
        mut control: mpsc::UnboundedReceiver<String>,
        audio: mpsc::Sender<AudioFrame>,
        script: Vec<UserTurn>,
    ) -> Self {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&messages);
        let task = tokio::spawn(async move {
            let mut audio = Some(audio);
            let mut script: VecDeque<UserTurn> = script.into();
            while let Some(msg) = control.recv().await {
                log.lock().unwrap().push(msg.clone());
                if is_final(&msg) {
                    break;
                }
                if msg != "status listening" {
                    continue;
                }
                match script.pop_front() {
                    Some(UserTurn::Speak(frames)) => {
                        if let Some(tx) = &audio {
                            for frame in frames {
                                if tx.send(frame).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(UserTurn::HangUp) => {
                        audio = None;
                    }
                    Some(UserTurn::Silent) | None => {}
                }
            }
        });
        Self { messages, task }
    }

    /// Wait for the conversation to end and return everything received
    pub async fn finish(self, limit: Duration) -> Vec<String> {
        let mut task = self.task;
        if tokio::time::timeout(limit, &mut task).await.is_err() {
            task.abort();
        }
        let messages = self.messages.lock().unwrap().clone();
        messages
    }
}

/// Pull response audio the way a transport would, until the track closes
pub fn spawn_transport(track: PlayerTrack) -> JoinHandle<Vec<AudioFrame>> {
    tokio::spawn(async move {
        let mut frames = Vec::new();
        while let Ok(frame) = track.recv().await {
            frames.push(frame);
        }
        frames
    })
}

// ============================================================================
// Call harness
// ============================================================================

pub struct Mocks {
    pub transcriber: Arc<MockTranscriber>,
    pub completer: Arc<ScriptedCompleter>,
    pub synthesizer: Arc<MockSynthesizer>,
}

impl Mocks {
    pub fn new(transcriber: MockTranscriber, completer: ScriptedCompleter) -> Self {
        Self {
            transcriber: Arc::new(transcriber),
            completer: Arc::new(completer),
            synthesizer: Arc::new(MockSynthesizer::new(100)),
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: MockSynthesizer) -> Self {
        self.synthesizer = Arc::new(synthesizer);
        self
    }

    pub fn adapters(&self) -> Adapters {
        Adapters::new(
            self.transcriber.clone(),
            self.completer.clone(),
            self.synthesizer.clone(),
        )
    }
}

/// A fully wired call whose remote side follows `script`
pub struct Call {
    pub session: Arc<CallSession>,
    pub store: Arc<MemoryStore>,
    pub user: User,
    /// Pulls the outbound track; `None` when nothing does
    pub transport: Option<JoinHandle<Vec<AudioFrame>>>,
}

impl Call {
    pub async fn connect(cfg: &Config, mocks: &Mocks, script: Vec<UserTurn>) -> anyhow::Result<Self> {
        Self::wire(cfg, mocks, script, true).await
    }

    /// Like `connect`, but nobody pulls the outbound track
    pub async fn connect_without_transport(
        cfg: &Config,
        mocks: &Mocks,
        script: Vec<UserTurn>,
    ) -> anyhow::Result<Self> {
        Self::wire(cfg, mocks, script, false).await
    }

    async fn wire(
        cfg: &Config,
        mocks: &Mocks,
        script: Vec<UserTurn>,
        pull: bool,
    ) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let session = Arc::new(CallSession::new(
            SessionConfig::default(),
            cfg,
            mocks.adapters(),
            store.clone(),
        ));

        let (audio_tx, source) = ChannelSource::channel("mic", 256);
        session.bind_audio(Box::new(source)).await?;
        let (channel, control_rx) = MpscControlChannel::new("control");
        session.attach_control(Arc::new(channel))?;

        let user = User::spawn(control_rx, audio_tx, script);
        let transport = pull.then(|| spawn_transport(session.outbound_track()));

        Ok(Self {
            session,
            store,
            user,
            transport,
        })
    }
}
