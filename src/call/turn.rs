// The conversation turn loop
//
// One loop iteration is one turn: listen → transcribe → think → speak.
// Component errors are classified here and never escape the loop; the loop
// returns the terminal phase instead.

use anyhow::anyhow;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, trace, warn};

use super::control::{Notifier, PeerError, Status};
use super::detector::UtteranceDetector;
use super::phase::{Phase, ResetReason};
use super::player::ResponsePlayer;
use crate::adapters::{Adapters, CompletionRequest};
use crate::audio::AudioFrame;
use crate::config::{AdapterConfig, EngineConfig};
use crate::conversation::{Message, Role, Transcript, Voice};
use crate::error::{AdapterError, ChannelClosed, DetectorError, MediaStreamError, PlayerError};
use crate::storage::{audio_ref, Outbox};

/// How a turn stopped short
#[derive(Error, Debug)]
enum TurnError {
    /// The user must restart the call
    #[error("reset: {0}")]
    Reset(ResetReason),

    /// User hung up
    #[error("media stream ended")]
    Disconnected,

    #[error("control channel closed")]
    ChannelClosed,

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ChannelClosed> for TurnError {
    fn from(_: ChannelClosed) -> Self {
        TurnError::ChannelClosed
    }
}

impl From<MediaStreamError> for TurnError {
    fn from(_: MediaStreamError) -> Self {
        TurnError::Disconnected
    }
}

/// Everything one call's loop owns
pub(crate) struct TurnLoop {
    pub engine: EngineConfig,
    pub timeouts: AdapterConfig,
    pub detector: UtteranceDetector,
    pub player: ResponsePlayer,
    pub notifier: Notifier,
    pub adapters: Adapters,
    /// Activity system prefix
    pub prompt: Vec<Message>,
    pub language: String,
    pub voice: Voice,
    pub user_id: Option<String>,
    pub transcript: Arc<RwLock<Transcript>>,
    pub outbox: Outbox,
    pub phase: Arc<watch::Sender<Phase>>,
    pub loops: Arc<AtomicUsize>,
    /// Consecutive listens where the user never started speaking
    pub utt_start_count: u32,
}

impl TurnLoop {
    /// Run turns until a terminal phase is reached
    pub async fn run(mut self) -> Phase {
        info!("Chat loop started");
        let outcome = self.run_loops().await;
        info!("Chat loop finished: {}", outcome);
        outcome
    }

    async fn run_loops(&mut self) -> Phase {
        if self.notifier.status(Status::Hello).is_err() {
            info!("Control channel closed before hello");
            return Phase::Ended;
        }

        let max_loops = self.engine.max_loops;
        for i in 0.. {
            if max_loops != 0 && i == max_loops {
                info!("Reached max_loops={}", max_loops);
                let _ = self.notifier.status(Status::MaxLen);
                return Phase::Ended;
            }
            debug!(loop_index = i, "Starting loop");
            self.loops.store(i + 1, Ordering::SeqCst);

            match self.turn().await {
                Ok(()) => {}
                Err(TurnError::Reset(reason)) => {
                    info!("Resetting call: {}", reason);
                    let _ = self.notifier.error(PeerError::Reset(reason));
                    let _ = self.notifier.status(Status::Bye);
                    return Phase::Reset(reason);
                }
                Err(TurnError::Disconnected) => {
                    info!("User hung up (disconnect).");
                    return Phase::Ended;
                }
                Err(TurnError::ChannelClosed) => {
                    info!("Control channel closed.");
                    return Phase::Ended;
                }
                Err(e) => {
                    error!("Caught unexpected error: {:#}", e);
                    let _ = self.notifier.error(PeerError::Internal);
                    return Phase::Failed;
                }
            }
        }
        Phase::Ended
    }

    /// One turn
    async fn turn(&mut self) -> Result<(), TurnError> {
        self.notifier.status(Status::LoopStart)?;

        self.enter(Phase::Listening, Status::Listening)?;
        let usr_audio = match self.detector.get_utterance().await {
            Ok(audio) => audio,
            Err(DetectorError::TooLong { seconds, .. }) => {
                debug!("User utterance too long ({:.1}s), prompting user to try again.", seconds);
                self.notifier.error(PeerError::UttTooLong)?;
                return Ok(());
            }
            Err(DetectorError::NotStarted { .. }) => {
                trace!("User didn't start speaking {} times.", self.utt_start_count);
                if self.utt_start_count >= self.engine.utt_start_max_count {
                    debug!("User considered inactive.");
                    return Err(TurnError::Reset(ResetReason::UsrNotSpeaking));
                }
                let prompt = self.engine.still_there_prompt.clone();
                self.speak_to_user(&prompt).await?;
                self.utt_start_count += 1;
                return Ok(());
            }
            Err(DetectorError::Stream(_)) => return Err(TurnError::Disconnected),
            Err(DetectorError::NoTrack) => return Err(anyhow!("no audio track bound").into()),
        };
        self.utt_start_count = 0;

        self.enter(Phase::Transcribing, Status::Transcribing)?;
        let usr_text = self.transcribe(&usr_audio).await?;
        let usr_msg = self.add_message(Message::user(usr_text), Some(usr_audio)).await?;
        self.notifier.transcript(&usr_msg)?;

        self.enter(Phase::Thinking, Status::Thinking)?;
        let ast_text = self.get_response().await?;
        if ast_text.trim().is_empty() {
            warn!("Got empty assistant response");
            return Err(TurnError::Reset(ResetReason::EmptyResponse));
        }
        let ast_msg = self.add_message(Message::assistant(ast_text), None).await?;
        self.notifier.transcript(&ast_msg)?;

        self.enter(Phase::Speaking, Status::Speaking)?;
        let ast_audio = self.synthesize(&ast_msg.body).await?;
        if let Some(reference) = &ast_msg.audio {
            self.outbox.store_audio(reference.clone(), ast_audio.clone()).await;
        }
        self.play(&ast_audio).await
    }

    fn enter(&self, phase: Phase, status: Status) -> Result<(), TurnError> {
        self.phase.send_replace(phase);
        self.notifier.status(status)?;
        Ok(())
    }

    /// Speak a remediation prompt; it is not part of the transcript
    async fn speak_to_user(&self, text: &str) -> Result<(), TurnError> {
        debug!("Prompting user: {}", text);
        self.notifier.info("prompt", text)?;
        let audio = self.synthesize(text).await?;
        self.play(&audio).await
    }

    async fn play(&self, audio: &AudioFrame) -> Result<(), TurnError> {
        match self.player.send_utterance(audio).await {
            Ok(()) => Ok(()),
            Err(PlayerError::Timeout { timeout }) => {
                debug!("Response not sent within {:?}", timeout);
                Err(TurnError::Reset(ResetReason::Timeout))
            }
            Err(PlayerError::Stream(_)) => Err(TurnError::Disconnected),
            Err(e @ PlayerError::Format { .. }) => Err(anyhow::Error::new(e).into()),
        }
    }

    /// Append to the transcript and queue the snapshot for persistence
    async fn add_message(
        &self,
        msg: Message,
        audio: Option<AudioFrame>,
    ) -> Result<Message, TurnError> {
        let (msg, snapshot) = {
            let mut transcript = self.transcript.write().await;
            let reference = audio_ref(&transcript.id, transcript.len(), msg.role);
            let msg = msg.with_audio(reference);
            let msg = transcript.push(msg).map_err(anyhow::Error::new)?.clone();
            (msg, transcript.clone())
        };
        trace!("Added {} message", msg.role);

        if let (Some(audio), Some(reference)) = (audio, &msg.audio) {
            self.outbox.store_audio(reference.clone(), audio).await;
        }
        self.outbox.submit(snapshot).await;
        Ok(msg)
    }

    async fn transcribe(&self, audio: &AudioFrame) -> Result<String, TurnError> {
        debug!("Transcribing {:.3}s of user audio", audio.seconds());
        let text = within(
            "transcription",
            self.timeouts.transcribe_timeout(),
            self.adapters.transcriber.transcribe(audio, &self.language),
        )
        .await?;
        debug!("Transcribed user utterance: {}", shorten(&text));
        Ok(text)
    }

    /// The character's response to the conversation so far
    async fn get_response(&self) -> Result<String, TurnError> {
        let messages = {
            let transcript = self.transcript.read().await;
            let mut messages = self.prompt.clone();
            messages.extend_from_slice(transcript.messages());
            messages
        };
        debug_assert_eq!(messages.last().map(|m| m.role), Some(Role::Usr));

        let request = CompletionRequest {
            messages,
            max_tokens: self.engine.max_response_tokens,
            stop: self.engine.stop_tokens.clone(),
            n: 1,
            user: self.user_id.clone(),
        };
        let candidates = within(
            "completion",
            self.timeouts.complete_timeout(),
            self.adapters.completer.complete(request),
        )
        .await?;
        if candidates.len() > 1 {
            warn!("Got {} candidates, using only the first", candidates.len());
        }
        let text = candidates.into_iter().next().unwrap_or_default();
        debug!("Got assistant response: {}", shorten(&text));
        Ok(text)
    }

    async fn synthesize(&self, text: &str) -> Result<AudioFrame, TurnError> {
        debug!("Synthesizing to speech: {}", shorten(text));
        let audio = within(
            "synthesis",
            self.timeouts.synthesize_timeout(),
            self.adapters.synthesizer.synthesize(text, &self.voice),
        )
        .await?;
        debug!("Speech synthesized: {:.3}s", audio.seconds());
        Ok(audio)
    }
}

async fn within<T>(
    operation: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<T, AdapterError>>,
) -> Result<T, AdapterError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(AdapterError::Timeout {
            operation,
            timeout: limit,
        }),
    }
}

fn shorten(text: &str) -> String {
    const WIDTH: usize = 64;
    if text.chars().count() <= WIDTH {
        return text.to_string();
    }
    let mut short: String = text.chars().take(WIDTH - 3).collect();
    short.push_str("...");
    short
}
