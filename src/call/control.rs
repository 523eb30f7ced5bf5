// Control channel protocol
//
// Every message is "<kind> <payload>" with kind one of status, info, error,
// transcript. Delivery is best effort: a message sent before the channel is
// attached is logged and dropped, and the peer never sees internal error text.

use anyhow::{anyhow, bail, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, trace, warn};

use super::phase::ResetReason;
use crate::conversation::{Message, Role};
use crate::error::ChannelClosed;

/// Low-latency side channel to the remote peer, provided by the transport
pub trait ControlChannel: Send + Sync {
    /// Fire-and-forget send; fails only once the channel is closed
    fn send(&self, msg: String) -> Result<(), ChannelClosed>;

    fn label(&self) -> &str {
        "control"
    }
}

/// Control channel backed by an unbounded mpsc sender
pub struct MpscControlChannel {
    label: String,
    tx: mpsc::UnboundedSender<String>,
}

impl MpscControlChannel {
    pub fn new(label: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                label: label.into(),
                tx,
            },
            rx,
        )
    }
}

impl ControlChannel for MpscControlChannel {
    fn send(&self, msg: String) -> Result<(), ChannelClosed> {
        self.tx.send(msg).map_err(|_| ChannelClosed)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Status notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Handshake complete
    Start,
    /// Engine ready
    Hello,
    LoopStart,
    Listening,
    Transcribing,
    Thinking,
    Speaking,
    /// Loop cap hit
    MaxLen,
    /// Graceful reset
    Bye,
    /// Stopped externally
    Stop,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Start => "start",
            Status::Hello => "hello",
            Status::LoopStart => "loopstart",
            Status::Listening => "listening",
            Status::Transcribing => "transcribing",
            Status::Thinking => "thinking",
            Status::Speaking => "speaking",
            Status::MaxLen => "maxlen",
            Status::Bye => "bye",
            Status::Stop => "stop",
        }
    }
}

/// User-facing error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerError {
    UttTooLong,
    Internal,
    Reset(ResetReason),
}

impl PeerError {
    pub fn code(&self) -> &'static str {
        match self {
            PeerError::UttTooLong => "utttoolong",
            PeerError::Internal => "internal",
            PeerError::Reset(reason) => reason.code(),
        }
    }
}

/// Formats and sends protocol messages over the attached control channel
#[derive(Clone)]
pub struct Notifier {
    channel: Arc<watch::Sender<Option<Arc<dyn ControlChannel>>>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            channel: Arc::new(tx),
        }
    }

    /// Attach the channel; a call has exactly one
    pub fn attach(&self, channel: Arc<dyn ControlChannel>) -> Result<()> {
        let label = channel.label().to_string();
        let mut channel = Some(channel);
        let attached = self.channel.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = channel.take();
            true
        });
        if !attached {
            bail!("Control channel already set");
        }
        debug!("Control channel connected: {}", label);
        Ok(())
    }

    /// Wait until a channel is attached
    pub async fn wait_connected(&self, limit: Duration) -> Result<()> {
        let mut rx = self.channel.subscribe();
        let connected = match tokio::time::timeout(limit, rx.wait_for(|slot| slot.is_some())).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(anyhow!("Control channel slot dropped")),
            Err(_) => Err(anyhow!("Control channel not connected within {:?}", limit)),
        };
        connected
    }

    /// Send a raw protocol message with best effort
    pub fn send(&self, msg: String) -> Result<(), ChannelClosed> {
        let channel = self.channel.borrow().clone();
        match channel {
            Some(channel) => {
                trace!("sending: {}", msg);
                channel.send(msg)
            }
            None => {
                warn!("Tried to send before control channel connected, discarding: {}", msg);
                Ok(())
            }
        }
    }

    pub fn status(&self, status: Status) -> Result<(), ChannelClosed> {
        self.send(format!("status {}", status.as_str()))
    }

    /// `var` must not contain spaces
    pub fn info(&self, var: &str, val: &str) -> Result<(), ChannelClosed> {
        debug_assert!(!var.contains(' '), "info var cannot contain spaces");
        self.send(format!("info {} {}", var, val))
    }

    pub fn error(&self, err: PeerError) -> Result<(), ChannelClosed> {
        error!("Sending error to user: {}", err.code());
        self.send(format!("error {}", err.code()))
    }

    /// Send a finalized message to the peer; system messages are never user-facing
    pub fn transcript(&self, msg: &Message) -> Result<(), ChannelClosed> {
        if msg.role == Role::Sys {
            warn!("Refusing to send system message as transcript");
            return Ok(());
        }
        self.send(format!("transcript {} {}", msg.role, msg.body))
    }
}
