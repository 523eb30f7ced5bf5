use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::activity::ActivityType;
use super::message::{Message, Role};
use crate::error::TranscriptError;

/// Ordered conversation history for one call
///
/// Append-only. User and assistant messages strictly alternate, starting with
/// the user; system messages live in the activity prompt instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub activity: ActivityType,
    /// BCP-47 language code of the conversation
    pub language: String,
    messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub version: String,
}

impl Transcript {
    pub fn new(activity: ActivityType, language: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            activity,
            language: language.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Role the next appended message must have
    pub fn expected_role(&self) -> Role {
        match self.messages.last() {
            Some(msg) if msg.role == Role::Usr => Role::Ast,
            _ => Role::Usr,
        }
    }

    /// Append a message, enforcing user/assistant alternation
    pub fn push(&mut self, msg: Message) -> Result<&Message, TranscriptError> {
        if msg.role == Role::Sys {
            return Err(TranscriptError::SystemMessage);
        }
        let expected = self.expected_role();
        if msg.role != expected {
            return Err(TranscriptError::OutOfOrder {
                expected,
                got: msg.role,
            });
        }
        trace!(tid = %self.id, role = %msg.role, "Adding message to transcript");
        self.messages.push(msg);
        Ok(&self.messages[self.messages.len() - 1])
    }

    /// The latest message with the given role
    pub fn latest(&self, role: Role) -> Option<&Message> {
        self.messages.iter().rev().find(|msg| msg.role == role)
    }

    /// Completed user/assistant exchanges
    pub fn turns(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::Ast).count()
    }
}
