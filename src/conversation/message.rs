use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Activity prompt (never user-facing)
    Sys,
    /// The remote user
    Usr,
    /// The character
    Ast,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Sys => "sys",
            Role::Usr => "usr",
            Role::Ast => "ast",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage reference for the audio that goes with a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRef {
    pub path: String,
}

/// One turn's textual content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Crate version that produced the message
    pub version: String,
}

impl Message {
    pub fn new(role: Role, body: impl Into<String>) -> Self {
        Self {
            role,
            body: body.into(),
            audio: None,
            translation: None,
            created_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn system(body: impl Into<String>) -> Self {
        Self::new(Role::Sys, body)
    }

    pub fn user(body: impl Into<String>) -> Self {
        Self::new(Role::Usr, body)
    }

    pub fn assistant(body: impl Into<String>) -> Self {
        Self::new(Role::Ast, body)
    }

    pub fn with_audio(mut self, audio: AudioRef) -> Self {
        self.audio = Some(audio);
        self
    }
}
