use serde::{Deserialize, Serialize};

use crate::conversation::{Activity, Character, Voice};

/// Per-call parameters, fixed for the lifetime of the call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "call-5f0c…")
    pub session_id: String,

    /// BCP-47 code of the language the user practices
    pub language: String,

    /// Who the user talks to, including the synthesis voice
    pub character: Character,

    /// Scripted content priming the character
    #[serde(default)]
    pub activity: Activity,

    /// Opaque end-user id forwarded to the completion service
    #[serde(default)]
    pub user_id: Option<String>,
}

impl SessionConfig {
    /// Defaults for a language, with a voice named after it
    pub fn for_language(language: impl Into<String>) -> Self {
        let language = language.into();
        let voice = Voice::new(format!("{}-Standard-C", language), language.clone());
        Self {
            session_id: format!("call-{}", uuid::Uuid::new_v4()),
            language,
            character: Character::new(voice),
            activity: Activity::default(),
            user_id: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::for_language("en-US")
    }
}
