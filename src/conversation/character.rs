use serde::{Deserialize, Serialize};

/// Synthesis voice selected for a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Vendor voice name, e.g. "en-US-Standard-C"
    pub name: String,
    /// BCP-47 language code, e.g. "en-US"
    pub language_code: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language_code: language_code.into(),
        }
    }

    /// Primary language subtag ("en" for "en-US")
    pub fn language(&self) -> &str {
        self.language_code
            .split('-')
            .next()
            .unwrap_or(&self.language_code)
    }
}

/// The persona the user talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub voice: Voice,
}

impl Character {
    /// Character with the default name for the voice's language
    pub fn new(voice: Voice) -> Self {
        let name = name_for_language(voice.language()).to_string();
        Self { name, voice }
    }
}

fn name_for_language(language: &str) -> &'static str {
    match language {
        "en" => "Courtney",
        "es" => "Carmen",
        "fr" => "Céline",
        "de" => "Carolin",
        "it" => "Chiara",
        "ja" => "千尋",
        "ko" => "채원",
        "zh" => "小梅",
        _ => "Moshi",
    }
}
