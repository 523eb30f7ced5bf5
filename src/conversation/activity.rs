// Activities select the scripted content that primes the character.
//
// Each variant renders a static system-message prefix; the turn engine only
// ever asks for that prefix and never branches on the variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::message::Message;

const DEFAULT_CHARACTER_PROMPT: &str =
    "You are a friendly conversation partner. Keep every reply to one or two short sentences.";

/// Activity families a call can be started with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    /// Talk about anything, user-driven
    Unstructured,
    /// Scripted scenario with goals and vocabulary
    Lesson,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityType::Unstructured => f.write_str("unstructured"),
            ActivityType::Lesson => f.write_str("lesson"),
        }
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unstructured" => Ok(ActivityType::Unstructured),
            "lesson" => Ok(ActivityType::Lesson),
            other => Err(format!(
                "Invalid activity type: '{}', must be one of [unstructured, lesson]",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub body: String,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub title: String,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
}

/// Lesson content, already in the user's language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonPlan {
    pub title: String,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub vocabulary: Vec<String>,
    pub user_prompt: String,
    pub character_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Activity {
    Unstructured { character_prompt: String },
    Lesson(LessonPlan),
}

impl Default for Activity {
    fn default() -> Self {
        Activity::Unstructured {
            character_prompt: DEFAULT_CHARACTER_PROMPT.to_string(),
        }
    }
}

impl Activity {
    pub fn kind(&self) -> ActivityType {
        match self {
            Activity::Unstructured { .. } => ActivityType::Unstructured,
            Activity::Lesson(_) => ActivityType::Lesson,
        }
    }

    /// System messages that prefix every completion request
    pub fn base_prompt(&self) -> Vec<Message> {
        let msgs = match self {
            Activity::Unstructured { character_prompt } => {
                vec![Message::system(character_prompt.clone())]
            }
            Activity::Lesson(plan) => {
                let mut msgs = Vec::with_capacity(plan.goals.len() + 3);
                for (i, goal) in plan.goals.iter().enumerate() {
                    let goal_json =
                        serde_json::to_string(goal).unwrap_or_else(|_| goal.title.clone());
                    msgs.push(Message::system(format!("goal {}: {}", i, goal_json)));
                }
                let vocab = serde_json::to_string(&plan.vocabulary).unwrap_or_default();
                msgs.push(Message::system(format!("vocabulary: {}", vocab)));
                msgs.push(Message::system(plan.user_prompt.clone()));
                msgs.push(Message::system(plan.character_prompt.clone()));
                msgs
            }
        };
        debug!("{} prompt has {} system messages", self.kind(), msgs.len());
        msgs
    }
}
