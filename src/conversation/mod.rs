//! Conversation model
//!
//! - `Message` / `Role`: one immutable turn of text
//! - `Transcript`: the append-only, alternating history of a call
//! - `Activity`: the scripted content that renders the system prompt
//! - `Character` / `Voice`: who the user is talking to

mod activity;
mod character;
mod message;
mod transcript;

pub use activity::{Activity, ActivityType, Criterion, Goal, LessonPlan};
pub use character::{Character, Voice};
pub use message::{AudioRef, Message, Role};
pub use transcript::Transcript;
