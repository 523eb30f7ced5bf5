// Helpers for plain text-completion models
//
// Chat models take the message list directly. Text-completion models get a
// flattened prompt where the user speaks as "1:" and the character as "2:",
// which is why the engine passes "1:" as a stop sequence.

use tracing::{trace, warn};

use crate::conversation::{Message, Role};

pub const USER_TAG: &str = "1:";
pub const ASSISTANT_TAG: &str = "2:";

/// Flatten messages into a text-completion prompt ending with the assistant tag
pub fn completion_prompt(messages: &[Message]) -> String {
    let mut lines = Vec::with_capacity(messages.len() + 1);
    let mut sys_done = false;
    for msg in messages {
        match msg.role {
            Role::Sys => {
                if sys_done {
                    warn!("System message out of place: {}", msg.body);
                }
                lines.push(msg.body.clone());
            }
            Role::Usr => {
                sys_done = true;
                lines.push(format!("{} {}", USER_TAG, msg.body));
            }
            Role::Ast => {
                sys_done = true;
                lines.push(format!("{} {}", ASSISTANT_TAG, msg.body));
            }
        }
    }
    lines.push(ASSISTANT_TAG.to_string());
    lines.join("\n")
}

/// Strip the speaker formatting a completion model likes to add
///
/// Keeps only the first `N:`-prefixed line's text; returns the input unchanged
/// when no such line exists.
pub fn clean_completion(text: &str) -> String {
    let line_starts = std::iter::once(0).chain(text.match_indices('\n').map(|(i, _)| i + 1));
    for start in line_starts {
        if let Some(body) = tagged_body(&text[start..]) {
            trace!("Completion tag matched: {}", body);
            return body.to_string();
        }
    }
    trace!("No completion tag matched");
    text.to_string()
}

fn tagged_body(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || line.as_bytes().get(digits) != Some(&b':') {
        return None;
    }
    let rest = line[digits + 1..].trim_start_matches([' ', '\n', '\t']);
    let end = rest.find(['\n', '\t']).unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some(&rest[..end])
}
