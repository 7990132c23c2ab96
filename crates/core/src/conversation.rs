//! Conversation and message rules.

use serde::{Deserialize, Serialize};

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";
pub const ROLE_SYSTEM: &str = "system";

pub const DEFAULT_TITLE: &str = "New conversation";
pub const TITLE_MAX: usize = 200;
pub const CONTENT_MAX: usize = 8000;

/// Number of most recent messages sent to the model as context.
pub const CONTEXT_WINDOW: usize = 20;

pub const SYSTEM_PROMPT: &str = "You are a supportive, empathetic assistant working alongside a \
licensed therapist. Listen carefully, reflect feelings back, and encourage healthy coping \
strategies. Do not diagnose or prescribe. If the user mentions self-harm or danger to others, \
urge them to contact local emergency services or a crisis line immediately.";

/// One turn in a chat exchange with a language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Trim the requested title, falling back to [`DEFAULT_TITLE`] when absent
/// or blank.
pub fn normalize_title(title: Option<&str>) -> Result<String, String> {
    let trimmed = title.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Ok(DEFAULT_TITLE.to_string());
    }
    if trimmed.chars().count() > TITLE_MAX {
        return Err(format!("title must be at most {TITLE_MAX} characters"));
    }
    Ok(trimmed.to_string())
}

/// Message bodies must be non-blank and at most [`CONTENT_MAX`] characters.
pub fn validate_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("content must not be blank".to_string());
    }
    if content.chars().count() > CONTENT_MAX {
        return Err(format!("content must be at most {CONTENT_MAX} characters"));
    }
    Ok(())
}

/// Build the model prompt: the system prompt followed by the last
/// [`CONTEXT_WINDOW`] messages of `history` (oldest first).
pub fn build_prompt(history: &[ChatMessage]) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(CONTEXT_WINDOW);
    let mut prompt = Vec::with_capacity(history.len() - start + 1);
    prompt.push(ChatMessage::new(ROLE_SYSTEM, SYSTEM_PROMPT));
    prompt.extend(
        history[start..]
            .iter()
            .filter(|m| m.role != ROLE_SYSTEM)
            .cloned(),
    );
    prompt
}
