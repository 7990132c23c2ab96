//! Language-model provider seam.
//!
//! Handlers talk to [`AiProvider`]; production wires in
//! [`openai::OpenAiCompatibleClient`], tests substitute a scripted provider.

pub mod openai;

use empathy_core::conversation::ChatMessage;

use crate::config::env_parse;
use crate::error::AppError;

/// Connection settings for an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct AiConfig {
    pub base_url: String,
    /// When absent every provider call fails with [`AiError::NotConfigured`].
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
        }
    }
}

impl AiConfig {
    /// | Env Var           | Default                  |
    /// |-------------------|--------------------------|
    /// | `AI_BASE_URL`     | `https://api.openai.com` |
    /// | `AI_API_KEY`      | unset                    |
    /// | `AI_MODEL`        | `gpt-4o-mini`            |
    /// | `AI_TIMEOUT_SECS` | `60`                     |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("AI_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("AI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: std::env::var("AI_MODEL").unwrap_or(defaults.model),
            timeout_secs: env_parse("AI_TIMEOUT_SECS", defaults.timeout_secs),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI provider is not configured (AI_API_KEY is unset)")]
    NotConfigured,

    #[error("AI provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("AI provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("AI provider returned an unexpected payload: {0}")]
    MalformedResponse(String),
}

impl From<AiError> for AppError {
    fn from(err: AiError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

/// A chat-completion capable model.
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    /// Send `messages` and return the assistant's reply text.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, AiError>;
}
