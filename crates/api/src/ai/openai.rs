//! Driver for OpenAI-compatible `/v1/chat/completions` endpoints.

use std::time::Duration;

use empathy_core::conversation::ChatMessage;
use serde_json::json;

use super::{AiConfig, AiError, AiProvider};

/// Longest provider error body kept for logs.
const ERROR_BODY_MAX: usize = 512;

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    config: AiConfig,
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("config", &self.config)
            .finish()
    }
}

impl OpenAiCompatibleClient {
    pub fn new(config: AiConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait::async_trait]
impl AiProvider for OpenAiCompatibleClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, AiError> {
        let api_key = self.config.api_key.as_deref().ok_or(AiError::NotConfigured)?;

        let body = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": 0.2,
        });

        let resp = self
            .http
            .post(completions_url(&self.config.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_MAX).collect(),
            });
        }

        let payload: serde_json::Value = resp.json().await?;
        let reply = extract_reply(&payload)?;
        tracing::debug!(model = %self.config.model, reply_len = reply.len(), "AI provider replied");
        Ok(reply)
    }
}

pub fn completions_url(base_url: &str) -> String {
    format!("{}/v1/chat/completions", base_url.trim_end_matches('/'))
}

/// Read `choices[0].message.content` from a completion payload.
pub fn extract_reply(payload: &serde_json::Value) -> Result<String, AiError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AiError::MalformedResponse("missing choices[0].message.content".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn url_joins_without_double_slash() {
        assert_eq!(
            completions_url("https://api.example.test/"),
            "https://api.example.test/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://localhost:11434"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn reply_is_read_from_first_choice() {
        let payload = json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello there"}}]
        });
        assert_eq!(extract_reply(&payload).unwrap(), "Hello there");
    }

    #[test]
    fn missing_content_is_malformed() {
        assert_matches!(
            extract_reply(&json!({"choices": []})),
            Err(AiError::MalformedResponse(_))
        );
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = OpenAiCompatibleClient::new(AiConfig::default()).unwrap();
        let result = client
            .chat(&[ChatMessage::new("user", "hi")])
            .await;
        assert_matches!(result, Err(AiError::NotConfigured));
    }
}
