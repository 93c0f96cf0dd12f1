//! OpenAI-compatible chat completions provider
//!
//! Serves both OpenRouter and OpenAI; they share the `/chat/completions`
//! request and response shape. OpenRouter additionally receives the
//! `HTTP-Referer` and `X-Title` attribution headers.

use super::{body_excerpt, map_transport_error, Completion, LLMError, LLMProvider, Message};
use crate::secrets::SecretString;
use async_trait::async_trait;
use sdk::errors::EngineError;
use serde_json::json;
use std::time::Duration;

pub struct OpenAICompatProvider {
    name: String,
    base_url: String,
    model: String,
    api_key: SecretString,
    temperature: f64,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: SecretString,
        temperature: f64,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            temperature,
            client,
        })
    }

    fn is_openrouter(&self) -> bool {
        self.name == "openrouter"
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/models", self.base_url);
        match self
            .client
            .get(&url)
            .bearer_auth(self.api_key.unsecure())
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("{} health check failed: {}", self.name, e);
                false
            }
        }
    }

    async fn generate(&self, messages: &[Message]) -> super::Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);

        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        let payload = json!({
            "model": self.model,
            "messages": api_messages,
            "temperature": self.temperature,
        });

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.unsecure())
            .header("Content-Type", "application/json");

        if self.is_openrouter() {
            request = request
                .header("HTTP-Referer", "https://github.com/syllabus-dev/syllabus")
                .header("X-Title", "Syllabus");
        }

        let start = std::time::Instant::now();
        let response = request
            .json(&payload)
            .send()
            .await
            .map_err(|e| map_transport_error(e, &self.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = body_excerpt(&response.text().await.unwrap_or_default());

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed(text),
                429 => LLMError::RateLimitExceeded,
                _ => LLMError::InvalidRequest(format!("{}: {}", status, text)),
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        tracing::debug!(
            "{} response received in {:.1}s",
            self.name,
            start.elapsed().as_secs_f64()
        );

        if let Some(error) = data.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown provider error");
            return Err(LLMError::InvalidRequest(message.to_string()));
        }

        let choice = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

        let content = choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default();

        Ok(Completion {
            content: content.to_string(),
            model: data
                .get("model")
                .and_then(|m| m.as_str())
                .map(|m| m.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = OpenAICompatProvider::new(
            "openrouter",
            "https://openrouter.ai/api/v1/",
            "google/gemini-2.0-flash-exp:free",
            SecretString::new("sk-test"),
            0.7,
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(provider.base_url, "https://openrouter.ai/api/v1");
        assert!(provider.is_openrouter());
        assert!(!provider.is_local());
        assert_eq!(provider.model(), "google/gemini-2.0-flash-exp:free");
    }
}
