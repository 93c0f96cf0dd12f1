//! Generation provider abstraction
//!
//! Every agent writes its section through a single [`LLMProvider`]. Two
//! wire formats are supported: the OpenAI-compatible chat completions API
//! (OpenRouter and OpenAI) and the Ollama chat API for local models.
//!
//! Providers make exactly one request per call. Nothing here retries.

use async_trait::async_trait;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::{LLMConfig, ProviderKind};
use crate::secrets::{scrub_secrets, SecretCache};

pub mod ollama;
pub mod openai;

pub use ollama::OllamaProvider;
pub use openai::OpenAICompatProvider;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for EngineError {
    fn from(e: LLMError) -> Self {
        EngineError::GenerationFailed(scrub_secrets(&e.to_string()))
    }
}

/// Longest provider error body kept in an error message
pub(crate) const ERROR_BODY_CHARS: usize = 200;

/// First [`ERROR_BODY_CHARS`] characters of an error response body
pub(crate) fn body_excerpt(body: &str) -> String {
    body.trim().chars().take(ERROR_BODY_CHARS).collect()
}

/// Map a reqwest transport error onto the LLM error taxonomy
pub(crate) fn map_transport_error(e: reqwest::Error, base_url: &str) -> LLMError {
    if e.is_timeout() {
        LLMError::Timeout
    } else if e.is_connect() {
        LLMError::ProviderUnavailable(format!("Cannot connect to {}", base_url))
    } else {
        LLMError::NetworkError(e.to_string())
    }
}

/// Message in a prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Text produced by one generation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,

    /// Model that actually served the request, when the provider reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Completion {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: None,
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "openrouter", "ollama")
    fn name(&self) -> &str;

    /// Model identifier requests are sent with
    fn model(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama)
    fn is_local(&self) -> bool;

    /// Generate one completion for the given prompt.
    ///
    /// An empty completion is returned as-is; callers decide whether that
    /// counts as a failure.
    async fn generate(&self, messages: &[Message]) -> Result<Completion>;

    /// Check if the provider is currently reachable and authorized.
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Build the configured provider.
///
/// # Errors
/// Returns `EngineError::Config` when the provider's credential is missing.
pub fn build_provider(
    config: &LLMConfig,
    secrets: &SecretCache,
) -> std::result::Result<Arc<dyn LLMProvider>, EngineError> {
    let base_url = config.effective_base_url();

    let provider: Arc<dyn LLMProvider> = match config.provider {
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(
            base_url,
            config.model.clone(),
            config.temperature,
            config.timeout(),
        )?),
        kind @ (ProviderKind::OpenRouter | ProviderKind::OpenAI) => {
            let key_name = kind.api_key_name().unwrap_or("OPENAI_API_KEY");
            let api_key = secrets.get_secret(key_name)?;
            Arc::new(OpenAICompatProvider::new(
                kind.as_str(),
                base_url,
                config.model.clone(),
                api_key,
                config.temperature,
                config.timeout(),
            )?)
        }
    };

    tracing::debug!(
        "Using generation provider {} with model {}",
        provider.name(),
        provider.model()
    );

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::StaticSource;

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(user_msg.content, "Hello");

        let system_msg = Message::system("You are a professor");
        assert_eq!(system_msg.role, MessageRole::System);
        assert_eq!(Message::assistant("ok").role.to_string(), "assistant");
    }

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_string(&Message::system("x")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"x"}"#);
    }

    #[test]
    fn test_llm_error_becomes_generation_failed() {
        let err: EngineError = LLMError::AuthenticationFailed(
            "bad key sk-or-v1-1234567890abcdefghijklmnop".to_string(),
        )
        .into();

        match err {
            EngineError::GenerationFailed(msg) => {
                assert!(msg.contains("Authentication failed"));
                assert!(!msg.contains("sk-or-v1"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_build_provider_requires_key() {
        let secrets = SecretCache::new(vec![Box::new(StaticSource::new())]);
        let err = build_provider(&LLMConfig::default(), &secrets).err().unwrap();
        assert!(matches!(err, EngineError::Config(msg) if msg.contains("OPENROUTER_API_KEY")));
    }

    #[test]
    fn test_build_provider_ollama_needs_no_key() {
        let secrets = SecretCache::new(vec![Box::new(StaticSource::new())]);
        let config = LLMConfig {
            provider: ProviderKind::Ollama,
            model: "llama3.1:8b".to_string(),
            ..LLMConfig::default()
        };

        let provider = build_provider(&config, &secrets).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert!(provider.is_local());
    }
}
