//! Credential lookup and secret scrubbing
//!
//! Credentials (`OPENROUTER_API_KEY`, `OPENAI_API_KEY`, `COMPOSIO_API_KEY`,
//! `SERPAPI_API_KEY`) are resolved through a chain of [`SecretSource`]s:
//! the process environment first (including values loaded from `.env`),
//! then the OS keychain under the `syllabus` service.
//!
//! Nothing in this module prompts. A run that needs a credential which no
//! source provides fails with a configuration error before any agent starts.

pub mod cache;
pub mod string;

pub use cache::SecretCache;
pub use string::SecretString;

use keyring::Entry;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Keychain service name used for stored credentials
pub const KEYRING_SERVICE: &str = "syllabus";

/// Every credential Syllabus knows how to use
pub const KNOWN_CREDENTIALS: [&str; 4] = [
    "OPENROUTER_API_KEY",
    "OPENAI_API_KEY",
    "COMPOSIO_API_KEY",
    "SERPAPI_API_KEY",
];

/// A place credentials can be read from
pub trait SecretSource: Send + Sync {
    /// Short label used in diagnostics ("env", "keychain")
    fn label(&self) -> &str;

    /// Look up a credential. Empty values count as missing.
    fn get(&self, key: &str) -> Option<SecretString>;
}

/// Reads credentials from the process environment
#[derive(Debug, Default)]
pub struct EnvSource;

impl SecretSource for EnvSource {
    fn label(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<SecretString> {
        std::env::var(key)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(SecretString::new)
    }
}

/// Reads credentials from the OS keychain.
///
/// Secrets are stored in:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service (libsecret)
pub struct KeyringSource {
    service_name: String,
}

impl KeyringSource {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

impl SecretSource for KeyringSource {
    fn label(&self) -> &str {
        "keychain"
    }

    fn get(&self, key: &str) -> Option<SecretString> {
        let entry = match Entry::new(&self.service_name, key) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Keychain unavailable for '{}': {}", key, e);
                return None;
            }
        };

        match entry.get_password() {
            Ok(secret) if !secret.trim().is_empty() => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Some(SecretString::new(secret.trim()))
            }
            Ok(_) | Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                tracing::debug!("Failed to read '{}' from keychain: {}", key, e);
                None
            }
        }
    }
}

/// Fixed in-memory credentials, for tests and embedding callers
#[derive(Default)]
pub struct StaticSource {
    values: HashMap<String, SecretString>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), SecretString::new(value));
        self
    }
}

impl SecretSource for StaticSource {
    fn label(&self) -> &str {
        "static"
    }

    fn get(&self, key: &str) -> Option<SecretString> {
        self.values
            .get(key)
            .filter(|v| !v.unsecure().trim().is_empty())
            .cloned()
    }
}

/// Regex patterns for detecting common secret formats.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Patterns match:
/// - OpenAI / OpenRouter API keys: sk-..., sk-or-v1-...
/// - Composio API keys: ak_...
/// - Bearer tokens
/// - `api_key=` and `x-api-key:` values (SerpAPI query strings, headers)
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        [
            r"sk-[a-zA-Z0-9\-_]{20,}",
            r"\bak_[a-zA-Z0-9\-_]{16,}",
            r"Bearer\s+[^\s]{20,}",
            r"(?i)(api_key=)[^&\s]+",
            r"(?i)(x-api-key:\s*)[^\s]+",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Scrubs secrets from text by replacing them with [REDACTED].
///
/// Used on every error record and log line that may carry a provider
/// response or request URL.
///
/// # Examples
/// ```
/// use syllabus_engine::secrets::scrub_secrets;
///
/// let scrubbed = scrub_secrets("My API key is sk-1234567890abcdefghij");
/// assert_eq!(scrubbed, "My API key is [REDACTED]");
/// ```
pub fn scrub_secrets(text: &str) -> String {
    let mut result = text.to_string();

    for pattern in get_secret_patterns() {
        result = pattern
            .replace_all(&result, |caps: &regex::Captures<'_>| match caps.get(1) {
                Some(prefix) => format!("{}[REDACTED]", prefix.as_str()),
                None => "[REDACTED]".to_string(),
            })
            .to_string();
    }

    result
}
