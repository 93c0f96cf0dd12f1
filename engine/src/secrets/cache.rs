use crate::secrets::string::SecretString;
use crate::secrets::{EnvSource, KeyringSource, SecretSource, KEYRING_SERVICE};
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Resolves credentials through an ordered chain of sources and memoizes hits.
///
/// The first source that has a non-empty value wins. Misses are not cached,
/// so a key exported after startup is still found.
#[derive(Clone)]
pub struct SecretCache {
    sources: Arc<Vec<Box<dyn SecretSource>>>,
    cache: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl SecretCache {
    /// Creates a cache over the given sources, consulted in order
    pub fn new(sources: Vec<Box<dyn SecretSource>>) -> Self {
        Self {
            sources: Arc::new(sources),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Environment first, then the `syllabus` keychain service
    pub fn from_env_and_keyring() -> Self {
        Self::new(vec![
            Box::new(EnvSource),
            Box::new(KeyringSource::new(KEYRING_SERVICE)),
        ])
    }

    /// Look up a credential without failing
    pub fn lookup(&self, key: &str) -> Option<SecretString> {
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(secret) = cache.get(key) {
                return Some(secret.clone());
            }
        }

        let (label, secret) = self
            .sources
            .iter()
            .find_map(|source| source.get(key).map(|s| (source.label().to_string(), s)))?;

        tracing::debug!("Resolved credential '{}' from {}", key, label);

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(key.to_string(), secret.clone());

        Some(secret)
    }

    /// Retrieves a required credential.
    ///
    /// # Errors
    /// Returns `EngineError::Config` naming the missing key.
    pub fn get_secret(&self, key: &str) -> Result<SecretString, EngineError> {
        self.lookup(key).ok_or_else(|| {
            EngineError::Config(format!(
                "Missing credential {}. Export it or store it in the '{}' keychain service",
                key, KEYRING_SERVICE
            ))
        })
    }

    pub fn has_secret(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::StaticSource;

    #[test]
    fn test_first_source_wins() {
        let cache = SecretCache::new(vec![
            Box::new(StaticSource::new().with("OPENAI_API_KEY", "first")),
            Box::new(StaticSource::new().with("OPENAI_API_KEY", "second")),
        ]);

        assert_eq!(cache.get_secret("OPENAI_API_KEY").unwrap().unsecure(), "first");
    }

    #[test]
    fn test_falls_through_to_later_source() {
        let cache = SecretCache::new(vec![
            Box::new(StaticSource::new()),
            Box::new(StaticSource::new().with("SERPAPI_API_KEY", "serp")),
        ]);

        assert!(cache.has_secret("SERPAPI_API_KEY"));
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let cache = SecretCache::new(vec![Box::new(StaticSource::new())]);

        let err = cache.get_secret("COMPOSIO_API_KEY").unwrap_err();
        assert!(matches!(err, EngineError::Config(msg) if msg.contains("COMPOSIO_API_KEY")));
        assert!(!cache.has_secret("COMPOSIO_API_KEY"));
    }
}
