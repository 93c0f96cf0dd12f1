//! Configuration management
//!
//! This module handles loading, validation, and management of the Syllabus
//! configuration. Configuration is stored in TOML format at
//! ~/.syllabus/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level and report output directory
//! - **llm**: Generation provider, model and per-call timeout
//! - **search**: Web search provider and result limits
//! - **publish**: Document publishing endpoint (Composio MCP)
//! - **agents**: Agent prompt settings (optional)
//!
//! Credentials are never stored here. They are resolved through
//! [`crate::secrets`] from the environment or the OS keychain.
//!
//! # Examples
//!
//! ```no_run
//! use syllabus_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Model: {}", config.llm.model);
//! println!("Search provider: {}", config.search.provider);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Generation provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Web search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Document publishing configuration
    #[serde(default)]
    pub publish: PublishConfig,

    /// Agent prompt settings
    #[serde(default)]
    pub agents: AgentsConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory where `run --output` reports are written (supports ~ expansion)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Generation provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider kind (openrouter, openai, ollama)
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model identifier passed to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Overrides the provider's default API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Per-call timeout for generation requests (seconds)
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

/// Supported generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenRouter (OpenAI-compatible API)
    #[default]
    OpenRouter,
    /// OpenAI
    OpenAI,
    /// Local Ollama server
    Ollama,
}

impl ProviderKind {
    /// Default API base URL for this provider
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::OpenAI => "https://api.openai.com/v1",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }

    /// Name of the credential this provider needs, if any
    pub fn api_key_name(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenRouter => Some("OPENROUTER_API_KEY"),
            ProviderKind::OpenAI => Some("OPENAI_API_KEY"),
            ProviderKind::Ollama => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::OpenAI => "openai",
            ProviderKind::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "openai" => Ok(ProviderKind::OpenAI),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(EngineError::Config(format!(
                "Invalid llm provider '{}'. Must be one of: openrouter, openai, ollama",
                other
            ))),
        }
    }
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search provider (duckduckgo, serpapi)
    #[serde(default)]
    pub provider: SearchProviderKind,

    /// Maximum number of results handed to an agent
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Per-call timeout for search requests (seconds)
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Base URL for the DuckDuckGo Instant Answer API
    #[serde(default = "default_duckduckgo_base_url")]
    pub duckduckgo_base_url: String,

    /// Base URL for SerpAPI
    #[serde(default = "default_serpapi_base_url")]
    pub serpapi_base_url: String,
    // Note: SerpAPI key is resolved as a secret, not stored in config
}

/// Supported search providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    /// DuckDuckGo (free, no API key)
    #[default]
    DuckDuckGo,
    /// SerpAPI (requires SERPAPI_API_KEY)
    SerpApi,
}

impl SearchProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchProviderKind::DuckDuckGo => "duckduckgo",
            SearchProviderKind::SerpApi => "serpapi",
        }
    }
}

impl fmt::Display for SearchProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchProviderKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "duckduckgo" | "ddg" => Ok(SearchProviderKind::DuckDuckGo),
            "serpapi" => Ok(SearchProviderKind::SerpApi),
            other => Err(EngineError::Config(format!(
                "Invalid search provider '{}'. Must be one of: duckduckgo, serpapi",
                other
            ))),
        }
    }
}

/// Document publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Publish each section as a Google Doc
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Composio backend base URL
    #[serde(default = "default_publish_base_url")]
    pub base_url: String,

    /// Composio MCP config id (required when publishing is enabled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_config_id: Option<String>,

    /// Composio user id
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// MCP tool that creates a document from markdown
    #[serde(default = "default_publish_tool")]
    pub tool: String,

    /// Per-call timeout for publish requests (seconds)
    #[serde(default = "default_publish_timeout")]
    pub timeout_secs: u64,
    // Note: Composio API key is resolved as a secret, not stored in config
}

/// Agent prompt settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Maximum characters of an earlier section quoted into a later prompt
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
}

/// Per-run overrides supplied by the caller (CLI flags)
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub model: Option<String>,
    pub search_provider: Option<SearchProviderKind>,
    pub timeout_secs: Option<u64>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("~/.syllabus/sessions")
}

fn default_model() -> String {
    "google/gemini-2.0-flash-exp:free".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_results() -> usize {
    5
}

fn default_search_timeout() -> u64 {
    20
}

fn default_duckduckgo_base_url() -> String {
    "https://api.duckduckgo.com".to_string()
}

fn default_serpapi_base_url() -> String {
    "https://serpapi.com".to_string()
}

fn default_publish_base_url() -> String {
    "https://backend.composio.dev".to_string()
}

fn default_user_id() -> String {
    "default".to_string()
}

fn default_publish_tool() -> String {
    "GOOGLEDOCS_CREATE_DOCUMENT_MARKDOWN".to_string()
}

fn default_publish_timeout() -> u64 {
    60
}

fn default_context_chars() -> usize {
    2000
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: default_model(),
            base_url: None,
            timeout_secs: default_llm_timeout(),
            temperature: default_temperature(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProviderKind::default(),
            max_results: default_max_results(),
            timeout_secs: default_search_timeout(),
            duckduckgo_base_url: default_duckduckgo_base_url(),
            serpapi_base_url: default_serpapi_base_url(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_publish_base_url(),
            mcp_config_id: None,
            user_id: default_user_id(),
            tool: default_publish_tool(),
            timeout_secs: default_publish_timeout(),
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            context_chars: default_context_chars(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            publish: PublishConfig::default(),
            agents: AgentsConfig::default(),
        }
    }
}

impl LLMConfig {
    /// Base URL actually used for requests
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PublishConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from the default location (~/.syllabus/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = config;
        config.validate_and_process()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.syllabus/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".syllabus").join("config.toml"))
    }

    /// Apply environment overrides read from the process environment
    ///
    /// Recognized variables: `COMPOSIO_MCP_CONFIG_ID`, `COMPOSIO_USER_ID`,
    /// `SYLLABUS_MODEL`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply environment-style overrides from an arbitrary lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(id) = non_empty("COMPOSIO_MCP_CONFIG_ID") {
            self.publish.mcp_config_id = Some(id.trim().to_string());
        }
        if let Some(user) = non_empty("COMPOSIO_USER_ID") {
            self.publish.user_id = user.trim().to_string();
        }
        if let Some(model) = non_empty("SYLLABUS_MODEL") {
            self.llm.model = model.trim().to_string();
        }
    }

    /// Return a copy with per-run overrides applied
    ///
    /// A timeout override bounds every external call (generation, search
    /// and publish).
    pub fn with_overrides(&self, overrides: &RunOverrides) -> Result<Self, EngineError> {
        let mut config = self.clone();

        if let Some(model) = &overrides.model {
            config.llm.model = model.clone();
        }
        if let Some(provider) = overrides.search_provider {
            config.search.provider = provider;
        }
        if let Some(secs) = overrides.timeout_secs {
            config.llm.timeout_secs = secs;
            config.search.timeout_secs = secs;
            config.publish.timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate field values without touching the file system
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(EngineError::Config("llm.model must not be empty".to_string()));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(
                "llm.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        for (name, secs) in [
            ("llm.timeout_secs", self.llm.timeout_secs),
            ("search.timeout_secs", self.search.timeout_secs),
            ("publish.timeout_secs", self.publish.timeout_secs),
        ] {
            if secs == 0 {
                return Err(EngineError::Config(format!("{} must be greater than 0", name)));
            }
        }

        if self.search.max_results == 0 {
            return Err(EngineError::Config(
                "search.max_results must be greater than 0".to_string(),
            ));
        }

        if self.agents.context_chars == 0 {
            return Err(EngineError::Config(
                "agents.context_chars must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate and process configuration
    ///
    /// Validates field values and expands ~ in the output directory.
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        self.validate()?;
        self.core.output_dir = expand_path(&self.core.output_dir)?;
        Ok(())
    }
}

/// Expand ~ in path to user's home directory
pub fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.provider, ProviderKind::OpenRouter);
        assert_eq!(config.llm.model, "google/gemini-2.0-flash-exp:free");
        assert_eq!(config.search.provider, SearchProviderKind::DuckDuckGo);
        assert!(config.publish.enabled);
        assert!(config.publish.mcp_config_id.is_none());
        assert_eq!(config.agents.context_chars, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config = Config::from_toml_str("[llm]\nmodel = \"openai/gpt-4o\"\n").unwrap();
        assert_eq!(config.llm.model, "openai/gpt-4o");
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.search.max_results, 5);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = Config::from_toml_str("[core]\nlog_level = \"loud\"\n").unwrap_err();
        assert!(matches!(err, EngineError::Config(msg) if msg.contains("loud")));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Config::from_toml_str("[search]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, EngineError::Config(msg) if msg.contains("search.timeout_secs")));
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("OpenRouter".parse::<ProviderKind>().unwrap(), ProviderKind::OpenRouter);
        assert_eq!("ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert!("bard".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Ollama.api_key_name(), None);
        assert_eq!(ProviderKind::OpenRouter.api_key_name(), Some("OPENROUTER_API_KEY"));
    }

    #[test]
    fn test_search_provider_parsing() {
        assert_eq!(
            "serpapi".parse::<SearchProviderKind>().unwrap(),
            SearchProviderKind::SerpApi
        );
        assert_eq!(
            "ddg".parse::<SearchProviderKind>().unwrap(),
            SearchProviderKind::DuckDuckGo
        );
        assert!("bing".parse::<SearchProviderKind>().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("COMPOSIO_MCP_CONFIG_ID", " mcp-123 "),
            ("COMPOSIO_USER_ID", "learner"),
            ("SYLLABUS_MODEL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.publish.mcp_config_id.as_deref(), Some("mcp-123"));
        assert_eq!(config.publish.user_id, "learner");
        // Empty values leave the configured model alone
        assert_eq!(config.llm.model, "google/gemini-2.0-flash-exp:free");
    }

    #[test]
    fn test_run_overrides() {
        let config = Config::default();
        let overridden = config
            .with_overrides(&RunOverrides {
                model: Some("x-ai/grok-4.1-fast".to_string()),
                search_provider: Some(SearchProviderKind::SerpApi),
                timeout_secs: Some(45),
            })
            .unwrap();

        assert_eq!(overridden.llm.model, "x-ai/grok-4.1-fast");
        assert_eq!(overridden.search.provider, SearchProviderKind::SerpApi);
        assert_eq!(overridden.llm.timeout_secs, 45);
        assert_eq!(overridden.search.timeout_secs, 45);
        assert_eq!(overridden.publish.timeout_secs, 45);

        let err = config
            .with_overrides(&RunOverrides {
                timeout_secs: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_effective_base_url() {
        let mut llm = LLMConfig::default();
        assert_eq!(llm.effective_base_url(), "https://openrouter.ai/api/v1");
        llm.base_url = Some("http://127.0.0.1:9000/v1".to_string());
        assert_eq!(llm.effective_base_url(), "http://127.0.0.1:9000/v1");
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.llm.provider, deserialized.llm.provider);
        assert_eq!(config.publish.tool, deserialized.publish.tool);
    }
}
