//! Error types and handling
//!
//! This module provides the error taxonomy used throughout Syllabus.
//! All errors implement the `SyllabusErrorExt` trait which provides
//! user-friendly hints and indicates whether a run can continue past them.
//!
//! # Error Categories
//!
//! - **Fatal**: `Config`, `InvalidTopic`, `UnknownRoutingState` abort a run
//! - **Degraded**: `SearchUnavailable`, `PublishUnavailable`,
//!   `GenerationFailed` are recorded in the session's error log and the run
//!   moves on to the next agent
//! - **Presentation**: `Io`, `Serialization` only surface while writing reports
//!
//! # Examples
//!
//! ```
//! use sdk::errors::{EngineError, SyllabusErrorExt};
//!
//! let error = EngineError::SearchUnavailable("timed out".to_string());
//! println!("Hint: {}", error.user_hint());
//! assert!(error.is_recoverable());
//!
//! let fatal_error = EngineError::UnknownRoutingState("duplicate roadmap".to_string());
//! assert!(!fatal_error.is_recoverable());
//! ```

use thiserror::Error;

/// Trait for Syllabus error extensions
///
/// Hints are safe to show to end users: they never contain secrets or
/// provider response bodies.
pub trait SyllabusErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the run can continue past this error
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    // Routing errors
    #[error("Unknown routing state: {0}")]
    UnknownRoutingState(String),

    // Tool adapter errors
    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Publish unavailable: {0}")]
    PublishUnavailable(String),

    // Generation errors
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Returns true for errors that must halt a run before or during routing
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::InvalidTopic(_) | Self::UnknownRoutingState(_)
        )
    }
}

impl SyllabusErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml and required API keys",
            Self::InvalidTopic(_) => "Enter a non-empty topic to learn about",
            Self::UnknownRoutingState(_) => {
                "Session state is corrupted. Start a new session for this topic"
            }
            Self::SearchUnavailable(_) => {
                "Web search failed. Sections were written without search results"
            }
            Self::PublishUnavailable(_) => {
                "Document publishing failed. The section text is still available locally"
            }
            Self::GenerationFailed(_) => {
                "The language model did not produce this section. Check your model and API key"
            }
            Self::Serialization(_) => "Failed to encode session output",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !self.is_fatal()
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(EngineError::Config("x".into()).is_fatal());
        assert!(EngineError::InvalidTopic("x".into()).is_fatal());
        assert!(EngineError::UnknownRoutingState("x".into()).is_fatal());
        assert!(!EngineError::SearchUnavailable("x".into()).is_fatal());
        assert!(!EngineError::PublishUnavailable("x".into()).is_fatal());
        assert!(!EngineError::GenerationFailed("x".into()).is_fatal());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = EngineError::PublishUnavailable("quota exceeded".into());
        assert_eq!(err.to_string(), "Publish unavailable: quota exceeded");
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: EngineError = parse.into();
        assert!(matches!(err, EngineError::Serialization(_)));
    }
}
