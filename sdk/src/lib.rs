//! Syllabus SDK
//!
//! Shared error taxonomy and tool boundary types used by the engine and its
//! adapters.

/// Error types and handling
pub mod errors;

/// Tool boundary types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, SyllabusErrorExt};
pub use types::{format_hits, SearchHit};
