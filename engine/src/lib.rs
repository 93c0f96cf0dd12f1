//! Syllabus Engine Library
//!
//! A supervisor routes one topic through four agents (Professor, Academic
//! Advisor, Research Librarian, Teaching Assistant). Each agent writes one
//! section of a learning package, optionally grounded in web search, and
//! publishes it as a Google Doc. Used by the binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Shared session state
pub mod state;

/// LLM provider abstraction layer
pub mod llm;

/// Search and publish adapters
pub mod tools;

/// Agent roster, prompts and runner
pub mod agent;

/// Supervisor and orchestration loop
pub mod conductor;

/// Markdown reports and the control-flow diagram
pub mod report;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
