//! Agents
//!
//! Four roles share one runner; they differ only in prompt and in whether
//! they search before writing. See [`roster`] for the fixed order.

pub mod core;
pub mod prompts;
pub mod roster;

pub use core::{AgentResult, AgentRunner, AgentSettings, AgentStatus};
pub use roster::{AgentId, ROSTER};
