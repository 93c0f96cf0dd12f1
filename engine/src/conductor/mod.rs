//! Conductor
//!
//! Drives the supervisor and agents to completion for one topic.

pub mod events;
pub mod orchestrator;
pub mod supervisor;

pub use events::ConductorEvent;
pub use orchestrator::{validate_topic, Conductor};
pub use supervisor::Supervisor;

use sdk::errors::EngineError;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::{Config, RunOverrides};
use crate::secrets::SecretCache;
use crate::state::SharedState;

/// Run a complete session.
///
/// Fatal errors are returned before any agent runs: `InvalidTopic` for a
/// blank topic, `Config` for bad overrides or missing credentials and
/// endpoints.
pub async fn run_session(
    topic: &str,
    config: &Config,
    secrets: &SecretCache,
    overrides: &RunOverrides,
) -> Result<SharedState, EngineError> {
    run_session_with_progress(topic, config, secrets, overrides, None).await
}

pub async fn run_session_with_progress(
    topic: &str,
    config: &Config,
    secrets: &SecretCache,
    overrides: &RunOverrides,
    progress: Option<UnboundedSender<ConductorEvent>>,
) -> Result<SharedState, EngineError> {
    let topic = validate_topic(topic)?;
    let config = config.with_overrides(overrides)?;
    let conductor = Conductor::from_config(&config, secrets)?;

    conductor.run_with_progress(&topic, progress).await
}
