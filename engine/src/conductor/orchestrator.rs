//! Orchestration loop
//!
//! Two phases, `Running` and `Done`. While running, the supervisor picks
//! the next agent, the agent runs to completion (including its tool calls)
//! and its result is merged. One agent at a time, no overlap.

use sdk::errors::EngineError;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

use super::events::{ConductorEvent, ProgressSink};
use super::supervisor::Supervisor;
use crate::agent::{AgentRunner, AgentSettings, AgentStatus, ROSTER};
use crate::config::Config;
use crate::llm::{build_provider, LLMProvider};
use crate::secrets::SecretCache;
use crate::state::{NextAction, SharedState};
use crate::tools::Toolbox;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopPhase {
    Running,
    Done,
}

/// Trimmed topic, or `InvalidTopic` when nothing is left
pub fn validate_topic(topic: &str) -> Result<String, EngineError> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidTopic(
            "topic must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

pub struct Conductor {
    runner: AgentRunner,
}

impl Conductor {
    pub fn new(generator: Arc<dyn LLMProvider>, toolbox: Toolbox, settings: AgentSettings) -> Self {
        Self {
            runner: AgentRunner::new(generator, toolbox, settings),
        }
    }

    /// Build the generator and adapters described by `config`.
    ///
    /// Every credential and endpoint the run needs is resolved here, so a
    /// missing one fails with `Config` before any agent runs.
    pub fn from_config(config: &Config, secrets: &SecretCache) -> Result<Self, EngineError> {
        let generator = build_provider(&config.llm, secrets)?;
        let toolbox = Toolbox::from_config(config, secrets)?;
        let settings = AgentSettings {
            generation_timeout: config.llm.timeout(),
            context_chars: config.agents.context_chars,
        };

        Ok(Self::new(generator, toolbox, settings))
    }

    /// Run a full session for `topic`
    pub async fn run(&self, topic: &str) -> Result<SharedState, EngineError> {
        self.run_with_progress(topic, None).await
    }

    pub async fn run_with_progress(
        &self,
        topic: &str,
        progress: Option<UnboundedSender<ConductorEvent>>,
    ) -> Result<SharedState, EngineError> {
        let topic = validate_topic(topic)?;
        self.drive(SharedState::new(topic), progress).await
    }

    /// Drive an existing state (fresh or restored) until every agent has run.
    pub async fn drive(
        &self,
        mut state: SharedState,
        progress: Option<UnboundedSender<ConductorEvent>>,
    ) -> Result<SharedState, EngineError> {
        let sink = ProgressSink::new(progress);
        let mut phase = LoopPhase::Running;

        info!(
            run_id = %state.run_id,
            "Starting session for '{}' with {} ({})",
            state.topic,
            self.runner.generator().name(),
            self.runner.generator().model()
        );

        while phase == LoopPhase::Running {
            let action = Supervisor::decide(&state)?;
            state.next_action = Some(action);

            match action {
                NextAction::Finish => phase = LoopPhase::Done,
                NextAction::Run(agent) => {
                    sink.emit(ConductorEvent::AgentStarted {
                        agent,
                        step: agent.step(),
                        total: ROSTER.len(),
                    });

                    let span = info_span!("agent", run_id = %state.run_id, agent = %agent);
                    let result = self.runner.run(agent, &state).instrument(span).await;

                    sink.emit(ConductorEvent::AgentFinished {
                        agent,
                        status: result.status,
                        document_reference: result.document_reference.clone(),
                        incidents: result.incidents.len(),
                    });

                    if result.status == AgentStatus::Failed {
                        info!("{} failed; moving on", agent.role_name());
                    }

                    Supervisor::merge(&mut state, result)?;
                }
            }
        }

        sink.emit(ConductorEvent::Finished {
            completed: state.completed.len(),
            errors: state.error_log.len(),
        });

        info!(
            run_id = %state.run_id,
            "Session finished: {} sections, {} documents, {} logged errors",
            state.outputs.len(),
            state.document_links.len(),
            state.error_log.len()
        );

        Ok(state)
    }
}
