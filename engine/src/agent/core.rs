//! Agent runner
//!
//! One runner serves all four roles. A run is:
//!
//! 1. Search (searching roles only); failure or timeout is recorded as
//!    `search_unavailable` and the agent continues without results
//! 2. One generation call bounded by the configured timeout
//! 3. Publish the text (when a publisher is configured); failure is
//!    recorded as `publish_unavailable` and the text is kept
//!
//! A failed or empty generation ends the run with `status = failed`, empty
//! text and a `generation_failed` record. Nothing is retried.

use sdk::errors::EngineError;
use sdk::types::SearchHit;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::prompts::build_messages;
use super::roster::AgentId;
use crate::llm::LLMProvider;
use crate::secrets::scrub_secrets;
use crate::state::{ErrorRecord, IncidentKind, SharedState};
use crate::tools::Toolbox;

/// Outcome of one agent run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Success,
    Failed,
}

/// What an agent hands back to the supervisor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent: AgentId,
    pub text: String,
    pub document_reference: Option<String>,
    pub status: AgentStatus,
    pub incidents: Vec<ErrorRecord>,
}

impl AgentResult {
    pub fn success(agent: AgentId, text: impl Into<String>) -> Self {
        Self {
            agent,
            text: text.into(),
            document_reference: None,
            status: AgentStatus::Success,
            incidents: Vec::new(),
        }
    }

    pub fn failed(agent: AgentId, incidents: Vec<ErrorRecord>) -> Self {
        Self {
            agent,
            text: String::new(),
            document_reference: None,
            status: AgentStatus::Failed,
            incidents,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.document_reference = Some(reference.into());
        self
    }
}

/// Runner settings shared by every role
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub generation_timeout: Duration,

    /// Upstream excerpt budget, in characters
    pub context_chars: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(120),
            context_chars: 2000,
        }
    }
}

pub struct AgentRunner {
    generator: Arc<dyn LLMProvider>,
    toolbox: Toolbox,
    settings: AgentSettings,
}

/// Turn a recoverable error into a scrubbed error-log record
fn record(agent: AgentId, error: &EngineError) -> Option<ErrorRecord> {
    let kind = IncidentKind::from_error(error)?;
    Some(ErrorRecord::new(agent, kind, scrub_secrets(&error.to_string())))
}

impl AgentRunner {
    pub fn new(generator: Arc<dyn LLMProvider>, toolbox: Toolbox, settings: AgentSettings) -> Self {
        Self {
            generator,
            toolbox,
            settings,
        }
    }

    pub fn generator(&self) -> &Arc<dyn LLMProvider> {
        &self.generator
    }

    /// Run one role against the current state. Never fails: every problem
    /// ends up in the returned result's incidents.
    pub async fn run(&self, agent: AgentId, state: &SharedState) -> AgentResult {
        let start = Instant::now();
        let topic = state.topic.as_str();
        let mut incidents = Vec::new();

        let search = if agent.uses_search() {
            Some(self.search(agent, topic, &mut incidents).await)
        } else {
            None
        };

        let upstream: Vec<(AgentId, Option<&str>)> = agent
            .upstream()
            .iter()
            .map(|dep| (*dep, state.output_for(*dep)))
            .collect();

        let messages = build_messages(
            agent,
            topic,
            &upstream,
            search.as_deref(),
            self.settings.context_chars,
        );

        let text = match self.generate(&messages).await {
            Ok(text) => text,
            Err(e) => {
                error!("{} failed to generate: {}", agent.role_name(), e);
                incidents.extend(record(agent, &e));
                return AgentResult::failed(agent, incidents);
            }
        };

        let mut result = AgentResult::success(agent, text);

        if let Some(reference) = self.publish(agent, topic, &result.text, &mut incidents).await {
            result = result.with_reference(reference);
        }
        result.incidents = incidents;

        info!(
            "{} finished in {:.1}s ({} chars, published: {})",
            agent.role_name(),
            start.elapsed().as_secs_f64(),
            result.text.len(),
            result.document_reference.is_some()
        );

        result
    }

    async fn search(
        &self,
        agent: AgentId,
        topic: &str,
        incidents: &mut Vec<ErrorRecord>,
    ) -> Vec<SearchHit> {
        let Some(terms) = agent.search_terms() else {
            return Vec::new();
        };
        let query = self.toolbox.search.compose_query(topic, terms);

        let bound = self.toolbox.search_timeout;
        let outcome = match timeout(bound, self.toolbox.search.search(&query)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::SearchUnavailable(format!(
                "{} search timed out after {}s",
                self.toolbox.search.name(),
                bound.as_secs_f64()
            ))),
        };

        match outcome {
            Ok(hits) if hits.is_empty() => {
                warn!(
                    "{} found no {} results for '{}'",
                    agent.role_name(),
                    self.toolbox.search.name(),
                    query
                );
                hits
            }
            Ok(hits) => {
                debug!("{} received {} search hits", agent.role_name(), hits.len());
                hits
            }
            Err(e) => {
                let e = match e {
                    e @ EngineError::SearchUnavailable(_) => e,
                    other => EngineError::SearchUnavailable(other.to_string()),
                };
                warn!("{} continuing without search: {}", agent.role_name(), e);
                incidents.extend(record(agent, &e));
                Vec::new()
            }
        }
    }

    async fn generate(&self, messages: &[crate::llm::Message]) -> Result<String, EngineError> {
        let bound = self.settings.generation_timeout;
        let completion = timeout(bound, self.generator.generate(messages))
            .await
            .map_err(|_| {
                EngineError::GenerationFailed(format!(
                    "{} timed out after {}s",
                    self.generator.name(),
                    bound.as_secs_f64()
                ))
            })??;

        if completion.content.trim().is_empty() {
            return Err(EngineError::GenerationFailed(format!(
                "{} returned an empty completion",
                self.generator.name()
            )));
        }

        Ok(completion.content)
    }

    async fn publish(
        &self,
        agent: AgentId,
        topic: &str,
        text: &str,
        incidents: &mut Vec<ErrorRecord>,
    ) -> Option<String> {
        let publisher = self.toolbox.publisher.as_ref()?;
        let title = agent.document_title(topic);

        let bound = self.toolbox.publish_timeout;
        let outcome = match timeout(bound, publisher.publish(&title, text)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::PublishUnavailable(format!(
                "{} publish timed out after {}s",
                publisher.name(),
                bound.as_secs_f64()
            ))),
        };

        match outcome {
            Ok(reference) => {
                info!("Published '{}' to {}", title, reference);
                Some(reference)
            }
            Err(e) => {
                let e = match e {
                    e @ EngineError::PublishUnavailable(_) => e,
                    other => EngineError::PublishUnavailable(other.to_string()),
                };
                warn!("Failed to publish '{}': {}", title, e);
                incidents.extend(record(agent, &e));
                None
            }
        }
    }
}
