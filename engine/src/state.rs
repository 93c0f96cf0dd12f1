//! Shared session state
//!
//! One [`SharedState`] exists per run. The conductor is its only mutator:
//! it records routing decisions and the supervisor merges each agent's
//! result into it. Field names are stable; the CLI prints this struct as
//! JSON and `--output` saves it as `state.json`.

use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::agent::roster::AgentId;

/// Kind of recorded, non-fatal failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    SearchUnavailable,
    PublishUnavailable,
    GenerationFailed,
}

impl IncidentKind {
    /// Classify a recoverable engine error. Fatal errors have no kind.
    pub fn from_error(error: &EngineError) -> Option<Self> {
        match error {
            EngineError::SearchUnavailable(_) => Some(Self::SearchUnavailable),
            EngineError::PublishUnavailable(_) => Some(Self::PublishUnavailable),
            EngineError::GenerationFailed(_) => Some(Self::GenerationFailed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchUnavailable => "search_unavailable",
            Self::PublishUnavailable => "publish_unavailable",
            Self::GenerationFailed => "generation_failed",
        }
    }
}

impl fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the session's error log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub agent: AgentId,
    pub kind: IncidentKind,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(agent: AgentId, kind: IncidentKind, message: impl Into<String>) -> Self {
        Self {
            agent,
            kind,
            message: message.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Text produced by one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub agent: AgentId,
    pub text: String,
}

/// Routing decision: run an agent, or stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NextAction {
    Run(AgentId),
    Finish,
}

impl NextAction {
    pub const FINISH: &'static str = "finish";
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextAction::Run(agent) => write!(f, "{}", agent),
            NextAction::Finish => f.write_str(Self::FINISH),
        }
    }
}

impl From<NextAction> for String {
    fn from(action: NextAction) -> Self {
        action.to_string()
    }
}

impl TryFrom<String> for NextAction {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for NextAction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::FINISH {
            Ok(NextAction::Finish)
        } else {
            s.parse().map(NextAction::Run)
        }
    }
}

/// Mutable record threaded through every step of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedState {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub topic: String,

    /// Completion order, at most one entry per agent
    pub outputs: Vec<AgentOutput>,

    /// Only agents whose publish step succeeded
    pub document_links: BTreeMap<AgentId, String>,

    /// Completion order; only grows
    pub completed: Vec<AgentId>,

    /// Latest routing decision; unset until the first decision
    pub next_action: Option<NextAction>,

    pub error_log: Vec<ErrorRecord>,
}

impl SharedState {
    /// Fresh state holding only the topic
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            topic: topic.into(),
            outputs: Vec::new(),
            document_links: BTreeMap::new(),
            completed: Vec::new(),
            next_action: None,
            error_log: Vec::new(),
        }
    }

    pub fn is_completed(&self, agent: AgentId) -> bool {
        self.completed.contains(&agent)
    }

    pub fn output_for(&self, agent: AgentId) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.agent == agent)
            .map(|o| o.text.as_str())
    }

    pub fn link_for(&self, agent: AgentId) -> Option<&str> {
        self.document_links.get(&agent).map(|s| s.as_str())
    }

    pub fn records_for(&self, agent: AgentId) -> impl Iterator<Item = &ErrorRecord> {
        self.error_log.iter().filter(move |r| r.agent == agent)
    }

    pub fn count_kind(&self, kind: IncidentKind) -> usize {
        self.error_log.iter().filter(|r| r.kind == kind).count()
    }

    pub fn to_json_pretty(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restore a state from a JSON snapshot.
    ///
    /// # Errors
    /// `UnknownRoutingState` when the snapshot names an agent outside the
    /// roster or lists one twice in `completed`; `Serialization` for any
    /// other malformed input.
    pub fn restore(json: &str) -> Result<Self, EngineError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        check_agent_ids(&value)?;

        let state: SharedState = serde_json::from_value(value)?;

        let mut seen = Vec::with_capacity(state.completed.len());
        for agent in &state.completed {
            if seen.contains(agent) {
                return Err(EngineError::UnknownRoutingState(format!(
                    "agent '{}' appears twice in completed",
                    agent
                )));
            }
            seen.push(*agent);
        }

        Ok(state)
    }
}

/// Validate every agent identifier in a snapshot before typed decoding
fn check_agent_ids(value: &serde_json::Value) -> Result<(), EngineError> {
    let as_id = |v: &serde_json::Value| -> Result<(), EngineError> {
        match v.as_str() {
            Some(s) => s.parse::<AgentId>().map(|_| ()),
            None => Err(EngineError::UnknownRoutingState(format!(
                "agent identifier must be a string, got {}",
                v
            ))),
        }
    };

    if let Some(completed) = value.get("completed").and_then(|v| v.as_array()) {
        completed.iter().try_for_each(as_id)?;
    }
    if let Some(outputs) = value.get("outputs").and_then(|v| v.as_array()) {
        outputs
            .iter()
            .filter_map(|o| o.get("agent"))
            .try_for_each(as_id)?;
    }
    if let Some(log) = value.get("error_log").and_then(|v| v.as_array()) {
        log.iter().filter_map(|r| r.get("agent")).try_for_each(as_id)?;
    }
    if let Some(links) = value.get("document_links").and_then(|v| v.as_object()) {
        for key in links.keys() {
            key.parse::<AgentId>()?;
        }
    }
    if let Some(next) = value.get("next_action").and_then(|v| v.as_str()) {
        next.parse::<NextAction>()?;
    }

    Ok(())
}
