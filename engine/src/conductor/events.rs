//! Progress events emitted while a session runs

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::agent::{AgentId, AgentStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConductorEvent {
    AgentStarted {
        agent: AgentId,
        step: usize,
        total: usize,
    },
    AgentFinished {
        agent: AgentId,
        status: AgentStatus,
        document_reference: Option<String>,
        incidents: usize,
    },
    Finished {
        completed: usize,
        errors: usize,
    },
}

/// Optional sink for progress events. Sending never fails the run.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink(Option<UnboundedSender<ConductorEvent>>);

impl ProgressSink {
    pub fn new(sender: Option<UnboundedSender<ConductorEvent>>) -> Self {
        Self(sender)
    }

    pub fn emit(&self, event: ConductorEvent) {
        if let Some(tx) = &self.0 {
            if tx.send(event).is_err() {
                tracing::trace!("Progress receiver dropped");
            }
        }
    }
}
