//! Supervisor
//!
//! Routing is a pure function of `completed` and the fixed roster: the
//! first roster entry not yet completed runs next, and once every entry is
//! completed the run finishes. Topic and outputs never influence it.

use sdk::errors::EngineError;

use crate::agent::{AgentResult, ROSTER};
use crate::state::{AgentOutput, NextAction, SharedState};

pub struct Supervisor;

impl Supervisor {
    /// Decide the next action.
    ///
    /// # Errors
    /// `UnknownRoutingState` if `completed` lists an agent twice.
    pub fn decide(state: &SharedState) -> Result<NextAction, EngineError> {
        for (i, agent) in state.completed.iter().enumerate() {
            if state.completed[..i].contains(agent) {
                return Err(EngineError::UnknownRoutingState(format!(
                    "agent '{}' appears twice in completed",
                    agent
                )));
            }
        }

        Ok(ROSTER
            .iter()
            .copied()
            .find(|agent| !state.is_completed(*agent))
            .map_or(NextAction::Finish, NextAction::Run))
    }

    /// Fold an agent's result into the state.
    ///
    /// The agent is marked completed whatever its status; a failed agent
    /// contributes an empty output entry and its failure records.
    ///
    /// # Errors
    /// `UnknownRoutingState` if the agent was already completed. The state
    /// is left untouched in that case.
    pub fn merge(state: &mut SharedState, result: AgentResult) -> Result<(), EngineError> {
        if state.is_completed(result.agent) {
            return Err(EngineError::UnknownRoutingState(format!(
                "agent '{}' already completed",
                result.agent
            )));
        }

        state.outputs.push(AgentOutput {
            agent: result.agent,
            text: result.text,
        });
        if let Some(reference) = result.document_reference {
            state.document_links.insert(result.agent, reference);
        }
        state.error_log.extend(result.incidents);
        state.completed.push(result.agent);

        Ok(())
    }
}
