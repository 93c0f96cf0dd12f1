//! The fixed agent roster
//!
//! Four roles, always routed in this order:
//!
//! | id               | role               | section            | search |
//! |------------------|--------------------|--------------------|--------|
//! | `knowledge_base` | Professor          | Knowledge Base     | no     |
//! | `roadmap`        | Academic Advisor   | Learning Roadmap   | no     |
//! | `resources`      | Research Librarian | Curated Resources  | yes    |
//! | `exercises`      | Teaching Assistant | Practice Materials | yes    |

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of one agent role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    KnowledgeBase,
    Roadmap,
    Resources,
    Exercises,
}

/// Routing order
pub const ROSTER: [AgentId; 4] = [
    AgentId::KnowledgeBase,
    AgentId::Roadmap,
    AgentId::Resources,
    AgentId::Exercises,
];

impl AgentId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::KnowledgeBase => "knowledge_base",
            AgentId::Roadmap => "roadmap",
            AgentId::Resources => "resources",
            AgentId::Exercises => "exercises",
        }
    }

    /// Persona shown to the user and used in prompts
    pub fn role_name(&self) -> &'static str {
        match self {
            AgentId::KnowledgeBase => "Professor",
            AgentId::Roadmap => "Academic Advisor",
            AgentId::Resources => "Research Librarian",
            AgentId::Exercises => "Teaching Assistant",
        }
    }

    pub fn section_title(&self) -> &'static str {
        match self {
            AgentId::KnowledgeBase => "Knowledge Base",
            AgentId::Roadmap => "Learning Roadmap",
            AgentId::Resources => "Curated Resources",
            AgentId::Exercises => "Practice Materials",
        }
    }

    pub fn uses_search(&self) -> bool {
        matches!(self, AgentId::Resources | AgentId::Exercises)
    }

    /// Earlier sections quoted into this agent's prompt
    pub fn upstream(&self) -> &'static [AgentId] {
        match self {
            AgentId::KnowledgeBase => &[],
            AgentId::Roadmap => &[AgentId::KnowledgeBase],
            AgentId::Resources => &[AgentId::Roadmap],
            AgentId::Exercises => &[AgentId::KnowledgeBase, AgentId::Roadmap],
        }
    }

    /// Terms that narrow a topic search to this role's needs. `None` for
    /// roles that never search.
    pub fn search_terms(&self) -> Option<&'static str> {
        match self {
            AgentId::Resources => Some("tutorials courses books learning resources"),
            AgentId::Exercises => Some("practice problems exercises examples"),
            _ => None,
        }
    }

    /// Title of the published document
    pub fn document_title(&self, topic: &str) -> String {
        format!("{} - {}", topic, self.section_title())
    }

    /// Position in the roster, 1-based
    pub fn step(&self) -> usize {
        ROSTER.iter().position(|a| a == self).map_or(0, |i| i + 1)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ROSTER
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| EngineError::UnknownRoutingState(format!("unknown agent '{}'", s)))
    }
}
