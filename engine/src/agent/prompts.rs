//! Prompt table
//!
//! Each role gets fixed system instructions plus a task prompt built from
//! the topic, excerpts of earlier sections and (for searching roles) the
//! search results.

use sdk::types::{format_hits, SearchHit};

use super::roster::AgentId;
use crate::llm::Message;

const NOT_YET_AVAILABLE: &str = "Not yet available";
const NO_SEARCH_RESULTS: &str = "No search results available. Rely on well-known, stable sources.";

fn system_instructions(agent: AgentId) -> &'static str {
    match agent {
        AgentId::KnowledgeBase => {
            "You are the Professor on a teaching team. Write a knowledge base that a \
             complete beginner can learn the topic from.\n\n\
             - Start from first principles and build up gradually.\n\
             - Define every key term the first time it appears.\n\
             - Explain the core principles and show real-world applications.\n\
             - Call out common misconceptions.\n\n\
             Write well-structured Markdown with headings and short examples."
        }
        AgentId::Roadmap => {
            "You are the Academic Advisor on a teaching team. Design a learning roadmap \
             that takes a learner from beginner to advanced.\n\n\
             - Split the topic into phases and modules ordered by difficulty.\n\
             - Give a realistic time estimate for each module.\n\
             - Mark prerequisites between modules.\n\
             - State the learning objective of every phase and suggest a checkpoint.\n\n\
             Write well-structured Markdown."
        }
        AgentId::Resources => {
            "You are the Research Librarian on a teaching team. Curate learning \
             resources that follow the roadmap.\n\n\
             - Prefer official documentation, reputable courses, books and videos.\n\
             - Include the link for every resource you list.\n\
             - Say which roadmap phase each resource supports and its level.\n\
             - Keep the list focused: quality over quantity.\n\n\
             Write well-structured Markdown grouped by resource type."
        }
        AgentId::Exercises => {
            "You are the Teaching Assistant on a teaching team. Create practice \
             materials that reinforce the knowledge base and follow the roadmap.\n\n\
             - Provide exercises at beginner, intermediate and advanced levels.\n\
             - Include at least one small project that combines several concepts.\n\
             - Give worked solutions or clear hints for each exercise.\n\
             - Add a short self-assessment quiz.\n\n\
             Write well-structured Markdown."
        }
    }
}

fn task_prompt(agent: AgentId, topic: &str) -> String {
    match agent {
        AgentId::KnowledgeBase => format!("Create a comprehensive knowledge base for: {}", topic),
        AgentId::Roadmap => format!(
            "Using the knowledge base below, create a learning roadmap for: {}",
            topic
        ),
        AgentId::Resources => format!(
            "Using the roadmap and search results below, curate learning resources for: {}",
            topic
        ),
        AgentId::Exercises => format!(
            "Using the material and search results below, create practice materials for: {}",
            topic
        ),
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Build the generation request for one agent.
///
/// `upstream` pairs each of the agent's upstream roles with its text, if
/// that role produced any. `search` is `None` for roles that do not search
/// and `Some(&[])` when search was attempted but yielded nothing.
pub fn build_messages(
    agent: AgentId,
    topic: &str,
    upstream: &[(AgentId, Option<&str>)],
    search: Option<&[SearchHit]>,
    context_chars: usize,
) -> Vec<Message> {
    let mut prompt = task_prompt(agent, topic);

    for (source, text) in upstream {
        let body = match text {
            Some(t) if !t.trim().is_empty() => excerpt(t.trim(), context_chars),
            _ => NOT_YET_AVAILABLE.to_string(),
        };
        prompt.push_str(&format!(
            "\n\n## {} ({})\n{}",
            source.section_title(),
            source.role_name(),
            body
        ));
    }

    if let Some(hits) = search {
        let body = if hits.is_empty() {
            NO_SEARCH_RESULTS.to_string()
        } else {
            format_hits(hits)
        };
        prompt.push_str(&format!("\n\n## Web search results\n{}", body));
    }

    vec![
        Message::system(system_instructions(agent)),
        Message::user(prompt),
    ]
}
