//! Report rendering
//!
//! Markdown rendering of a finished session, the on-disk report layout used
//! by `run --output`, and the Mermaid control-flow diagram.

use sdk::errors::EngineError;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::agent::{AgentId, ROSTER};
use crate::state::SharedState;

const NO_CONTENT: &str = "_No content was generated for this section._";

/// Longest slug, in characters
pub const MAX_SLUG_CHARS: usize = 64;

/// Lowercase, dash-separated file-name form of `text`, at most
/// [`MAX_SLUG_CHARS`] characters
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len().min(MAX_SLUG_CHARS * 4));
    let mut pending_dash = false;
    let mut len = 0;

    for c in text.chars() {
        if len >= MAX_SLUG_CHARS {
            break;
        }
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
                len += 1;
            }
            pending_dash = false;
            for lower in c.to_lowercase() {
                if len < MAX_SLUG_CHARS {
                    slug.push(lower);
                    len += 1;
                }
            }
        } else {
            pending_dash = true;
        }
    }

    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "session".to_string()
    } else {
        slug.to_string()
    }
}

/// One section: heading, document link and text
pub fn section_markdown(state: &SharedState, agent: AgentId) -> String {
    let mut out = format!("# {}: {}\n\n", agent.section_title(), state.topic);
    let _ = writeln!(out, "_Prepared by the {}._\n", agent.role_name());

    if let Some(link) = state.link_for(agent) {
        let _ = writeln!(out, "Google Doc: {}\n", link);
    }

    match state.output_for(agent) {
        Some(text) if !text.trim().is_empty() => {
            out.push_str(text.trim());
            out.push('\n');
        }
        _ => {
            out.push_str(NO_CONTENT);
            out.push('\n');
        }
    }

    out
}

/// The whole learning package as one Markdown document
pub fn render_markdown(state: &SharedState) -> String {
    let mut out = format!("# Learning package: {}\n\n", state.topic);
    let _ = writeln!(
        out,
        "Run `{}` started {}\n",
        state.run_id,
        state.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    for agent in ROSTER {
        let _ = writeln!(
            out,
            "## {} ({})\n",
            agent.section_title(),
            agent.role_name()
        );
        if let Some(link) = state.link_for(agent) {
            let _ = writeln!(out, "Google Doc: {}\n", link);
        }
        match state.output_for(agent) {
            Some(text) if !text.trim().is_empty() => {
                let _ = writeln!(out, "{}\n", text.trim());
            }
            _ => {
                let _ = writeln!(out, "{}\n", NO_CONTENT);
            }
        }
    }

    if !state.error_log.is_empty() {
        out.push_str("## Issues\n\n");
        for record in &state.error_log {
            let _ = writeln!(
                out,
                "- {} `{}`: {}",
                record.agent.role_name(),
                record.kind,
                record.message
            );
        }
    }

    out
}

/// Write the session under `dir/<topic-slug>-<run id prefix>/`.
///
/// Layout: `report.md`, one `NN-<section>.md` per agent in roster order,
/// and `state.json`. Returns the session directory.
pub fn write_session(dir: &Path, state: &SharedState) -> Result<PathBuf, EngineError> {
    let run_prefix: String = state.run_id.simple().to_string().chars().take(8).collect();
    let session_dir = dir.join(format!("{}-{}", slugify(&state.topic), run_prefix));
    fs::create_dir_all(&session_dir)?;

    for agent in ROSTER {
        let name = format!("{:02}-{}.md", agent.step(), slugify(agent.section_title()));
        fs::write(session_dir.join(name), section_markdown(state, agent))?;
    }

    fs::write(session_dir.join("report.md"), render_markdown(state))?;
    fs::write(session_dir.join("state.json"), state.to_json_pretty()?)?;

    tracing::info!("Session written to {}", session_dir.display());
    Ok(session_dir)
}

/// Mermaid diagram of the supervisor/agent control flow
pub fn control_flow_mermaid() -> String {
    let mut out = String::from("graph TD\n");
    out.push_str("    start([start]) --> supervisor{Supervisor}\n");

    for agent in ROSTER {
        let _ = writeln!(
            out,
            "    supervisor -.-> {}[\"{}<br/>{}\"]",
            agent.as_str(),
            agent.role_name(),
            agent.section_title()
        );
    }
    for agent in ROSTER {
        let label = if agent.uses_search() {
            "search, write, publish"
        } else {
            "write, publish"
        };
        let _ = writeln!(out, "    {} -->|{}| supervisor", agent.as_str(), label);
    }

    out.push_str("    supervisor -.->|finish| finish([end])\n");
    out
}
