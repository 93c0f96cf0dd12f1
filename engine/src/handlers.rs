//! Command handlers
//!
//! One handler per CLI command. Handlers own presentation: progress lines,
//! text or JSON output, and writing reports to disk.

use anyhow::{Context, Result};
use sdk::errors::{EngineError, SyllabusErrorExt};
use serde_json::json;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::agent::{AgentStatus, ROSTER};
use crate::conductor::{run_session_with_progress, ConductorEvent};
use crate::config::{Config, RunOverrides, SearchProviderKind};
use crate::llm::build_provider;
use crate::report::{control_flow_mermaid, write_session};
use crate::secrets::{SecretCache, KNOWN_CREDENTIALS};
use crate::state::SharedState;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// A fatal engine error that has already been shown to the user. `main`
/// exits non-zero without printing it again.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Reported(pub EngineError);

/// Arguments of the `run` command
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub topic: String,
    pub model: Option<String>,
    pub search: Option<String>,
    pub timeout: Option<u64>,

    /// `Some(None)` saves under `core.output_dir`
    pub output: Option<Option<PathBuf>>,
}

fn print_event(event: &ConductorEvent) {
    match event {
        ConductorEvent::AgentStarted { agent, step, total } => {
            println!(
                "[{}/{}] {} is writing the {}...",
                step,
                total,
                agent.role_name(),
                agent.section_title()
            );
        }
        ConductorEvent::AgentFinished {
            agent,
            status,
            document_reference,
            incidents,
        } => {
            let mark = match status {
                AgentStatus::Success => "✓",
                AgentStatus::Failed => "✗",
            };
            let doc = if document_reference.is_some() {
                ", published"
            } else {
                ""
            };
            let warn = if *incidents > 0 {
                format!(", {} warning(s)", incidents)
            } else {
                String::new()
            };
            println!("      {} {}{}{}", mark, agent.section_title(), doc, warn);
        }
        ConductorEvent::Finished { .. } => println!(),
    }
}

fn print_state(state: &SharedState) {
    println!("Learning package: {}", state.topic);
    println!("Run ID: {}", state.run_id);
    println!();

    for agent in ROSTER {
        println!("== {} ({}) ==", agent.section_title(), agent.role_name());
        if let Some(link) = state.link_for(agent) {
            println!("Google Doc: {}", link);
        }
        println!();
        match state.output_for(agent) {
            Some(text) if !text.trim().is_empty() => println!("{}", text.trim()),
            _ => println!("(no content generated)"),
        }
        println!();
    }

    if state.error_log.is_empty() {
        println!("✓ All sections completed without errors");
    } else {
        println!("⚠ Issues during this run:");
        for record in &state.error_log {
            println!(
                "  - {} [{}] {}",
                record.agent.role_name(),
                record.kind,
                record.message
            );
        }
    }
}

/// Build a learning package for a topic
pub async fn handle_run(
    args: RunArgs,
    config: &Config,
    secrets: &SecretCache,
    format: OutputFormat,
) -> Result<()> {
    let search_provider = args
        .search
        .as_deref()
        .map(|s| s.parse::<SearchProviderKind>())
        .transpose()?;

    let overrides = RunOverrides {
        model: args.model.clone(),
        search_provider,
        timeout_secs: args.timeout,
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<ConductorEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if format == OutputFormat::Text {
                print_event(&event);
            }
        }
    });

    if format == OutputFormat::Text {
        println!("Building a learning package for: {}", args.topic.trim());
        println!();
    }

    let outcome =
        run_session_with_progress(&args.topic, config, secrets, &overrides, Some(tx)).await;
    printer.await.ok();

    let state = match outcome {
        Ok(state) => state,
        Err(e) => return Err(report_fatal(e, format)),
    };

    let saved_to = match &args.output {
        Some(dir) => {
            let dir = dir.clone().unwrap_or_else(|| config.core.output_dir.clone());
            let path = write_session(&dir, &state)
                .with_context(|| format!("Failed to write session to {}", dir.display()))?;
            Some(path)
        }
        None => None,
    };

    match format {
        OutputFormat::Text => {
            print_state(&state);
            if let Some(path) = &saved_to {
                println!();
                println!("Saved to {}", path.display());
            }
        }
        OutputFormat::Json => {
            println!("{}", state.to_json_pretty()?);
        }
    }

    Ok(())
}

fn report_fatal(e: EngineError, format: OutputFormat) -> anyhow::Error {
    match format {
        OutputFormat::Text => {
            eprintln!("✗ {}", e);
            eprintln!("  Hint: {}", e.user_hint());
        }
        OutputFormat::Json => {
            let output = json!({
                "status": "failed",
                "error": e.to_string(),
                "hint": e.user_hint(),
            });
            println!("{}", output);
        }
    }
    anyhow::Error::new(Reported(e))
}

/// Check configuration, credentials and provider reachability
pub async fn handle_doctor(config: &Config, secrets: &SecretCache, format: OutputFormat) -> Result<()> {
    let mut checks: Vec<(String, String)> = Vec::new();
    let mut issues: Vec<String> = Vec::new();

    checks.push(("Configuration".into(), "Valid".into()));
    checks.push((
        "Generation provider".into(),
        format!("{} ({})", config.llm.provider, config.llm.model),
    ));

    if let Some(key) = config.llm.provider.api_key_name() {
        if !secrets.has_secret(key) {
            issues.push(format!("{} is required for {}", key, config.llm.provider));
        }
    }

    match build_provider(&config.llm, secrets) {
        Ok(provider) => {
            if provider.check_health().await {
                checks.push(("Provider reachable".into(), "Yes".into()));
            } else {
                checks.push(("Provider reachable".into(), "No".into()));
                issues.push(format!(
                    "Cannot reach {} at {}",
                    provider.name(),
                    config.llm.effective_base_url()
                ));
            }
        }
        Err(e) => tracing::debug!("Skipping provider health check: {}", e),
    }

    checks.push(("Search provider".into(), config.search.provider.to_string()));
    if config.search.provider == SearchProviderKind::SerpApi
        && !secrets.has_secret("SERPAPI_API_KEY")
    {
        issues.push("SERPAPI_API_KEY is required for SerpAPI search".to_string());
    }

    if config.publish.enabled {
        checks.push(("Publishing".into(), "Google Docs via Composio".into()));
        match config.publish.mcp_config_id.as_deref() {
            Some(id) if !id.trim().is_empty() => {
                checks.push(("MCP config id".into(), id.to_string()));
            }
            _ => {
                checks.push(("MCP config id".into(), "Missing".into()));
                issues.push(
                    "Set COMPOSIO_MCP_CONFIG_ID or publish.mcp_config_id, or disable publishing"
                        .to_string(),
                );
            }
        }
        if !secrets.has_secret("COMPOSIO_API_KEY") {
            issues.push("COMPOSIO_API_KEY is required for publishing".to_string());
        }
    } else {
        checks.push(("Publishing".into(), "Disabled".into()));
    }

    for key in KNOWN_CREDENTIALS {
        let status = if secrets.has_secret(key) {
            "Configured"
        } else {
            "Not set"
        };
        checks.push((key.to_string(), status.to_string()));
    }

    checks.push((
        "Output directory".into(),
        config.core.output_dir.display().to_string(),
    ));

    match format {
        OutputFormat::Text => {
            println!("Syllabus Diagnostics");
            println!("====================");
            println!();

            for (check, status) in &checks {
                println!("  {:<22} {}", format!("{}:", check), status);
            }
            println!();

            if issues.is_empty() {
                println!("✓ Ready to run");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({ "name": name, "status": status })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "ready": issues.is_empty(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Print the control-flow diagram
pub fn handle_graph(format: OutputFormat) -> Result<()> {
    let diagram = control_flow_mermaid();
    match format {
        OutputFormat::Text => print!("{}", diagram),
        OutputFormat::Json => {
            println!("{}", json!({ "format": "mermaid", "diagram": diagram }));
        }
    }
    Ok(())
}

/// List the agents in routing order
pub fn handle_roster(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{:<4} {:<16} {:<20} {:<20} Search", "#", "ID", "Role", "Section");
            for agent in ROSTER {
                println!(
                    "{:<4} {:<16} {:<20} {:<20} {}",
                    agent.step(),
                    agent.as_str(),
                    agent.role_name(),
                    agent.section_title(),
                    if agent.uses_search() { "yes" } else { "no" }
                );
            }
        }
        OutputFormat::Json => {
            let agents: Vec<_> = ROSTER
                .iter()
                .map(|agent| {
                    json!({
                        "step": agent.step(),
                        "id": agent,
                        "role": agent.role_name(),
                        "section": agent.section_title(),
                        "uses_search": agent.uses_search(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&agents)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::StaticSource;

    #[tokio::test]
    async fn test_run_rejects_unknown_search_provider() {
        let secrets = SecretCache::new(vec![Box::new(StaticSource::new())]);
        let args = RunArgs {
            topic: "graph theory".to_string(),
            search: Some("bing".to_string()),
            ..RunArgs::default()
        };

        let err = handle_run(args, &Config::default(), &secrets, OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid search provider"));
    }

    #[tokio::test]
    async fn test_run_missing_credential_is_fatal() {
        let secrets = SecretCache::new(vec![Box::new(StaticSource::new())]);
        let args = RunArgs {
            topic: "graph theory".to_string(),
            ..RunArgs::default()
        };

        let err = handle_run(args, &Config::default(), &secrets, OutputFormat::Json)
            .await
            .unwrap_err();
        let reported = err.downcast_ref::<Reported>().unwrap();
        assert!(reported.0.is_fatal());
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[tokio::test]
    async fn test_only_engine_failures_are_marked_reported() {
        let secrets = SecretCache::new(vec![Box::new(StaticSource::new())]);
        let args = RunArgs {
            topic: "graph theory".to_string(),
            search: Some("bing".to_string()),
            ..RunArgs::default()
        };

        let err = handle_run(args, &Config::default(), &secrets, OutputFormat::Text)
            .await
            .unwrap_err();
        assert!(!err.is::<Reported>());
    }

    #[tokio::test]
    async fn test_doctor_lists_missing_serpapi_key_without_failing() {
        let secrets = SecretCache::new(vec![Box::new(StaticSource::new())]);
        let mut config = Config::default();
        config.search.provider = SearchProviderKind::SerpApi;
        config.publish.enabled = false;

        // No generation key, so the health probe is skipped and nothing hits the network
        assert!(handle_doctor(&config, &secrets, OutputFormat::Json).await.is_ok());
    }

    #[test]
    fn test_static_commands_succeed() {
        assert!(handle_graph(OutputFormat::Json).is_ok());
        assert!(handle_roster(OutputFormat::Text).is_ok());
    }
}
