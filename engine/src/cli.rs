//! CLI interface for Syllabus
//!
//! Commands and global flags, defined with clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Syllabus: a four-agent teaching team
///
/// Builds a learning package (knowledge base, roadmap, curated resources,
/// practice materials) for any topic and publishes each section as a
/// Google Doc.
#[derive(Parser, Debug)]
#[command(name = "syllabus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a learning package for a topic
    Run {
        /// What you want to learn
        topic: String,

        /// Model identifier for this run (overrides llm.model)
        #[arg(long, value_name = "MODEL")]
        model: Option<String>,

        /// Search provider for this run (duckduckgo, serpapi)
        #[arg(long, value_name = "PROVIDER")]
        search: Option<String>,

        /// Per-call timeout in seconds for generation, search and publish
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Save the report, one file per section and state.json.
        /// Without DIR, saves under core.output_dir
        #[arg(long, value_name = "DIR", num_args = 0..=1)]
        output: Option<Option<PathBuf>>,
    },

    /// Check configuration, credentials and provider reachability
    Doctor,

    /// Print the control-flow diagram (Mermaid)
    Graph,

    /// List the agents in routing order
    Roster,
}
