// Syllabus
// Main entry point for the syllabus binary

use clap::Parser;
use syllabus_engine::cli::{Cli, Command};
use syllabus_engine::config::Config;
use syllabus_engine::handlers::{
    handle_doctor, handle_graph, handle_roster, handle_run, OutputFormat, Reported, RunArgs,
};
use syllabus_engine::secrets::SecretCache;
use syllabus_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A local .env is optional
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let mut config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };
    config.apply_env_overrides();

    if let Some(level) = &cli.log {
        config.core.log_level = level.clone();
    }
    config.validate()?;

    // RUST_LOG, when set, wins over the configured level
    init_telemetry_with_level(&config.core.log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Syllabus v{} ({} - {})", version, commit, timestamp);

    let secrets = SecretCache::from_env_and_keyring();

    let result = match cli.command {
        Command::Run {
            topic,
            model,
            search,
            timeout,
            output,
        } => {
            let args = RunArgs {
                topic,
                model,
                search,
                timeout,
                output,
            };
            handle_run(args, &config, &secrets, format).await
        }

        Command::Doctor => handle_doctor(&config, &secrets, format).await,

        Command::Graph => handle_graph(format),

        Command::Roster => handle_roster(format),
    };

    match result {
        Err(e) if e.is::<Reported>() => std::process::exit(1),
        other => other,
    }
}
