use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use tibia_ops::api::ApiClient;
use tibia_ops::config::Config;
use tibia_ops::error::JobError;
use tibia_ops::jobs;
use tibia_ops::server::{self, AppState};

const USAGE: &str = "\
Usage: tibia-ops <command> [--configs <dir>] [--port <port>]

Commands:
  enemies   add unguilded killers of online enemy guild members to trolls.json
  guilds    refresh world_guilds_data.json, keeping old data on failure
  sanity    remove case-insensitive duplicates and fix name casing
  online    track who is online on each monitored world
  serve     run the Prometheus metrics server (/metrics, /health)";

async fn run(command: &str, config: Config) -> Result<(), JobError> {
    config.validate().map_err(JobError::Usage)?;
    let api = ApiClient::from_config(&config)?;

    match command {
        "enemies" => jobs::run_enemies(&config, &api).await.map(|_| ()),
        "guilds" => jobs::run_guilds(&config, &api).await.map(|_| ()),
        "sanity" => jobs::run_sanity(&config, &api).await.map(|_| ()),
        "online" => jobs::run_online(&config, &api).await.map(|_| ()),
        "serve" => {
            let state = AppState::new(config, Arc::new(api))?;
            server::serve(Arc::new(state)).await
        }
        other => Err(JobError::Usage(format!("unknown command: {other}\n\n{USAGE}"))),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(command) = std::env::args().nth(1) else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };
    if command == "-h" || command == "--help" {
        eprintln!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    match run(&command, Config::load()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
