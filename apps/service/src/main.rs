use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

mod config;
mod database;
mod monitoring;
mod orchestrator;
mod pool;

use config::Config;
use database::{CheckStore, ResultStore};
use monitoring::Check;
use monitoring::validation::validate_check;
use orchestrator::Orchestrator;

#[derive(Debug, Parser)]
#[command(name = "downwatch", version, about = "Synthetic uptime monitoring engine")]
struct Cli {
    /// Path to the config file (defaults to $XDG_CONFIG_HOME/downwatch/config.toml)
    #[arg(short, long, env = "DOWNWATCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the scheduler until interrupted (default)
    Run,
    /// Print the effective configuration
    Config,
    /// Insert or update checks from a JSON file (one check or an array)
    Import { file: PathBuf },
    /// Probe one stored check from all of its regions and print the outcomes
    Probe { check_id: Uuid },
    /// Show the most recent stored outcomes of a check
    History {
        check_id: Uuid,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_config(cli.config.as_ref()).context("Failed to load configuration")?;
    logger::init_with(&config.logging.level, logger::LogFormat::from_name(&config.logging.format));

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Config => {
            println!("{config}");
            Ok(())
        }
        Command::Import { file } => import(config, file).await,
        Command::Probe { check_id } => {
            let orchestrator = open(&config).await?;
            let outcomes = orchestrator.probe_once(check_id).await?;
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
            Ok(())
        }
        Command::History { check_id, limit } => {
            let orchestrator = open(&config).await?;
            for row in orchestrator.results().recent_logs(check_id, limit).await? {
                println!(
                    "{}  {:<12} {:<4} {:>3} {:>6}ms {}",
                    row.checked_at.to_rfc3339(),
                    row.region,
                    if row.is_up { "up" } else { "down" },
                    row.status_code,
                    row.response_time_ms,
                    row.error.unwrap_or_default()
                );
            }
            Ok(())
        }
    }
}

async fn open(config: &Config) -> Result<Orchestrator> {
    let pool = pool::open_pool(&config.database.path).await?;
    Orchestrator::new(config, pool).await
}

async fn run(config: Config) -> Result<()> {
    let shutdown = CancellationToken::new();

    let token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => error!("Failed to listen for shutdown signal: {e}"),
        }
        token.cancel();
    });

    let pool = pool::open_pool(&config.database.path).await?;
    Orchestrator::start(config, pool, shutdown).await
}

async fn import(config: Config, file: PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let checks = parse_checks(&raw)?;

    let orchestrator = open(&config).await?;
    let store = orchestrator.checks();

    for check in &checks {
        if let Err(e) = validate_check(check, config.validation.deny_private_targets) {
            error!(check_id = %check.id, "Check will be skipped by the scheduler: {e:#}");
        }
        store.save_check(check).await?;
        info!(check_id = %check.id, target = %check.target, "Imported check");
    }

    println!("Imported {} check(s)", checks.len());
    Ok(())
}

/// Accept a single check object or an array of them
fn parse_checks(raw: &str) -> Result<Vec<Check>> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let checks = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(checks)
}
