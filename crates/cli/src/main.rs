//! Ambit CLI — the main entry point.
//!
//! Commands:
//! - `run`       Start the batcher and the proactive loop
//! - `complete`  One-shot completion against the backend
//! - `dispatch`  Execute one operation string against the tool service
//! - `parse`     Show how an operation string is parsed
//! - `init`      Write the default config file

use ambit_config::{AppConfig, ConfigError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "ambit",
    about = "Ambit — a proactive assistant loop over desktop activity",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.ambit/config.toml
    #[arg(short, long, global = true, env = "AMBIT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read activity from stdin and run the proactive loop
    Run {
        /// Override the flush interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Send a single prompt to the completion backend
    Complete {
        prompt: String,
    },

    /// Execute an operation string, e.g. "search&query=rust"
    Dispatch {
        operation: String,

        /// Serialized observation passed to the handler
        #[arg(short, long, default_value = "{}")]
        event: String,
    },

    /// Parse an operation string without executing it
    Parse {
        operation: String,
    },

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // `init` and `parse` never read the config.
    let config = match &cli.command {
        Commands::Init { .. } | Commands::Parse { .. } => None,
        _ => Some(AppConfig::load_at(cli.config.as_deref())),
    };

    // Initialize tracing
    let filter = match (&config, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Some(Ok(config)), false) => config.logging.level.clone(),
        _ => "info".to_string(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { interval } => commands::run::run(require(config)?, interval).await?,
        Commands::Complete { prompt } => commands::complete::run(require(config)?, &prompt).await?,
        Commands::Dispatch { operation, event } => {
            commands::dispatch::run(require(config)?, &operation, event).await?
        }
        Commands::Parse { operation } => commands::parse::run(&operation)?,
        Commands::Init { force } => commands::init::run(cli.config, force)?,
    }

    Ok(())
}

fn require(
    loaded: Option<Result<AppConfig, ConfigError>>,
) -> Result<AppConfig, Box<dyn std::error::Error>> {
    match loaded {
        Some(Ok(config)) => Ok(config),
        Some(Err(e)) => Err(format!("Failed to load config: {e}").into()),
        None => Err("config was not loaded".into()),
    }
}
