//! Tidal daemon: entry point for running chains.

mod scenario;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tidal_node::ChainConfig;
use tidal_utils::{init_logging, LogFormat};

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "tidal-daemon", about = "Tidal interest-accruing ledger daemon")]
struct Cli {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "TIDAL_LOG_LEVEL")]
    log_level: String,

    /// Log format: "human" or "json".
    #[arg(long, default_value = "human", env = "TIDAL_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run a scripted multi-chain scenario and print the final state as JSON.
    Simulate {
        /// Path to the scenario TOML file.
        #[arg(long, env = "TIDAL_SCENARIO")]
        scenario: PathBuf,

        /// Deliver every bridge frame twice, overriding the scenario file.
        #[arg(long)]
        duplicate_frames: bool,
    },

    /// Print a default chain configuration as TOML.
    DefaultConfig {
        #[arg(long, default_value_t = 1)]
        chain_id: u64,
    },

    /// Parse and validate a chain configuration file.
    CheckConfig {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level);

    match cli.command {
        Command::Simulate {
            scenario,
            duplicate_frames,
        } => {
            let mut loaded = Scenario::from_toml_file(&scenario)?;
            loaded.duplicate_frames |= duplicate_frames;
            tracing::info!(
                path = %scenario.display(),
                chains = loaded.chains.len(),
                steps = loaded.steps.len(),
                "running scenario"
            );
            let report = crate::scenario::run(loaded).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::DefaultConfig { chain_id } => {
            let config = ChainConfig {
                chain_id,
                ..ChainConfig::default()
            };
            print!("{}", config.to_toml_string()?);
        }
        Command::CheckConfig { path } => {
            let config = ChainConfig::from_toml_file(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            tracing::info!(chain = %config.chain(), name = %config.name, "configuration is valid");
            println!("{} ({}): ok", config.name, config.chain());
        }
    }
    Ok(())
}
