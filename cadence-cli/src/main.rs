//! Cadence CLI - headless driver for the rendering-performance engine
//!
//! Runs the engine against synthetic frame sources so thresholds and easing
//! curves can be inspected without a UI.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cadence::config::{default_config_path, EngineConfig};
use cadence::logging::{self, LogConfig, LogGuard};

use crate::commands::{config, scroll, simulate};
use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "cadence", version, about = "Adaptive rendering-performance engine")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Drive a synthetic frame source through the engine
    Simulate(simulate::SimulateArgs),

    /// Print the eased offset of a scroll animation per frame
    Scroll(scroll::ScrollArgs),

    /// Print the effective configuration as INI
    Config(config::ConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) -> Result<LogGuard, CliError> {
    let log_config = LogConfig {
        file: cli.log_file.clone(),
        ..LogConfig::with_verbosity(cli.verbose)
    };
    Ok(logging::init(&log_config)?)
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Simulate(args) => {
            let config = load_config(cli.config.as_deref())?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .map_err(CliError::Runtime)?;
            runtime.block_on(simulate::run(args, config))
        }
        Commands::Scroll(args) => {
            let config = load_config(cli.config.as_deref())?;
            scroll::run(args, &config)
        }
        Commands::Config(args) => {
            let path = args.path.or(cli.config).or_else(default_config_path);
            config::run(path.as_deref())
        }
    }
}

/// Load `path`, or the default location if it exists, or built-in defaults.
fn load_config(path: Option<&std::path::Path>) -> Result<EngineConfig, CliError> {
    match path {
        // An explicitly named file must exist.
        Some(path) => Ok(EngineConfig::load(path)?),
        None => match default_config_path() {
            Some(path) => Ok(EngineConfig::load_or_default(&path)?),
            None => Ok(EngineConfig::default()),
        },
    }
}
