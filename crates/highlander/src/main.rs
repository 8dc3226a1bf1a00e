//! # HIGHLANDER Operator CLI
//!
//! Headless stand-in for a control panel: it only ever calls
//! start / pause / resume / stop and reads snapshots.
//!
//! ## Commands
//!
//! - `highlander run` - run a population, printing a consistent report every
//!   check interval
//! - `highlander blacklist` - scan simulated blacklist servers for a host

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod commands;

use commands::{BlacklistArgs, RunArgs};

/// HIGHLANDER - immortals fighting under a global pause barrier
#[derive(Parser)]
#[command(name = "highlander")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a population of immortals
    #[command(name = "run")]
    Run(RunArgs),

    /// Check a host against simulated blacklist servers
    #[command(name = "blacklist")]
    Blacklist(BlacklistArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(&args),
        Commands::Blacklist(args) => commands::blacklist::execute(&args),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();

    Ok(())
}
