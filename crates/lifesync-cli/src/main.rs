//! LifeSync CLI - Command-line interface for LifeSync
//!
//! Provides commands for:
//! - Viewing, validating and editing the configuration
//! - Inspecting and clearing the locally persisted state
//! - Running a two-device replication demo against an in-memory remote

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lifesync_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{config::ConfigCommand, demo::DemoCommand, state::StateCommand};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "lifesync", version, about = "Local-first life organizer sync core")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Inspect or clear the locally persisted state
    #[command(subcommand)]
    State(StateCommand),
    /// Replicate edits between two simulated devices
    Demo(DemoCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    // Setup tracing: -v flags win over the configured level, RUST_LOG over both
    let filter = match cli.verbose {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_json_flag(cli.json);

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&config_path, format).await,
        Commands::State(cmd) => cmd.execute(&config, format).await,
        Commands::Demo(cmd) => cmd.execute(&config, format).await,
    }
}
