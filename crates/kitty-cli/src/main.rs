//! Kitty CLI - check thread pool config payloads before publishing them
//!
//! Runs a local file through the same decode and bind pipeline the service
//! applies on every remote config refresh.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use kitty_core::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{check, config as config_cmd};
use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "kitty")]
#[command(author, version, about = "Kitty - live thread pool configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode and bind a payload file, reporting every rejected field
    Check(check::CheckArgs),

    /// Show the settings a fresh process starts with
    Defaults {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(config_cmd::ConfigCommands),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load()?;

    // Initialize logging based on verbosity
    let log_level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("kitty={log_level},kitty_core={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &cli.command {
        Commands::Check(args) => check::run(args, &config),
        Commands::Defaults { json } => show_defaults(*json),
        Commands::Config(cmd) => config_cmd::run(cmd, &config),
    }
}

fn show_defaults(json: bool) -> Result<()> {
    let settings = Settings::default();
    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        check::print_settings(&settings);
    }
    Ok(())
}
