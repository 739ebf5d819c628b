//! Configuration management commands

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::config::CliConfig;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective CLI configuration
    Show,
    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

pub fn run(cmd: &ConfigCommands, config: &CliConfig) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config),
        ConfigCommands::Init { force } => init(Path::new(CONFIG_FILE), *force),
    }
}

const CONFIG_FILE: &str = "kitty.toml";

const DEFAULT_CONFIG: &str = r#"# Kitty CLI configuration
# Environment variables override these values, e.g. KITTY__ROOT_PREFIX=app.pools

# Namespace the thread pool keys live under
root_prefix = "kitty.threadpools"

# trace, debug, info, warn or error
log_level = "info"

# properties or yaml; inferred from the file extension when unset
# default_format = "yaml"
"#;

fn show(config: &CliConfig) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    match CliConfig::find_config_file() {
        Some(path) => println!("Config file: {}\n", path.display()),
        None => println!("No configuration file found. Using defaults.\n"),
    }

    let rendered =
        toml::to_string_pretty(config).context("Failed to render configuration as TOML")?;
    println!("{rendered}");
    Ok(())
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    std::fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Configuration file created: {}", path.display());
    Ok(())
}
