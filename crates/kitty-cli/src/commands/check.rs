//! Validate a payload through the same decode and bind pipeline the
//! service runs on every refresh

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use kitty_core::{
    BindResult, Binder, ConfigFormat, RawConfig, Refresher, Settings, SettingsTree,
};
use serde::Serialize;

use crate::config::CliConfig;

#[derive(Args)]
pub struct CheckArgs {
    /// Payload file to check
    pub file: PathBuf,

    /// Payload format (properties or yaml); inferred when omitted
    #[arg(short, long)]
    pub format: Option<ConfigFormat>,

    /// Override the root key prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport<'a> {
    file: &'a Path,
    format: ConfigFormat,
    result: &'a BindResult,
    settings: &'a Settings,
}

/// Outcome of binding one payload file onto a fresh tree.
struct Checked {
    format: ConfigFormat,
    result: BindResult,
    settings: Settings,
}

fn check_file(args: &CheckArgs, config: &CliConfig) -> Result<Checked> {
    let content = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let format = config.resolve_format(args.format, &args.file);
    let prefix = args.prefix.as_deref().unwrap_or(&config.root_prefix);

    let refresher = Refresher::with_binder(SettingsTree::shared(), Binder::new(prefix));
    let result = refresher
        .refresh(&RawConfig::new(format, content))
        .with_context(|| format!("Failed to decode {} as {format}", args.file.display()))?;

    Ok(Checked {
        format,
        result,
        settings: refresher.tree().snapshot(),
    })
}

pub fn run(args: &CheckArgs, config: &CliConfig) -> Result<()> {
    let Checked {
        format,
        result,
        settings,
    } = check_file(args, config)?;

    if args.json {
        let report = CheckReport {
            file: &args.file,
            format,
            result: &result,
            settings: &settings,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&args.file, format, &result, &settings);
    }

    if !result.is_clean() {
        bail!("{} binding error(s) in {}", result.errors.len(), args.file.display());
    }
    Ok(())
}

fn print_report(file: &Path, format: ConfigFormat, result: &BindResult, settings: &Settings) {
    println!("Checked {} ({format})", file.display());
    println!("Applied fields: {}", result.applied_field_count);

    if result.errors.is_empty() {
        println!("Errors: none");
    } else {
        println!("Errors:");
        for error in &result.errors {
            println!("  {error}");
        }
    }

    println!();
    print_settings(settings);
}

fn show(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

pub fn print_settings(settings: &Settings) {
    println!("Settings");
    println!("========");
    println!("  nacosDataId                   = {}", show(settings.nacos_data_id.as_deref()));
    println!("  nacosGroup                    = {}", show(settings.nacos_group.as_deref()));
    println!(
        "  nacosWaitRefreshConfigSeconds = {}",
        settings.nacos_wait_refresh_config_seconds
    );
    println!("  apolloNamespace               = {}", show(settings.apollo_namespace.as_deref()));
    println!("  alarmApiUrl                   = {}", show(settings.alarm_api_url.as_deref()));
    println!(
        "  accessToken                   = {}",
        show(settings.access_token.as_ref().map(|_| "***"))
    );
    println!(
        "  secret                        = {}",
        show(settings.secret.as_ref().map(|_| "***"))
    );
    println!("  alarmTimeInterval             = {}", settings.alarm_time_interval);
    println!("  owner                         = {}", show(settings.owner.as_deref()));

    println!();
    println!("Executors ({})", settings.executors.len());
    for (index, pool) in settings.executors.iter().enumerate() {
        println!(
            "  [{index}] {:<16} core={} max={} queue={} keepAlive={} reject={} threshold={}% fair={}",
            if pool.name.is_empty() { "-" } else { pool.name.as_str() },
            pool.core_size,
            pool.max_size,
            pool.queue_capacity,
            kitty_core::convert::format_duration(pool.keep_alive),
            pool.rejection_policy,
            pool.queue_capacity_threshold,
            pool.fair,
        );
    }
}
