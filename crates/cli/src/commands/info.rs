//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::{Dsn, RoutingBlueprint, SinkConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    primary: DestinationInfo,
    secondary: DestinationInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback_env: Option<Vec<String>>,
    flush_timeout_ms: u64,
}

#[derive(Serialize)]
struct DestinationInfo {
    /// Redacted address, or a note on how it will be resolved
    dsn: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

impl DestinationInfo {
    fn new(dsn: String, sink: &SinkConfig) -> Self {
        Self {
            dsn,
            sink_type: format!("{:?}", sink.sink_type),
            queue_capacity: sink.queue_capacity,
            params: sink
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

/// Never exposes secret keys
fn redacted(raw: &str) -> String {
    Dsn::parse(raw)
        .map(|dsn| dsn.to_string())
        .unwrap_or_else(|_| "<invalid>".to_string())
}

fn build_config_info(blueprint: &RoutingBlueprint) -> ConfigInfo {
    let secondary_dsn = match blueprint.secondary.dsn.as_deref() {
        Some(dsn) if !dsn.trim().is_empty() => redacted(dsn),
        _ if blueprint.secondary.fallback_env.is_some() => "(from fallback_env)".to_string(),
        _ => "(unresolved)".to_string(),
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        primary: DestinationInfo::new(redacted(&blueprint.primary.dsn), &blueprint.primary.sink),
        secondary: DestinationInfo::new(secondary_dsn, &blueprint.secondary.sink),
        fallback_env: blueprint.secondary.fallback_env.clone(),
        flush_timeout_ms: blueprint.flush.timeout_ms,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║             Telemetry Splitter Configuration                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Version: {}", info.version);
    print_destination("Primary (errors)", &info.primary);
    print_destination("Secondary (everything else)", &info.secondary);

    if let Some(ref fallbacks) = info.fallback_env {
        println!("\nFallback sources ({})", fallbacks.len());
        for (i, name) in fallbacks.iter().enumerate() {
            let prefix = if i == fallbacks.len() - 1 { "└─" } else { "├─" };
            println!("   {} {}. {}", prefix, i + 1, name);
        }
    }

    println!("\nFlush timeout: {}ms", info.flush_timeout_ms);
    println!();
}

fn print_destination(title: &str, destination: &DestinationInfo) {
    println!("\n{title}");
    println!("   ├─ DSN: {}", destination.dsn);
    println!("   ├─ Sink: {}", destination.sink_type);
    if destination.params.is_empty() {
        println!("   └─ Queue capacity: {}", destination.queue_capacity);
    } else {
        println!("   ├─ Queue capacity: {}", destination.queue_capacity);
        println!("   └─ Params");
        let last = destination.params.len() - 1;
        for (i, (key, value)) in destination.params.iter().enumerate() {
            let prefix = if i == last { "└─" } else { "├─" };
            println!("         {prefix} {key} = {value}");
        }
    }
}
