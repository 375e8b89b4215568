//! `route` command implementation.

use anyhow::{Context, Result};
use contracts::{Dsn, RoutingBlueprint};
use dispatcher::{configured_fallbacks, DestinationResolver};
use tracing::{info, warn};

use crate::cli::RouteArgs;
use crate::error::CliError;
use crate::pipeline::{InputSource, Pipeline, PipelineConfig};

/// Execute the `route` command
pub async fn run_route(args: &RouteArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);

    info!(
        primary_sink = ?blueprint.primary.sink.sink_type,
        secondary_sink = ?blueprint.secondary.sink.sink_type,
        flush_timeout_ms = blueprint.flush.timeout_ms,
        "Configuration loaded"
    );

    // Dry run - resolve both destinations without starting them
    if args.dry_run {
        print_route_plan(&blueprint)?;
        info!("Dry run mode - configuration is valid, exiting");
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        input: InputSource::from_arg(args.input.as_ref()),
        flush_every: (args.flush_every != 0).then_some(args.flush_every),
    });

    info!("Starting pipeline...");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        primary = stats.routing.primary,
        secondary = stats.routing.secondary,
        rejected = stats.routing.rejected,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );
    stats.print_summary();

    if !stats.flush_errors.is_empty() {
        warn!(
            count = stats.flush_errors.len(),
            "Some envelopes may not have been delivered"
        );
    }

    info!("Telemetry Splitter finished");
    Ok(())
}

fn apply_overrides(blueprint: &mut RoutingBlueprint, args: &RouteArgs) {
    if let Some(ref dsn) = args.secondary_dsn {
        info!("Overriding secondary destination from CLI");
        blueprint.secondary.dsn = Some(dsn.clone());
    }
    if let Some(timeout_ms) = args.flush_timeout_ms {
        info!(timeout_ms, "Overriding flush timeout from CLI");
        blueprint.flush.timeout_ms = timeout_ms.max(1);
    }
}

/// Resolves to `()` on Ctrl+C or SIGTERM; never resolves if no handler installs
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print the resolved routing plan for dry-run mode
fn print_route_plan(blueprint: &RoutingBlueprint) -> Result<()> {
    let primary = Dsn::parse(&blueprint.primary.dsn)?;
    let fallbacks = configured_fallbacks(&blueprint.secondary);
    let (secondary, source) = DestinationResolver::default()
        .resolve_dsn(blueprint.secondary.dsn.as_deref(), fallbacks.as_deref())?;

    println!("\n=== Routing Plan ===\n");
    println!("Errors -> primary");
    println!("  DSN: {primary}");
    println!("  Sink: {:?}", blueprint.primary.sink.sink_type);
    println!("Everything else -> secondary");
    println!("  DSN: {secondary} ({source})");
    println!("  Sink: {:?}", blueprint.secondary.sink.sink_type);
    println!("\nFlush timeout: {}ms", blueprint.flush.timeout_ms);
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use config_loader::{ConfigFormat, ConfigLoader};

    use crate::cli::{Cli, Commands};

    fn route_args(extra: &[&str]) -> RouteArgs {
        let mut argv = vec!["telemetry-splitter", "route"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Route(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn blueprint() -> RoutingBlueprint {
        ConfigLoader::load_from_str(
            r#"
[primary]
dsn = "https://errors@ingest.example.com/1"

[secondary]
dsn = "https://perf@ingest.example.com/2"
"#,
            ConfigFormat::Toml,
        )
        .unwrap()
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let mut bp = blueprint();
        let args = route_args(&[
            "--secondary-dsn",
            "https://cli@ingest.example.com/3",
            "--flush-timeout-ms",
            "0",
        ]);

        apply_overrides(&mut bp, &args);

        assert_eq!(
            bp.secondary.dsn.as_deref(),
            Some("https://cli@ingest.example.com/3")
        );
        assert_eq!(bp.flush.timeout_ms, 1);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut bp = blueprint();
        apply_overrides(&mut bp, &route_args(&[]));
        assert_eq!(
            bp.secondary.dsn.as_deref(),
            Some("https://perf@ingest.example.com/2")
        );
        assert_eq!(bp.flush.timeout_ms, 2000);
    }

    #[tokio::test]
    async fn test_missing_config_is_reported() {
        let args = route_args(&["--config", "/nonexistent/splitter.toml"]);
        let err = run_route(&args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::ConfigNotFound { .. })
        ));
    }
}
