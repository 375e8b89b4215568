//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Telemetry Splitter - routes error events and everything else to two destinations
#[derive(Parser, Debug)]
#[command(
    name = "telemetry-splitter",
    author,
    version,
    about = "Route telemetry envelopes to an error destination and a performance destination",
    long_about = "Reads newline-delimited JSON envelopes and forwards each one to exactly one \n\
                  destination: envelopes whose primary event is an error go to the primary \n\
                  destination, everything else goes to the secondary destination. The \n\
                  secondary address may come from SENTRY_PERFORMANCE_DSN or SENTRY_DSN."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TELEMETRY_SPLITTER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TELEMETRY_SPLITTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Route envelopes from a file or stdin
    Route(RouteArgs),

    /// Validate configuration and resolve the secondary destination
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `route` command
#[derive(Parser, Debug, Clone)]
pub struct RouteArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "splitter.toml",
        env = "TELEMETRY_SPLITTER_CONFIG"
    )]
    pub config: PathBuf,

    /// Newline-delimited JSON envelopes ("-" or omitted = stdin)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Explicit secondary destination; overrides the config and all fallbacks
    #[arg(long)]
    pub secondary_dsn: Option<String>,

    /// Flush timeout in milliseconds (overrides [flush].timeout_ms)
    #[arg(long, env = "TELEMETRY_SPLITTER_FLUSH_TIMEOUT_MS")]
    pub flush_timeout_ms: Option<u64>,

    /// Flush both destinations after this many envelopes (0 = only at the end)
    #[arg(long, default_value = "0")]
    pub flush_every: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TELEMETRY_SPLITTER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration, resolve destinations and exit
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "splitter.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "splitter.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route_args() {
        let cli = Cli::try_parse_from([
            "telemetry-splitter",
            "-v",
            "route",
            "--config",
            "custom.toml",
            "--input",
            "-",
            "--secondary-dsn",
            "https://perf@host/2",
            "--flush-timeout-ms",
            "250",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Route(args) => {
                assert_eq!(args.config, PathBuf::from("custom.toml"));
                assert_eq!(args.input, Some(PathBuf::from("-")));
                assert_eq!(args.secondary_dsn.as_deref(), Some("https://perf@host/2"));
                assert_eq!(args.flush_timeout_ms, Some(250));
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["telemetry-splitter", "-q", "-v", "info"]);
        assert!(result.is_err());
    }
}
