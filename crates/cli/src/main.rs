//! # Telemetry Splitter CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 次要目的地解析
//! - 信封路由、刷新与优雅关闭

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::{LogFormat, ObservabilityConfig};
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_route, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before parsing so fallback variables can live there
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging based on CLI options
    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry Splitter starting"
    );

    // Execute command
    let result = match &cli.command {
        Commands::Route(args) => run_route(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let log_format = match cli.log_format {
        cli::LogFormat::Json => LogFormat::Json,
        cli::LogFormat::Pretty => LogFormat::Pretty,
        cli::LogFormat::Compact => LogFormat::Compact,
    };

    // Metrics are installed by `route` once its port is known
    observability::init_with_config(ObservabilityConfig::from_verbosity(
        cli.verbose,
        cli.quiet,
        log_format,
    ))
}
