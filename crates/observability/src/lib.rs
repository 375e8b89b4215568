//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)，日志统一写入 stderr
//! - 命令行冗长度 (-v / -q) 到日志级别的映射
//! - Prometheus 指标导出 (可选端口)
//! - 路由统计聚合与摘要输出
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{LogFormat, ObservabilityConfig};
//!
//! observability::init_with_config(ObservabilityConfig::from_verbosity(1, false, LogFormat::Compact))?;
//!
//! let (route, classification) = dispatcher::route_for(&envelope);
//! observability::record_envelope_received(envelope.items.len());
//! ```

pub mod metrics;

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-exports
pub use crate::metrics::{
    record_destination_metrics, record_envelope_received, record_flush, record_parse_failure,
    record_send_result, MetricsSummary, RoutingMetricsAggregator, RunningStats, StatsSummary,
};

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// 默认日志级别
    pub default_log_level: String,
    /// 是否优先使用 RUST_LOG
    pub respect_env_filter: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: None,
            default_log_level: "info".to_string(),
            respect_env_filter: true,
        }
    }
}

impl ObservabilityConfig {
    /// 由命令行参数推导配置
    ///
    /// `quiet` 时只输出 warn 及以上，并忽略 RUST_LOG。
    pub fn from_verbosity(verbose: u8, quiet: bool, log_format: LogFormat) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        Self {
            log_format,
            metrics_port: None,
            default_log_level: level.to_string(),
            respect_env_filter: !quiet,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        if self.respect_env_filter {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
        } else {
            EnvFilter::new(&self.default_log_level)
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 使用自定义配置初始化
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = config.env_filter();

    // stdout carries command output
    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };
    result.context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        level = %config.default_log_level,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
///
/// 用于日志已初始化、端口稍后才确定的场景 (如 `route --metrics-port`)。
pub fn init_metrics_only(port: u16) -> Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on {addr}"))?;

    tracing::info!(%addr, "Prometheus metrics endpoint initialized");
    Ok(())
}
