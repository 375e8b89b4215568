//! Pipeline orchestrator - reads envelopes and drives the routing transport.

use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{Envelope, RoutingBlueprint};
use dispatcher::{configured_fallbacks, route_for, RoutingTransport, Transport};
use observability::{
    record_destination_metrics, record_envelope_received, record_flush, record_parse_failure,
    record_send_result, RoutingMetricsAggregator,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Where envelopes are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// `None` or `-` selects stdin
    pub fn from_arg(arg: Option<&PathBuf>) -> Self {
        match arg {
            Some(path) if path.as_os_str() != "-" => Self::File(path.clone()),
            _ => Self::Stdin,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Stdin => "stdin".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }

    async fn open(&self) -> Result<Box<dyn AsyncRead + Unpin + Send>, CliError> {
        match self {
            Self::Stdin => Ok(Box::new(tokio::io::stdin())),
            Self::File(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| CliError::input(self.describe(), e.to_string()))?;
                Ok(Box::new(file))
            }
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The routing blueprint configuration
    pub blueprint: RoutingBlueprint,

    /// Envelope input
    pub input: InputSource,

    /// Flush both destinations every N envelopes (None = only at the end)
    pub flush_every: Option<u64>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Route every envelope from the input, then flush and shut down.
    ///
    /// `shutdown` stops reading early; buffered envelopes are still flushed.
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        let fallbacks = configured_fallbacks(&blueprint.secondary);
        let mut transport = RoutingTransport::from_blueprint(blueprint, fallbacks.as_deref())
            .await
            .map_err(|e| CliError::setup(e.to_string()))?;

        info!(
            primary = %transport.primary().dsn(),
            secondary = %transport.secondary().dsn(),
            input = %self.config.input.describe(),
            "Destinations ready, routing envelopes"
        );

        let reader = self.config.input.open().await?;
        let mut segments = BufReader::new(reader).split(b'\n');
        let mut aggregator = RoutingMetricsAggregator::new();
        let mut interrupted = false;
        let mut read_error = None;
        let mut flush_errors = Vec::new();

        tokio::pin!(shutdown);
        loop {
            let segment = tokio::select! {
                segment = segments.next_segment() => segment,
                _ = &mut shutdown => {
                    warn!("Interrupted, flushing buffered envelopes");
                    interrupted = true;
                    break;
                }
            };
            let segment = match segment {
                Ok(Some(segment)) => segment,
                Ok(None) => break,
                Err(e) => {
                    // Stop reading; queued envelopes are still flushed below
                    warn!(error = %e, "Input read failed, flushing buffered envelopes");
                    read_error = Some(CliError::input(self.config.input.describe(), e.to_string()));
                    break;
                }
            };

            let Some(envelope) = parse_envelope(&segment) else {
                if !segment.trim_ascii().is_empty() {
                    record_parse_failure();
                    aggregator.record_parse_failure();
                }
                continue;
            };

            let (route, classification) = route_for(&envelope);
            let item_count = envelope.items.len();
            record_envelope_received(item_count);

            let result = transport.send(envelope).await;
            if let Err(e) = &result {
                warn!(route = route.as_str(), error = %e, "Envelope rejected");
            }
            record_send_result(route.as_str(), result.is_ok());
            aggregator.update(route.as_str(), &classification, item_count, result.is_ok());

            if let Some(every) = self.config.flush_every {
                if aggregator.total_envelopes % every == 0 {
                    debug!(envelopes = aggregator.total_envelopes, "Periodic flush");
                    if let Err(e) = flush(&mut transport, &mut aggregator).await {
                        flush_errors.push(e);
                    }
                }
            }
        }

        if let Err(e) = flush(&mut transport, &mut aggregator).await {
            flush_errors.push(e);
        }

        transport
            .shutdown()
            .await
            .map_err(|e| CliError::shutdown(e.to_string()))
            .context("Failed to shut down destinations")?;

        let primary = transport.primary().metrics().snapshot();
        let secondary = transport.secondary().metrics().snapshot();
        for (name, snap) in [("primary", &primary), ("secondary", &secondary)] {
            record_destination_metrics(
                name,
                snap.queue_len,
                snap.sent_count,
                snap.failure_count,
                snap.dropped_count,
            );
        }

        if let Some(e) = read_error {
            return Err(e.into());
        }

        Ok(PipelineStats {
            duration: start_time.elapsed(),
            routing: transport.stats(),
            primary,
            secondary,
            flush_errors,
            interrupted,
            metrics: aggregator,
        })
    }
}

/// One input line; `None` for blank, non-UTF-8 or malformed lines
fn parse_envelope(segment: &[u8]) -> Option<Envelope> {
    let line = segment.trim_ascii();
    if line.is_empty() {
        return None;
    }
    let line = match std::str::from_utf8(line) {
        Ok(line) => line,
        Err(e) => {
            warn!(error = %e, "Skipping non UTF-8 input line");
            return None;
        }
    };
    match serde_json::from_str(line) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            warn!(error = %e, "Skipping unparseable envelope");
            None
        }
    }
}

/// Flush both destinations and record the outcome; returns the error text
async fn flush<P: Transport, S: Transport>(
    transport: &mut RoutingTransport<P, S>,
    aggregator: &mut RoutingMetricsAggregator,
) -> Result<(), String> {
    let started = Instant::now();
    let result = transport.flush_default().await;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    record_flush(result.is_ok(), latency_ms);
    aggregator.record_flush_latency(latency_ms);

    result.map_err(|e| {
        warn!(error = %e, "Flush failed");
        e.to_string()
    })
}
