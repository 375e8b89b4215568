//! Pipeline statistics and metrics.

use std::time::Duration;

use dispatcher::{MetricsSnapshot, RoutingStats};
use observability::RoutingMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Per-route counts kept by the routing transport
    pub routing: RoutingStats,

    /// Primary destination worker counters after shutdown
    pub primary: MetricsSnapshot,

    /// Secondary destination worker counters after shutdown
    pub secondary: MetricsSnapshot,

    /// Flushes that did not complete cleanly
    pub flush_errors: Vec<String>,

    /// Reading stopped early on a shutdown signal
    pub interrupted: bool,

    /// Routing metrics aggregator
    pub metrics: RoutingMetricsAggregator,
}

impl PipelineStats {
    /// Envelopes routed per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.routing.total() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Routing Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Envelopes routed: {}", self.routing.total());
        println!("   ├─ Throughput: {:.2}/s", self.throughput());
        println!("   ├─ Unparseable lines: {}", self.metrics.parse_failures);
        println!("   └─ Interrupted: {}", if self.interrupted { "yes" } else { "no" });

        println!("\nRoutes");
        println!("   ├─ primary (errors): {}", self.routing.primary);
        println!("   ├─ secondary (other): {}", self.routing.secondary);
        println!("   └─ rejected: {}", self.routing.rejected);

        println!("\nDestinations");
        print_destination("primary", &self.primary, false);
        print_destination("secondary", &self.secondary, true);

        let summary = self.metrics.summary();
        if !summary.classification_counts.is_empty() {
            println!("\nClassifications");
            let last = summary.classification_counts.len() - 1;
            for (i, (classification, count)) in summary.classification_counts.iter().enumerate() {
                let branch = if i == last { "└─" } else { "├─" };
                println!("   {branch} {classification}: {count}");
            }
        }

        println!("\nFlush latency (ms): {}", summary.flush_latency_ms);
        if !self.flush_errors.is_empty() {
            println!("\nFlush errors");
            for error in &self.flush_errors {
                println!("   ├─ {error}");
            }
        }

        println!();
    }
}

fn print_destination(name: &str, snapshot: &MetricsSnapshot, last: bool) {
    let (branch, indent) = if last { ("└─", " ") } else { ("├─", "│") };
    println!("   {branch} {name}");
    println!(
        "   {indent}    sent={} failed={} dropped={} flushes={}",
        snapshot.sent_count, snapshot.failure_count, snapshot.dropped_count, snapshot.flush_count
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput() {
        let stats = PipelineStats {
            duration: Duration::from_secs(2),
            routing: RoutingStats {
                primary: 3,
                secondary: 5,
                rejected: 2,
            },
            ..Default::default()
        };
        assert!((stats.throughput() - 5.0).abs() < 1e-10);
        assert_eq!(PipelineStats::default().throughput(), 0.0);
    }
}
