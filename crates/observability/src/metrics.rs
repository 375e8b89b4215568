//! 路由指标收集模块
//!
//! 记录信封接收、路由结果、刷新耗时与各目的地队列状态。

use std::collections::BTreeMap;

use contracts::EventClassification;
use metrics::{counter, gauge, histogram};

/// 记录从输入读取到的信封
pub fn record_envelope_received(item_count: usize) {
    counter!("telemetry_splitter_envelopes_received_total").increment(1);
    histogram!("telemetry_splitter_envelope_items").record(item_count as f64);
}

/// 记录无法解析的输入行
pub fn record_parse_failure() {
    counter!("telemetry_splitter_parse_failures_total").increment(1);
}

/// 记录目的地接收结果
pub fn record_send_result(destination: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "telemetry_splitter_envelopes_sent_total",
        "destination" => destination.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录一次刷新 (双目的地合并结果)
pub fn record_flush(success: bool, latency_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!("telemetry_splitter_flushes_total", "status" => status).increment(1);
    histogram!("telemetry_splitter_flush_latency_ms").record(latency_ms);
}

/// 记录目的地队列与投递计数
pub fn record_destination_metrics(
    destination: &str,
    queue_len: usize,
    sent: u64,
    failed: u64,
    dropped: u64,
) {
    let destination = destination.to_string();
    gauge!("telemetry_splitter_queue_depth", "destination" => destination.clone())
        .set(queue_len as f64);
    gauge!("telemetry_splitter_sink_writes", "destination" => destination.clone())
        .set(sent as f64);
    gauge!("telemetry_splitter_sink_failures", "destination" => destination.clone())
        .set(failed as f64);
    gauge!("telemetry_splitter_envelopes_dropped", "destination" => destination)
        .set(dropped as f64);
}

/// 路由指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RoutingMetricsAggregator {
    /// 信封总数
    pub total_envelopes: u64,

    /// 被目的地拒绝的信封数
    pub total_rejected: u64,

    /// 无法解析的输入行
    pub parse_failures: u64,

    /// 各路由接收数
    pub route_counts: BTreeMap<String, u64>,

    /// 各分类计数
    pub classification_counts: BTreeMap<String, u64>,

    /// 每个信封的条目数统计
    pub item_stats: RunningStats,

    /// 刷新耗时统计 (毫秒)
    pub flush_stats: RunningStats,
}

impl RoutingMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(
        &mut self,
        route: &str,
        classification: &EventClassification,
        item_count: usize,
        accepted: bool,
    ) {
        self.total_envelopes += 1;
        if accepted {
            *self.route_counts.entry(route.to_string()).or_insert(0) += 1;
        } else {
            self.total_rejected += 1;
        }
        *self
            .classification_counts
            .entry(classification.as_str().to_string())
            .or_insert(0) += 1;
        self.item_stats.push(item_count as f64);
    }

    pub fn record_parse_failure(&mut self) {
        self.parse_failures += 1;
    }

    pub fn record_flush_latency(&mut self, latency_ms: f64) {
        self.flush_stats.push(latency_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_envelopes: self.total_envelopes,
            total_rejected: self.total_rejected,
            parse_failures: self.parse_failures,
            reject_rate: if self.total_envelopes > 0 {
                self.total_rejected as f64 / self.total_envelopes as f64 * 100.0
            } else {
                0.0
            },
            route_counts: self.route_counts.clone(),
            classification_counts: self.classification_counts.clone(),
            items_per_envelope: StatsSummary::from(&self.item_stats),
            flush_latency_ms: StatsSummary::from(&self.flush_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_envelopes: u64,
    pub total_rejected: u64,
    pub parse_failures: u64,
    pub reject_rate: f64,
    pub route_counts: BTreeMap<String, u64>,
    pub classification_counts: BTreeMap<String, u64>,
    pub items_per_envelope: StatsSummary,
    pub flush_latency_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Routing Summary ===")?;
        writeln!(f, "Total envelopes: {}", self.total_envelopes)?;
        writeln!(
            f,
            "Rejected: {} ({:.2}%)",
            self.total_rejected, self.reject_rate
        )?;
        writeln!(f, "Unparseable lines: {}", self.parse_failures)?;

        if !self.route_counts.is_empty() {
            writeln!(f, "Delivered per destination:")?;
            for (route, count) in &self.route_counts {
                writeln!(f, "  {route}: {count}")?;
            }
        }
        if !self.classification_counts.is_empty() {
            writeln!(f, "Classifications:")?;
            for (classification, count) in &self.classification_counts {
                writeln!(f, "  {classification}: {count}")?;
            }
        }

        writeln!(f, "Items per envelope: {}", self.items_per_envelope)?;
        writeln!(f, "Flush latency (ms): {}", self.flush_latency_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = RoutingMetricsAggregator::new();

        aggregator.update("primary", &EventClassification::Error, 2, true);
        aggregator.update(
            "secondary",
            &EventClassification::Other("transaction".into()),
            1,
            true,
        );
        aggregator.update("secondary", &EventClassification::Unclassified, 1, false);
        aggregator.record_parse_failure();

        assert_eq!(aggregator.total_envelopes, 3);
        assert_eq!(aggregator.total_rejected, 1);
        assert_eq!(aggregator.parse_failures, 1);
        assert_eq!(aggregator.route_counts.get("primary"), Some(&1));
        assert_eq!(aggregator.route_counts.get("secondary"), Some(&1));
        assert_eq!(aggregator.classification_counts.get("transaction"), Some(&1));
        assert_eq!(aggregator.classification_counts.get("unclassified"), Some(&1));
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = RoutingMetricsAggregator::new();
        aggregator.update("primary", &EventClassification::Error, 1, true);
        aggregator.update("secondary", &EventClassification::Unclassified, 1, false);
        aggregator.record_flush_latency(12.5);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Total envelopes: 2"));
        assert!(output.contains("50.00%"));
        assert!(output.contains("primary: 1"));
        assert!(output.contains("n=1"));
    }
}
