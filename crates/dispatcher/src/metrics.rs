//! Destination metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single destination
#[derive(Debug, Default)]
pub struct DestinationMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Envelopes written by the sink
    sent_count: AtomicU64,
    /// Sink write failures
    failure_count: AtomicU64,
    /// Envelopes rejected because the queue was full
    dropped_count: AtomicU64,
    /// Completed sink flushes
    flush_count: AtomicU64,
}

impl DestinationMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::Relaxed)
    }

    pub fn inc_sent_count(&self) {
        self.sent_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::Relaxed)
    }

    pub fn inc_flush_count(&self) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            sent_count: self.sent_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
            flush_count: self.flush_count(),
        }
    }
}

/// Snapshot of destination metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub sent_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
    pub flush_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = DestinationMetrics::new();
        metrics.inc_sent_count();
        metrics.inc_sent_count();
        metrics.inc_dropped_count();
        metrics.inc_flush_count();
        metrics.set_queue_len(3);

        let snap = metrics.snapshot();
        assert_eq!(snap.sent_count, 2);
        assert_eq!(snap.dropped_count, 1);
        assert_eq!(snap.flush_count, 1);
        assert_eq!(snap.failure_count, 0);
        assert_eq!(snap.queue_len, 3);
    }
}
