//! Pipeline metrics.
//!
//! Counters are bumped per chunk or per file, never per row, so workers do
//! not contend on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 10ms, 100ms, 1s, 10s, 60s, +inf
    buckets: [AtomicU64; 7],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 6] = [1, 10, 100, 1_000, 10_000, 60_000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let slot = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len());
        self.buckets[slot].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }
}

/// Collected metrics for the billing aggregator.
#[derive(Debug, Default)]
pub struct Metrics {
    // Archive metrics
    pub archives_processed: Counter,
    pub archives_failed: Counter,
    pub files_processed: Counter,
    pub files_skipped: Counter,

    // Row metrics
    pub chunks_processed: Counter,
    pub rows_aggregated: Counter,
    pub rows_skipped: Counter,
    pub cost_parse_errors: Counter,
    pub worker_failures: Counter,

    // Store metrics
    pub aggregates_persisted: Counter,
    pub persist_errors: Counter,
    pub persist_latency_ms: Histogram,

    // Gauges
    pub active_workers: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            archives_processed: self.archives_processed.get(),
            archives_failed: self.archives_failed.get(),
            files_processed: self.files_processed.get(),
            files_skipped: self.files_skipped.get(),
            chunks_processed: self.chunks_processed.get(),
            rows_aggregated: self.rows_aggregated.get(),
            rows_skipped: self.rows_skipped.get(),
            cost_parse_errors: self.cost_parse_errors.get(),
            worker_failures: self.worker_failures.get(),
            aggregates_persisted: self.aggregates_persisted.get(),
            persist_errors: self.persist_errors.get(),
            persist_latency_mean_ms: self.persist_latency_ms.mean(),
            active_workers: self.active_workers.get(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub archives_processed: u64,
    pub archives_failed: u64,
    pub files_processed: u64,
    pub files_skipped: u64,
    pub chunks_processed: u64,
    pub rows_aggregated: u64,
    pub rows_skipped: u64,
    pub cost_parse_errors: u64,
    pub worker_failures: u64,
    pub aggregates_persisted: u64,
    pub persist_errors: u64,
    pub persist_latency_mean_ms: f64,
    pub active_workers: u64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_buckets_and_mean() {
        let hist = Histogram::new();
        hist.observe(0);
        hist.observe(50);
        hist.observe(120_000);

        assert_eq!(hist.count(), 3);
        assert_eq!(hist.sum(), 120_050);
        assert_eq!(hist.buckets[0].load(Ordering::Relaxed), 1);
        assert_eq!(hist.buckets[2].load(Ordering::Relaxed), 1);
        assert_eq!(hist.buckets[6].load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_snapshot_reads_counters() {
        let metrics = Metrics::new();
        metrics.rows_aggregated.inc_by(7);
        metrics.archives_failed.inc();
        metrics.active_workers.inc();
        metrics.active_workers.inc();
        metrics.active_workers.dec();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rows_aggregated, 7);
        assert_eq!(snapshot.archives_failed, 1);
        assert_eq!(snapshot.active_workers, 1);
    }
}
