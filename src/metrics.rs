//! Pipeline and per-operator metrics.
//!
//! Every counter has exactly one writer: operator counters and the
//! loop-side pipeline counters are written only by the processing thread,
//! submit-side counters only by producers. Readers take a point-in-time
//! [`MetricsSnapshot`] without stopping the pipeline; counters are read
//! individually, so a snapshot may be slightly inconsistent across fields.

use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A simple percentile tracker that maintains a sliding window of measurements
#[derive(Debug, Clone)]
pub struct PercentileTracker {
    measurements: Arc<Mutex<VecDeque<u64>>>,
    window_size: usize,
}

impl PercentileTracker {
    /// Create a new percentile tracker with a specified window size
    pub fn new(window_size: usize) -> Self {
        Self {
            measurements: Arc::new(Mutex::new(VecDeque::with_capacity(window_size))),
            window_size,
        }
    }

    /// Record a measurement (in nanoseconds)
    pub fn record(&self, nanos: u64) {
        let mut measurements = self.measurements.lock();
        if measurements.len() >= self.window_size {
            measurements.pop_front();
        }
        measurements.push_back(nanos);
    }

    /// Calculate the p50 (median) latency in microseconds
    pub fn p50_us(&self) -> f64 {
        self.percentile(0.50)
    }

    /// Calculate the p95 latency in microseconds
    pub fn p95_us(&self) -> f64 {
        self.percentile(0.95)
    }

    /// Calculate the p99 latency in microseconds
    pub fn p99_us(&self) -> f64 {
        self.percentile(0.99)
    }

    fn percentile(&self, p: f64) -> f64 {
        let mut sorted: Vec<_> = self.measurements.lock().iter().copied().collect();
        if sorted.is_empty() {
            return 0.0;
        }
        sorted.sort_unstable();

        let idx = ((sorted.len() as f64 * p).ceil() as usize).saturating_sub(1);
        sorted[idx] as f64 / 1000.0
    }

    /// Get the count of recorded measurements
    pub fn count(&self) -> usize {
        self.measurements.lock().len()
    }
}

/// Result of a single operator invocation, as seen by the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Dropped,
    Failed,
}

/// Counters owned by one operator.
///
/// Clones share the same counters, so the collector can read what the
/// processing loop writes.
#[derive(Debug, Clone)]
pub struct OperatorMetrics {
    name: Arc<str>,
    invocations: Arc<AtomicU64>,
    successes: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    total_nanos: Arc<AtomicU64>,
    latency_tracker: PercentileTracker,
}

impl OperatorMetrics {
    pub fn new(name: impl Into<Arc<str>>, latency_window: usize) -> Self {
        Self {
            name: name.into(),
            invocations: Arc::new(AtomicU64::new(0)),
            successes: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
            total_nanos: Arc::new(AtomicU64::new(0)),
            latency_tracker: PercentileTracker::new(latency_window),
        }
    }

    /// Record one invocation and its wall-clock duration
    pub fn record(&self, outcome: Outcome, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);

        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.latency_tracker.record(nanos);

        let counter = match outcome {
            Outcome::Passed => &self.successes,
            Outcome::Dropped => &self.dropped,
            Outcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Cumulative processing time across all invocations
    pub fn total_time(&self) -> Duration {
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> OperatorSnapshot {
        let invocations = self.invocations();
        let total_time = self.total_time();
        let avg_latency_us = if invocations == 0 {
            0.0
        } else {
            total_time.as_secs_f64() * 1_000_000.0 / invocations as f64
        };

        OperatorSnapshot {
            name: self.name.to_string(),
            invocations,
            successes: self.successes(),
            dropped: self.dropped(),
            failed: self.failed(),
            total_time,
            avg_latency_us,
            latency_p50_us: self.latency_tracker.p50_us(),
            latency_p95_us: self.latency_tracker.p95_us(),
            latency_p99_us: self.latency_tracker.p99_us(),
        }
    }
}

/// Pipeline-wide counters
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    submitted: AtomicU64,
    submit_rejected: AtomicU64,
    submit_waits: AtomicU64,
    ingested: AtomicU64,
    processed: AtomicU64,
    filtered: AtomicU64,
    failed: AtomicU64,
    output_waits: AtomicU64,
    undelivered: AtomicU64,
    started_at: Mutex<Option<Instant>>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mark_started(&self) {
        self.started_at.lock().get_or_insert_with(Instant::now);
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_submit_rejected(&self) {
        self.submit_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_submit_wait(&self) {
        self.submit_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ingested(&self) {
        self.ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_output_wait(&self) {
        self.output_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_undelivered(&self) {
        self.undelivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ingested(&self) -> u64 {
        self.ingested.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Time since the pipeline was started, zero if never started
    pub fn uptime(&self) -> Duration {
        let started_at = *self.started_at.lock();
        started_at.map(|started| started.elapsed()).unwrap_or_default()
    }

    pub fn snapshot(&self) -> PipelineCounters {
        let uptime = self.uptime();
        let processed = self.processed();
        let throughput_eps = if uptime.is_zero() {
            0.0
        } else {
            processed as f64 / uptime.as_secs_f64()
        };

        PipelineCounters {
            submitted: self.submitted.load(Ordering::Relaxed),
            submit_rejected: self.submit_rejected.load(Ordering::Relaxed),
            submit_waits: self.submit_waits.load(Ordering::Relaxed),
            ingested: self.ingested(),
            processed,
            filtered: self.filtered(),
            failed: self.failed(),
            output_waits: self.output_waits.load(Ordering::Relaxed),
            undelivered: self.undelivered.load(Ordering::Relaxed),
            throughput_eps,
            uptime,
        }
    }
}

/// Aggregates the pipeline counters and every registered operator's counters
#[derive(Debug, Default)]
pub struct MetricsCollector {
    pipeline: PipelineMetrics,
    operators: RwLock<Vec<OperatorMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipeline(&self) -> &PipelineMetrics {
        &self.pipeline
    }

    /// Register an operator's counters; order follows the chain
    pub(crate) fn register(&self, metrics: OperatorMetrics) {
        self.operators.write().push(metrics);
    }

    /// Look up an operator's counters by name
    pub fn operator(&self, name: &str) -> Option<OperatorMetrics> {
        self.operators
            .read()
            .iter()
            .find(|m| m.name() == name)
            .cloned()
    }

    /// Point-in-time copy of all counters. Queue gauges are left empty;
    /// the pipeline fills them in.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pipeline: self.pipeline.snapshot(),
            operators: self.operators.read().iter().map(|m| m.snapshot()).collect(),
            ingestion: QueueSnapshot::default(),
            output: QueueSnapshot::default(),
            saturated: false,
        }
    }
}

/// Snapshot of one operator's counters
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorSnapshot {
    pub name: String,
    pub invocations: u64,
    pub successes: u64,
    pub dropped: u64,
    pub failed: u64,
    pub total_time: Duration,
    pub avg_latency_us: f64,
    pub latency_p50_us: f64,
    pub latency_p95_us: f64,
    pub latency_p99_us: f64,
}

/// Snapshot of the pipeline-wide counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineCounters {
    /// Accepted by `submit`
    pub submitted: u64,
    /// `submit` calls that returned `QueueFull`
    pub submit_rejected: u64,
    /// `submit` calls that found the queue full and waited
    pub submit_waits: u64,
    /// Dequeued by the processing loop
    pub ingested: u64,
    /// Survived every operator and reached the output queue
    pub processed: u64,
    /// Dropped by an operator without error
    pub filtered: u64,
    /// Dropped because an operator failed
    pub failed: u64,
    /// Times the loop found the output queue full
    pub output_waits: u64,
    /// Completed the chain but abandoned at shutdown on a full output queue
    pub undelivered: u64,
    pub throughput_eps: f64,
    pub uptime: Duration,
}

/// Depth gauge of one queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub len: usize,
    pub capacity: usize,
}

/// A snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub pipeline: PipelineCounters,
    pub operators: Vec<OperatorSnapshot>,
    pub ingestion: QueueSnapshot,
    pub output: QueueSnapshot,
    /// Ingestion queue is above its high watermark
    pub saturated: bool,
}

impl MetricsSnapshot {
    /// Find an operator's snapshot by name
    pub fn operator(&self, name: &str) -> Option<&OperatorSnapshot> {
        self.operators.iter().find(|op| op.name == name)
    }

    /// Format metrics as a human-readable string
    pub fn format(&self) -> String {
        let p = &self.pipeline;
        let mut summary = format!(
            "Pipeline: Ingested: {}, Processed: {}, Filtered: {}, Failed: {}, \
             Rejected: {}, Undelivered: {}, Throughput: {:.2} ev/s, \
             Ingestion: {}/{}, Output: {}/{}{}\n",
            p.ingested,
            p.processed,
            p.filtered,
            p.failed,
            p.submit_rejected,
            p.undelivered,
            p.throughput_eps,
            self.ingestion.len,
            self.ingestion.capacity,
            self.output.len,
            self.output.capacity,
            if self.saturated { " (saturated)" } else { "" },
        );

        for (i, op) in self.operators.iter().enumerate() {
            let _ = writeln!(
                summary,
                "  Operator {} [{}]: Invocations: {}, Passed: {}, Dropped: {}, Failed: {}, \
                 Avg: {:.2}µs, P50: {:.2}µs, P95: {:.2}µs, P99: {:.2}µs",
                i,
                op.name,
                op.invocations,
                op.successes,
                op.dropped,
                op.failed,
                op.avg_latency_us,
                op.latency_p50_us,
                op.latency_p95_us,
                op.latency_p99_us,
            );
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_tracker() {
        let tracker = PercentileTracker::new(10);
        for i in 1..=10 {
            tracker.record(i * 1000);
        }
        assert_eq!(tracker.p50_us(), 5.0);
        assert_eq!(tracker.p99_us(), 10.0);
        assert_eq!(tracker.count(), 10);
    }

    #[test]
    fn test_percentile_window_slides() {
        let tracker = PercentileTracker::new(3);
        for nanos in [1_000, 2_000, 3_000, 100_000] {
            tracker.record(nanos);
        }
        assert_eq!(tracker.count(), 3);
        assert_eq!(tracker.p50_us(), 3.0);
    }

    #[test]
    fn test_operator_metrics() {
        let metrics = OperatorMetrics::new("filter", 16);
        metrics.record(Outcome::Passed, Duration::from_micros(2));
        metrics.record(Outcome::Dropped, Duration::from_micros(4));
        metrics.record(Outcome::Failed, Duration::from_micros(6));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.name, "filter");
        assert_eq!(snapshot.invocations, 3);
        assert_eq!(snapshot.successes, 1);
        assert_eq!(snapshot.dropped, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.total_time, Duration::from_micros(12));
        assert!((snapshot.avg_latency_us - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = OperatorMetrics::new("map", 4);
        let reader = metrics.clone();
        metrics.record(Outcome::Passed, Duration::ZERO);
        assert_eq!(reader.invocations(), 1);
    }

    #[test]
    fn test_collector_snapshot_order() {
        let collector = MetricsCollector::new();
        collector.register(OperatorMetrics::new("a", 4));
        collector.register(OperatorMetrics::new("b", 4));
        collector.pipeline().record_ingested();
        collector.pipeline().record_filtered();

        let snapshot = collector.snapshot();
        let names: Vec<_> = snapshot.operators.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(snapshot.pipeline.ingested, 1);
        assert_eq!(snapshot.pipeline.filtered, 1);
        assert!(snapshot.operator("b").is_some());
        assert!(collector.operator("missing").is_none());
    }

    #[test]
    fn test_uptime_zero_before_start() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.uptime(), Duration::ZERO);
        assert_eq!(metrics.snapshot().throughput_eps, 0.0);
    }

    #[test]
    fn test_format_mentions_operators() {
        let collector = MetricsCollector::new();
        collector.register(OperatorMetrics::new("amount_filter", 4));
        let text = collector.snapshot().format();
        assert!(text.contains("amount_filter"));
        assert!(text.starts_with("Pipeline:"));
    }
}
