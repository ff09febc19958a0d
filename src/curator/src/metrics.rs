//! Curator Run Metrics
//!
//! Thread-safe counters for the operations issued during a run.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::planner::Action;

/// Thread-safe metrics for tracking curator operations
#[derive(Debug, Clone)]
pub struct CuratorMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Operations handed to the cluster client
    dispatched: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    /// Tasks finished without a cluster call (no-op or dry run)
    skipped: AtomicUsize,
    /// Operations that exceeded the per-operation timeout
    timeouts: AtomicUsize,
    settings_updates: AtomicUsize,
    closes: AtomicUsize,
    deletes: AtomicUsize,
    /// Time spent waiting on the cluster, in milliseconds
    total_duration_ms: AtomicU64,
}

impl Default for CuratorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CuratorMetrics {
    /// Create a new metrics tracker
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                dispatched: AtomicUsize::new(0),
                succeeded: AtomicUsize::new(0),
                failed: AtomicUsize::new(0),
                skipped: AtomicUsize::new(0),
                timeouts: AtomicUsize::new(0),
                settings_updates: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                deletes: AtomicUsize::new(0),
                total_duration_ms: AtomicU64::new(0),
            }),
        }
    }

    /// Record an operation being sent to the cluster
    pub fn record_dispatch(&self, action: &Action) {
        self.inner.dispatched.fetch_add(1, Ordering::Relaxed);
        let counter = match action {
            Action::Reallocate(_) => &self.inner.settings_updates,
            Action::Close => &self.inner.closes,
            Action::Delete => &self.inner.deletes,
            Action::None { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, duration: Duration) {
        self.inner.succeeded.fetch_add(1, Ordering::Relaxed);
        self.record_duration(duration);
    }

    pub fn record_failure(&self, duration: Duration) {
        self.inner.failed.fetch_add(1, Ordering::Relaxed);
        self.record_duration(duration);
    }

    pub fn record_timeout(&self) {
        self.inner.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self) {
        self.inner.skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn record_duration(&self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.inner
            .total_duration_ms
            .fetch_add(millis, Ordering::Relaxed);
    }

    pub fn dispatched(&self) -> usize {
        self.inner.dispatched.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> usize {
        self.inner.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.inner.failed.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> usize {
        self.inner.skipped.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> usize {
        self.inner.timeouts.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all counters
    pub fn summary(&self) -> MetricsSummary {
        let dispatched = self.dispatched();
        let total_duration_ms = self.inner.total_duration_ms.load(Ordering::Relaxed);
        let avg_duration_ms = if dispatched > 0 {
            total_duration_ms as f64 / dispatched as f64
        } else {
            0.0
        };

        MetricsSummary {
            dispatched,
            succeeded: self.succeeded(),
            failed: self.failed(),
            skipped: self.skipped(),
            timeouts: self.timeouts(),
            settings_updates: self.inner.settings_updates.load(Ordering::Relaxed),
            closes: self.inner.closes.load(Ordering::Relaxed),
            deletes: self.inner.deletes.load(Ordering::Relaxed),
            avg_duration_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub timeouts: usize,
    pub settings_updates: usize,
    pub closes: usize,
    pub deletes: usize,
    pub avg_duration_ms: f64,
}

impl MetricsSummary {
    /// Log the metrics summary
    pub fn log(&self) {
        tracing::info!("=== Curator Metrics Summary ===");
        tracing::info!(
            "Operations: {} dispatched, {} succeeded, {} failed ({} timed out), {} skipped",
            self.dispatched,
            self.succeeded,
            self.failed,
            self.timeouts,
            self.skipped
        );
        tracing::info!(
            "By kind: {} settings updates, {} closes, {} deletes",
            self.settings_updates,
            self.closes,
            self.deletes
        );
        tracing::info!("Average operation duration: {:.2}ms", self.avg_duration_ms);
    }
}
