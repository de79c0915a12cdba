//! Worker loop metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single worker loop
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    /// Jobs whose handler completed
    processed_count: AtomicU64,
    /// Jobs whose handler failed
    handler_failure_count: AtomicU64,
    /// Frames discarded as malformed
    discarded_count: AtomicU64,
    /// Envelopes refused by the allow-list
    rejected_count: AtomicU64,
    /// Outcome reports that failed to send
    notify_failure_count: AtomicU64,
}

impl WorkerMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get processed job count
    pub fn processed_count(&self) -> u64 {
        self.processed_count.load(Ordering::Relaxed)
    }

    /// Increment processed job count
    pub fn inc_processed_count(&self) {
        self.processed_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get handler failure count
    pub fn handler_failure_count(&self) -> u64 {
        self.handler_failure_count.load(Ordering::Relaxed)
    }

    /// Increment handler failure count
    pub fn inc_handler_failure_count(&self) {
        self.handler_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get discarded frame count
    pub fn discarded_count(&self) -> u64 {
        self.discarded_count.load(Ordering::Relaxed)
    }

    /// Increment discarded frame count
    pub fn inc_discarded_count(&self) {
        self.discarded_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get allow-list rejection count
    pub fn rejected_count(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }

    /// Increment allow-list rejection count
    pub fn inc_rejected_count(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get notify send failure count
    pub fn notify_failure_count(&self) -> u64 {
        self.notify_failure_count.load(Ordering::Relaxed)
    }

    /// Increment notify send failure count
    pub fn inc_notify_failure_count(&self) {
        self.notify_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> WorkerMetricsSnapshot {
        WorkerMetricsSnapshot {
            processed_count: self.processed_count(),
            handler_failure_count: self.handler_failure_count(),
            discarded_count: self.discarded_count(),
            rejected_count: self.rejected_count(),
            notify_failure_count: self.notify_failure_count(),
        }
    }
}

/// Snapshot of worker metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct WorkerMetricsSnapshot {
    pub processed_count: u64,
    pub handler_failure_count: u64,
    pub discarded_count: u64,
    pub rejected_count: u64,
    pub notify_failure_count: u64,
}
