//! Channel metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single channel endpoint
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    /// Current queue length (approximation)
    queue_len: AtomicUsize,
    /// Total frames accepted for delivery
    sent_count: AtomicU64,
    /// Total frames rejected because no peer was ready
    rejected_count: AtomicU64,
    /// Total frames dropped on a full per-peer queue
    dropped_count: AtomicU64,
    /// Total socket write failures
    failure_count: AtomicU64,
}

impl ChannelMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current queue length
    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    /// Set current queue length
    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get accepted frame count
    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::Relaxed)
    }

    /// Increment accepted frame count
    pub fn inc_sent_count(&self) {
        self.sent_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get rejected frame count
    pub fn rejected_count(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }

    /// Increment rejected frame count
    pub fn inc_rejected_count(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get dropped frame count
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Increment dropped frame count
    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get write failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment write failure count
    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> ChannelMetricsSnapshot {
        ChannelMetricsSnapshot {
            queue_len: self.queue_len(),
            sent_count: self.sent_count(),
            rejected_count: self.rejected_count(),
            dropped_count: self.dropped_count(),
            failure_count: self.failure_count(),
        }
    }
}

/// Snapshot of channel metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct ChannelMetricsSnapshot {
    pub queue_len: usize,
    pub sent_count: u64,
    pub rejected_count: u64,
    pub dropped_count: u64,
    pub failure_count: u64,
}
