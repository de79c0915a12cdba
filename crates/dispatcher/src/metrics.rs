//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single dispatcher
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Jobs accepted and sent
    pushed_count: AtomicU64,
    /// Jobs rejected by synchronous validation
    rejected_count: AtomicU64,
    /// Jobs whose send failed (record deleted)
    send_failure_count: AtomicU64,
    /// Notify outcomes finalized as SUCCESS
    notify_success_count: AtomicU64,
    /// Notify outcomes finalized as ERROR
    notify_error_count: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get pushed job count
    pub fn pushed_count(&self) -> u64 {
        self.pushed_count.load(Ordering::Relaxed)
    }

    /// Increment pushed job count
    pub fn inc_pushed_count(&self) {
        self.pushed_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get rejected job count
    pub fn rejected_count(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }

    /// Increment rejected job count
    pub fn inc_rejected_count(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get send failure count
    pub fn send_failure_count(&self) -> u64 {
        self.send_failure_count.load(Ordering::Relaxed)
    }

    /// Increment send failure count
    pub fn inc_send_failure_count(&self) {
        self.send_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get notify success count
    pub fn notify_success_count(&self) -> u64 {
        self.notify_success_count.load(Ordering::Relaxed)
    }

    /// Increment notify success count
    pub fn inc_notify_success_count(&self) {
        self.notify_success_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get notify error count
    pub fn notify_error_count(&self) -> u64 {
        self.notify_error_count.load(Ordering::Relaxed)
    }

    /// Increment notify error count
    pub fn inc_notify_error_count(&self) {
        self.notify_error_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            pushed_count: self.pushed_count(),
            rejected_count: self.rejected_count(),
            send_failure_count: self.send_failure_count(),
            notify_success_count: self.notify_success_count(),
            notify_error_count: self.notify_error_count(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct DispatchMetricsSnapshot {
    pub pushed_count: u64,
    pub rejected_count: u64,
    pub send_failure_count: u64,
    pub notify_success_count: u64,
    pub notify_error_count: u64,
}
