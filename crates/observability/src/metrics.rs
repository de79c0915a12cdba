//! Dispatch metrics collection
//!
//! Prometheus recording helpers plus an in-memory aggregator for end-of-run
//! summaries.

use metrics::{counter, gauge, histogram};

/// Record a job accepted by the push path
pub fn record_job_pushed(worker: &str, tracked: bool) {
    counter!(
        "jobq_jobs_pushed_total",
        "worker" => worker.to_string(),
        "tracked" => if tracked { "true" } else { "false" }
    )
    .increment(1);
}

/// Record a job refused by the fanout send (no ready peer / full queues)
pub fn record_job_dropped(worker: &str) {
    counter!(
        "jobq_jobs_dropped_total",
        "worker" => worker.to_string()
    )
    .increment(1);
}

/// Record a frame discarded as malformed
pub fn record_job_discarded(reason: &str) {
    counter!(
        "jobq_frames_discarded_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a completed job on the worker side
pub fn record_job_completed(worker: &str, success: bool, latency_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "jobq_jobs_completed_total",
        "worker" => worker.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "jobq_handler_latency_ms",
        "worker" => worker.to_string()
    )
    .record(latency_ms);
}

/// Record a finalized notify outcome on the manager side
pub fn record_notify_outcome(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        "jobq_notify_outcomes_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record the connected worker count
pub fn record_peer_count(count: usize) {
    gauge!("jobq_connected_workers").set(count as f64);
}

/// Dispatch statistics aggregator
///
/// Aggregates in memory for summaries, independent of the Prometheus
/// exporter.
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// Total jobs pushed
    pub total_pushed: u64,

    /// Total jobs completed successfully
    pub total_succeeded: u64,

    /// Total jobs that failed in their handler
    pub total_failed: u64,

    /// Total frames refused or discarded in transit
    pub total_dropped: u64,

    /// Handler latency statistics
    pub latency_stats: RunningStats,

    /// Per-capability completion counts
    pub worker_counts: std::collections::HashMap<String, u64>,
}

impl DispatchStatsAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pushed job
    pub fn record_pushed(&mut self) {
        self.total_pushed += 1;
    }

    /// Record a dropped frame
    pub fn record_dropped(&mut self) {
        self.total_dropped += 1;
    }

    /// Record a completed job
    pub fn record_completed(&mut self, worker: &str, success: bool, latency_ms: f64) {
        if success {
            self.total_succeeded += 1;
        } else {
            self.total_failed += 1;
        }
        self.latency_stats.push(latency_ms);
        *self.worker_counts.entry(worker.to_string()).or_insert(0) += 1;
    }

    /// Produce a summary report
    pub fn summary(&self) -> DispatchSummary {
        let completed = self.total_succeeded + self.total_failed;
        DispatchSummary {
            total_pushed: self.total_pushed,
            total_succeeded: self.total_succeeded,
            total_failed: self.total_failed,
            total_dropped: self.total_dropped,
            failure_rate: if completed > 0 {
                self.total_failed as f64 / completed as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            worker_counts: self.worker_counts.clone(),
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Dispatch summary
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total_pushed: u64,
    pub total_succeeded: u64,
    pub total_failed: u64,
    pub total_dropped: u64,
    pub failure_rate: f64,
    pub latency_ms: StatsSummary,
    pub worker_counts: std::collections::HashMap<String, u64>,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Jobs pushed: {}", self.total_pushed)?;
        writeln!(f, "Jobs succeeded: {}", self.total_succeeded)?;
        writeln!(
            f,
            "Jobs failed: {} ({:.2}%)",
            self.total_failed, self.failure_rate
        )?;
        writeln!(f, "Frames dropped: {}", self.total_dropped)?;
        writeln!(f, "Handler latency (ms): {}", self.latency_ms)?;

        if !self.worker_counts.is_empty() {
            writeln!(f, "Completions per capability:")?;
            for (worker, count) in &self.worker_counts {
                writeln!(f, "  {}: {}", worker, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
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
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
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

/// Online statistics calculator (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Push a new value
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

    /// Sample count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Maximum
    pub fn max(&self) -> f64 {
        self.max
    }
}
