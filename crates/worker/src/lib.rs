//! # Worker
//!
//! Worker-side receive loop with fault isolation, plus `HandlerMap`, a
//! capability-keyed implementation of the handler registry contract.
//!
//! One job's failure never stops the loop: it is logged, optionally reported
//! over the notify channel, and the loop moves to the next envelope. No
//! retry, no requeue; execution is at-most-once.

mod metrics;
mod registry;
mod worker_loop;

pub use metrics::{WorkerMetrics, WorkerMetricsSnapshot};
pub use registry::{HandlerMap, JobHandler};
pub use worker_loop::{WorkerConfig, WorkerLoop};
