//! JobDispatcher - push path and notify-serving loop

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    FrameSink, JobEnvelope, JobRecord, JobStore, JobUpdate, NotifyOutcome, QueueConfig,
    RemoveOptions,
};
use tracing::{debug, error, info, instrument, warn};

use transport::NotifyBinding;

use crate::error::DispatchError;
use crate::metrics::DispatchMetrics;

/// Acknowledgement frame; content is not semantically meaningful
const ACK: Bytes = Bytes::from_static(b"{}");

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Send-side role enabled
    pub manager: bool,
    /// Reaper hint stamped onto created records
    pub job_max_age: Duration,
}

impl DispatcherConfig {
    /// Derive from the subsystem configuration
    pub fn from_queue_config(config: &QueueConfig) -> Result<Self, DispatchError> {
        Ok(Self {
            manager: config.manager,
            job_max_age: config.job_max_age()?,
        })
    }
}

/// Manager-side dispatcher
///
/// Generic over the fanout sink so the push path stays testable without
/// sockets. With a store attached, each push creates a PENDING record that is
/// finalized by the notify-serving loop; without one, pushes are
/// fire-and-forget over the same code path.
pub struct JobDispatcher<S: FrameSink> {
    sink: S,
    store: Option<Arc<dyn JobStore>>,
    config: DispatcherConfig,
    metrics: Arc<DispatchMetrics>,
}

impl<S: FrameSink> JobDispatcher<S> {
    /// Create a fire-and-forget dispatcher
    pub fn new(sink: S, config: DispatcherConfig) -> Self {
        Self {
            sink,
            store: None,
            config,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Attach a job record store, enabling the tracked variant
    pub fn with_store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Get dispatch metrics
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Borrow the underlying fanout sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Validate and submit one job
    ///
    /// Returns the created record in the tracked variant, `None` otherwise.
    /// Validation failures perform no send and create no record. A send
    /// failure deletes the just-created record so no orphaned PENDING row
    /// survives it.
    #[instrument(name = "dispatch_push", skip(self, job), fields(worker = %job.worker))]
    pub async fn push(&self, mut job: JobEnvelope) -> Result<Option<JobRecord>, DispatchError> {
        if !self.config.manager {
            warn!("Push refused, manager role is disabled");
            return Err(DispatchError::ManagerDisabled);
        }
        if let Err(e) = validate(&job) {
            self.metrics.inc_rejected_count();
            error!(error = %e, "Job validation failed");
            return Err(e);
        }

        codec::normalize_payload(&mut job.payload);

        let record = match &self.store {
            Some(store) => {
                let record = store
                    .create(contracts::NewJob::pending(self.config.job_max_age))
                    .await
                    .map_err(DispatchError::Queue)?;
                job.job_id = Some(record.id.clone());
                Some(record)
            }
            None => None,
        };

        let frame = codec::encode_job(&job).map_err(DispatchError::Queue)?;
        if let Err(send_err) = self.sink.send(frame).await {
            self.metrics.inc_send_failure_count();
            observability::record_job_dropped(&job.worker);
            error!(error = %send_err, "Job send failed");
            if let (Some(store), Some(record)) = (&self.store, &record) {
                // The PENDING record must not outlive the failed send
                if let Err(remove_err) = store.remove(&record.id, RemoveOptions::silent()).await {
                    error!(job_id = %record.id, error = %remove_err, "Orphan record cleanup failed");
                }
            }
            return Err(DispatchError::Queue(send_err));
        }

        self.metrics.inc_pushed_count();
        observability::record_job_pushed(&job.worker, self.store.is_some());
        debug!(job_id = ?job.job_id, "Job dispatched");
        Ok(record)
    }

    /// Serve the notify channel, finalizing records until the endpoint closes
    ///
    /// Every request is acknowledged, even malformed ones; a stalled reply
    /// would deadlock the reporting worker. Errors while processing one
    /// message never terminate the loop.
    #[instrument(name = "dispatch_serve_notify", skip(self, binding))]
    pub async fn serve_notify(&self, mut binding: NotifyBinding) {
        info!(addr = %binding.local_addr(), "Notify serving loop started");

        while let Some(request) = binding.next().await {
            self.finalize(&request.frame).await;
            request.reply(ACK.clone());
        }

        info!("Notify serving loop stopped");
    }

    /// Apply one notify outcome to its job record
    async fn finalize(&self, frame: &[u8]) {
        let message = match codec::decode_notify(frame) {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "Malformed notify message discarded");
                return;
            }
        };

        let Some(store) = &self.store else {
            debug!(job_id = %message.job_id, "Notify received without a store, ignored");
            return;
        };

        let update = match &message.outcome {
            NotifyOutcome::Success { result } => {
                self.metrics.inc_notify_success_count();
                observability::record_notify_outcome(true);
                JobUpdate::success(result.clone())
            }
            NotifyOutcome::Error { error } => {
                self.metrics.inc_notify_error_count();
                observability::record_notify_outcome(false);
                JobUpdate::error(error.clone())
            }
        };

        if let Err(e) = store.update(&message.job_id, update).await {
            error!(job_id = %message.job_id, error = %e, "Record update failed");
            return;
        }
        // Hooks suppressed: removal must not trigger another notification cycle
        if let Err(e) = store.remove(&message.job_id, RemoveOptions::silent()).await {
            error!(job_id = %message.job_id, error = %e, "Record removal failed");
        }
    }
}

/// Synchronous job validation: no side effects on failure
fn validate(job: &JobEnvelope) -> Result<(), DispatchError> {
    if job.worker.trim().is_empty() {
        return Err(DispatchError::missing_field("worker"));
    }
    if job.payload.kind.trim().is_empty() {
        return Err(DispatchError::missing_field("payload.type"));
    }
    Ok(())
}
