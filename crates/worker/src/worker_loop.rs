//! WorkerLoop - sequential envelope consumption with fault isolation
//!
//! Strictly one envelope at a time: the next receive does not begin until the
//! current job's decode, handler invocation and outcome send complete. A slow
//! handler therefore throttles this loop's consumption, and once the
//! transport's bounded per-peer queue fills, backpressure reaches the sender.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use contracts::{
    FrameSource, HandlerRegistry, JobContext, JobEnvelope, NotifyMessage, NotifyOutlet,
    QueueConfig, QueueError,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::WorkerMetrics;

/// Worker loop configuration
#[derive(Debug, Clone, Default)]
pub struct WorkerConfig {
    /// Capability allow-list; `None` accepts any registered handler
    pub allowed_handlers: Option<HashSet<String>>,
}

impl WorkerConfig {
    /// Derive from the subsystem configuration
    pub fn from_queue_config(config: &QueueConfig) -> Self {
        Self {
            allowed_handlers: config
                .handlers
                .clone()
                .map(|names| names.into_iter().collect()),
        }
    }
}

/// Worker-side job loop
///
/// Generic over the frame source and notify outlet so the loop stays
/// testable without sockets.
pub struct WorkerLoop<R: FrameSource, N: NotifyOutlet> {
    source: R,
    registry: Arc<dyn HandlerRegistry>,
    notify: Option<N>,
    config: WorkerConfig,
    metrics: Arc<WorkerMetrics>,
}

impl<R, N> WorkerLoop<R, N>
where
    R: FrameSource + Send + Sync + 'static,
    N: NotifyOutlet + Send + Sync + 'static,
{
    /// Create a worker loop
    pub fn new(
        source: R,
        registry: Arc<dyn HandlerRegistry>,
        notify: Option<N>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            source,
            registry,
            notify,
            config,
            metrics: Arc::new(WorkerMetrics::new()),
        }
    }

    /// Get worker metrics
    pub fn metrics(&self) -> Arc<WorkerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run until the fanout channel closes
    #[instrument(name = "worker_loop_run", skip(self))]
    pub async fn run(mut self) {
        info!("Worker loop started");

        while let Some(frame) = self.source.recv().await {
            self.process(frame).await;
        }

        info!("Worker loop stopped");
    }

    /// Spawn the loop as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Handle one frame; no failure here may terminate the loop
    async fn process(&mut self, frame: Bytes) {
        let envelope = match codec::decode_job(&frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.metrics.inc_discarded_count();
                observability::record_job_discarded("malformed");
                error!(error = %e, "Malformed job frame discarded");
                return;
            }
        };

        let started = Instant::now();
        let outcome = self.execute(&envelope).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &outcome {
            Ok(_) => self.metrics.inc_processed_count(),
            Err(e) => {
                if matches!(e, QueueError::Handler { .. } | QueueError::UnknownHandler { .. }) {
                    self.metrics.inc_handler_failure_count();
                }
                error!(worker = %envelope.worker, error = %e, "Job failed");
            }
        }
        observability::record_job_completed(&envelope.worker, outcome.is_ok(), latency_ms);

        self.report(&envelope, outcome).await;
    }

    /// Allow-list check plus handler (and callback) invocation
    async fn execute(
        &self,
        envelope: &JobEnvelope,
    ) -> Result<contracts::PayloadValue, QueueError> {
        if let Some(allowed) = &self.config.allowed_handlers {
            if !allowed.contains(&envelope.worker) {
                self.metrics.inc_rejected_count();
                return Err(QueueError::handler(
                    &envelope.worker,
                    format!("invalid worker handler: {}", envelope.worker),
                ));
            }
        }

        let ctx = JobContext::new(envelope.payload.clone(), envelope.source.clone());
        let result = self.registry.invoke(&envelope.worker, ctx).await?;

        // The callback's outcome never overrides the job's outcome
        if let Some(callback) = &envelope.callback {
            let ctx = JobContext::new(envelope.payload.clone(), envelope.source.clone());
            if let Err(e) = self.registry.invoke(callback, ctx).await {
                warn!(callback = %callback, error = %e, "Callback handler failed");
            }
        }

        Ok(result)
    }

    /// Report the outcome over the notify channel, when configured
    async fn report(
        &mut self,
        envelope: &JobEnvelope,
        outcome: Result<contracts::PayloadValue, QueueError>,
    ) {
        let (Some(notify), Some(job_id)) = (&mut self.notify, &envelope.job_id) else {
            return;
        };

        let message = match outcome {
            Ok(result) => NotifyMessage::success(job_id, result),
            // Only the message string crosses the wire
            Err(e) => NotifyMessage::failure(job_id, e.wire_message()),
        };

        let frame = match codec::encode_notify(&message) {
            Ok(frame) => frame,
            Err(e) => {
                self.metrics.inc_notify_failure_count();
                error!(job_id = %job_id, error = %e, "Outcome encode failed");
                return;
            }
        };

        match notify.request(frame).await {
            Ok(_ack) => debug!(job_id = %job_id, "Outcome reported"),
            Err(e) => {
                self.metrics.inc_notify_failure_count();
                error!(job_id = %job_id, error = %e, "Outcome report failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HandlerMap;
    use contracts::{Payload, PayloadValue};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Frame source fed from a fixed script
    struct ScriptedSource {
        frames: VecDeque<Bytes>,
    }

    impl ScriptedSource {
        fn new(envelopes: &[JobEnvelope]) -> Self {
            let frames = envelopes
                .iter()
                .map(|e| codec::encode_job(e).unwrap())
                .collect();
            Self { frames }
        }

        fn push_raw(&mut self, frame: &'static [u8]) {
            self.frames.push_back(Bytes::from_static(frame));
        }
    }

    impl FrameSource for ScriptedSource {
        async fn recv(&mut self) -> Option<Bytes> {
            self.frames.pop_front()
        }
    }

    /// Notify outlet recording every request
    #[derive(Clone, Default)]
    struct RecordingNotify {
        requests: Arc<Mutex<Vec<NotifyMessage>>>,
    }

    impl RecordingNotify {
        fn messages(&self) -> Vec<NotifyMessage> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl NotifyOutlet for RecordingNotify {
        async fn request(&mut self, frame: Bytes) -> Result<Bytes, QueueError> {
            let message = codec::decode_notify(&frame)?;
            self.requests.lock().unwrap().push(message);
            Ok(Bytes::from_static(b"{}"))
        }
    }

    fn echo_registry() -> Arc<HandlerMap> {
        let mut map = HandlerMap::new();
        map.register_fn("echo", |ctx: JobContext| async move {
            Ok(ctx.payload.data)
        });
        map.register_fn("explode", |_ctx: JobContext| async move {
            Err(QueueError::handler("explode", "kaboom"))
        });
        Arc::new(map)
    }

    fn envelope(worker: &str, job_id: &str) -> JobEnvelope {
        let mut e = JobEnvelope::new(worker, Payload::new("string", "hi"));
        e.job_id = Some(job_id.to_string());
        e
    }

    #[tokio::test]
    async fn test_success_reports_result() {
        let source = ScriptedSource::new(&[envelope("echo", "j1")]);
        let notify = RecordingNotify::default();
        let worker = WorkerLoop::new(
            source,
            echo_registry(),
            Some(notify.clone()),
            WorkerConfig::default(),
        );
        let metrics = worker.metrics();

        worker.run().await;

        let messages = notify.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_success());
        assert_eq!(messages[0].result(), Some(&PayloadValue::from("hi")));
        assert_eq!(metrics.processed_count(), 1);
    }

    #[tokio::test]
    async fn test_null_returning_handler_reports_success() {
        let mut map = HandlerMap::new();
        map.register_fn("log", |_ctx: JobContext| async move {
            Ok(PayloadValue::Null)
        });

        let source = ScriptedSource::new(&[envelope("log", "j1")]);
        let notify = RecordingNotify::default();
        let worker = WorkerLoop::new(
            source,
            Arc::new(map),
            Some(notify.clone()),
            WorkerConfig::default(),
        );

        worker.run().await;

        let messages = notify.messages();
        assert!(messages[0].is_success());
        assert_eq!(messages[0].result(), Some(&PayloadValue::Null));
    }

    #[tokio::test]
    async fn test_failure_reports_message_string_only() {
        let source = ScriptedSource::new(&[envelope("explode", "j1")]);
        let notify = RecordingNotify::default();
        let worker = WorkerLoop::new(
            source,
            echo_registry(),
            Some(notify.clone()),
            WorkerConfig::default(),
        );

        worker.run().await;

        let messages = notify.messages();
        assert_eq!(messages[0].error(), Some("kaboom"));
    }

    #[tokio::test]
    async fn test_fault_isolation_across_three_jobs() {
        let source = ScriptedSource::new(&[
            envelope("echo", "j1"),
            envelope("explode", "j2"),
            envelope("echo", "j3"),
        ]);
        let notify = RecordingNotify::default();
        let worker = WorkerLoop::new(
            source,
            echo_registry(),
            Some(notify.clone()),
            WorkerConfig::default(),
        );
        let metrics = worker.metrics();

        worker.run().await;

        let messages = notify.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].is_success());
        assert!(!messages[1].is_success());
        assert!(messages[2].is_success());
        assert_eq!(metrics.processed_count(), 2);
        assert_eq!(metrics.handler_failure_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_discarded_not_fatal() {
        let mut source = ScriptedSource::new(&[]);
        source.push_raw(b"{definitely not json");
        source
            .frames
            .push_back(codec::encode_job(&envelope("echo", "j1")).unwrap());

        let notify = RecordingNotify::default();
        let worker = WorkerLoop::new(
            source,
            echo_registry(),
            Some(notify.clone()),
            WorkerConfig::default(),
        );
        let metrics = worker.metrics();

        worker.run().await;

        assert_eq!(metrics.discarded_count(), 1);
        assert_eq!(notify.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_allow_list_rejects_unlisted_worker() {
        let source = ScriptedSource::new(&[envelope("echo", "j1")]);
        let notify = RecordingNotify::default();
        let config = WorkerConfig {
            allowed_handlers: Some(["resize".to_string()].into_iter().collect()),
        };
        let worker = WorkerLoop::new(source, echo_registry(), Some(notify.clone()), config);
        let metrics = worker.metrics();

        worker.run().await;

        let messages = notify.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0]
            .error()
            .unwrap()
            .contains("invalid worker handler"));
        assert_eq!(metrics.rejected_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_handler_is_reported() {
        let source = ScriptedSource::new(&[envelope("missing", "j1")]);
        let notify = RecordingNotify::default();
        let worker = WorkerLoop::new(
            source,
            echo_registry(),
            Some(notify.clone()),
            WorkerConfig::default(),
        );

        worker.run().await;

        let messages = notify.messages();
        assert!(messages[0]
            .error()
            .unwrap()
            .contains("unknown worker handler"));
    }

    #[tokio::test]
    async fn test_callback_invoked_after_success() {
        let calls: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut map = HandlerMap::new();
        let seen = Arc::clone(&calls);
        map.register_fn("echo", move |ctx: JobContext| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push("echo".to_string());
                Ok(ctx.payload.data)
            }
        });
        let seen = Arc::clone(&calls);
        map.register_fn("echoDone", move |_ctx: JobContext| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push("echoDone".to_string());
                Ok(PayloadValue::Null)
            }
        });

        let mut e = envelope("echo", "j1");
        e.callback = Some("echoDone".to_string());
        let source = ScriptedSource::new(&[e]);
        let worker: WorkerLoop<_, RecordingNotify> =
            WorkerLoop::new(source, Arc::new(map), None, WorkerConfig::default());

        worker.run().await;

        assert_eq!(
            calls.lock().unwrap().clone(),
            vec!["echo".to_string(), "echoDone".to_string()]
        );
    }

    #[tokio::test]
    async fn test_without_notify_outcomes_stay_local() {
        let source = ScriptedSource::new(&[envelope("echo", "j1")]);
        let worker: WorkerLoop<_, RecordingNotify> = WorkerLoop::new(
            source,
            echo_registry(),
            None,
            WorkerConfig::default(),
        );
        let metrics = worker.metrics();

        worker.run().await;
        assert_eq!(metrics.processed_count(), 1);
    }
}
