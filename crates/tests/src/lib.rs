//! # Integration Tests
//!
//! End-to-end tests over loopback sockets.
//!
//! Covers:
//! - full push -> deliver -> invoke -> notify -> finalize cycles
//! - validation and send-failure side effects
//! - fault isolation across jobs
//! - the fire-and-forget variant

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::JobStatus::Pending;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use contracts::{
        JobContext, JobEnvelope, JobRecord, JobStatus, JobStore, JobUpdate, NewJob, Payload,
        PayloadValue, QueueError, RemoveOptions,
    };
    use dispatcher::{DispatcherConfig, JobDispatcher, MemoryJobStore};
    use tokio::time::{sleep, timeout};
    use transport::{FanoutBinding, FanoutStream, NotifyBinding, NotifyClient};
    use worker::{HandlerMap, WorkerConfig, WorkerLoop};

    /// Store wrapper recording every status transition
    struct RecordingStore {
        inner: MemoryJobStore,
        transitions: Mutex<Vec<JobStatus>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                inner: MemoryJobStore::new(),
                transitions: Mutex::new(Vec::new()),
            }
        }

        fn transitions(&self) -> Vec<JobStatus> {
            self.transitions.lock().unwrap().clone()
        }

        fn is_empty(&self) -> bool {
            self.inner.is_empty()
        }
    }

    #[async_trait::async_trait]
    impl JobStore for RecordingStore {
        async fn create(&self, job: NewJob) -> Result<JobRecord, QueueError> {
            let record = self.inner.create(job).await?;
            self.transitions.lock().unwrap().push(record.status);
            Ok(record)
        }

        async fn update(&self, id: &str, update: JobUpdate) -> Result<(), QueueError> {
            self.transitions.lock().unwrap().push(update.status);
            self.inner.update(id, update).await
        }

        async fn remove(&self, id: &str, options: RemoveOptions) -> Result<(), QueueError> {
            self.inner.remove(id, options).await
        }
    }

    struct Harness {
        dispatcher: Arc<JobDispatcher<FanoutBinding>>,
        store: Arc<RecordingStore>,
        observed: Arc<Mutex<Vec<JobContext>>>,
    }

    /// Wire a manager and one worker over loopback, with the notify channel
    async fn start_tracked_pair() -> Harness {
        let fanout = FanoutBinding::bind("127.0.0.1", 0, 16).await.unwrap();
        let notify_binding = NotifyBinding::bind("127.0.0.1", 0, 16).await.unwrap();
        let fanout_port = fanout.local_addr().port();
        let notify_port = notify_binding.local_addr().port();

        let store = Arc::new(RecordingStore::new());
        let dispatcher = Arc::new(
            JobDispatcher::new(
                fanout,
                DispatcherConfig {
                    manager: true,
                    job_max_age: Duration::from_secs(300),
                },
            )
            .with_store(Arc::clone(&store) as Arc<dyn JobStore>),
        );

        let serving = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            serving.serve_notify(notify_binding).await;
        });

        // Worker side: registry observing every invocation
        let observed: Arc<Mutex<Vec<JobContext>>> = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerMap::new();
        let seen = Arc::clone(&observed);
        registry.register_fn("echo", move |ctx: JobContext| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(ctx.clone());
                Ok(ctx.payload.data)
            }
        });
        registry.register_fn("explode", |_ctx: JobContext| async move {
            Err(QueueError::handler("explode", "kaboom"))
        });
        registry.register_fn("log", |_ctx: JobContext| async move {
            Ok(PayloadValue::Null)
        });
        let seen = Arc::clone(&observed);
        registry.register_fn("grep", move |ctx: JobContext| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(ctx.clone());
                let matched = ctx.payload.data.compile()?.is_match("jobq-2026");
                Ok(PayloadValue::Bool(matched))
            }
        });

        let stream = FanoutStream::connect("127.0.0.1", fanout_port).await.unwrap();
        let notify = NotifyClient::connect("127.0.0.1", notify_port).await.unwrap();
        WorkerLoop::new(
            stream,
            Arc::new(registry),
            Some(notify),
            WorkerConfig::default(),
        )
        .spawn();

        // Let the accept loop register the worker before the first push
        while dispatcher.sink().peer_count() < 1 {
            sleep(Duration::from_millis(10)).await;
        }

        Harness {
            dispatcher,
            store,
            observed,
        }
    }

    async fn wait_until(check: impl Fn() -> bool) {
        let deadline = async {
            while !check() {
                sleep(Duration::from_millis(10)).await;
            }
        };
        timeout(Duration::from_secs(5), deadline)
            .await
            .expect("condition not reached in time");
    }

    /// Full cycle: push -> deliver -> invoke -> notify -> finalize -> remove
    #[tokio::test]
    async fn test_e2e_tracked_success_cycle() {
        let harness = start_tracked_pair().await;

        let record = harness
            .dispatcher
            .push(
                JobEnvelope::new("echo", Payload::new("string", "hi"))
                    .with_source("ns.sub:path"),
            )
            .await
            .unwrap()
            .expect("tracked push returns a record");
        assert_eq!(record.status, JobStatus::Pending);

        let store = Arc::clone(&harness.store);
        wait_until(move || store.is_empty()).await;

        // Handler observed exactly the pushed payload and source
        let observed = harness.observed.lock().unwrap().clone();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].payload, Payload::new("string", "hi"));
        assert_eq!(observed[0].source.as_deref(), Some("ns.sub:path"));

        // PENDING -> SUCCESS, then removed
        assert_eq!(
            harness.store.transitions(),
            vec![JobStatus::Pending, JobStatus::Success]
        );
        assert_eq!(harness.dispatcher.metrics().notify_success_count(), 1);
    }

    /// A handler returning null is still a success: the record finalizes as
    /// SUCCESS and is removed instead of staying PENDING forever
    #[tokio::test]
    async fn test_e2e_null_result_still_finalizes() {
        let harness = start_tracked_pair().await;

        harness
            .dispatcher
            .push(JobEnvelope::new("log", Payload::new("string", "hello")))
            .await
            .unwrap();

        let store = Arc::clone(&harness.store);
        wait_until(move || store.is_empty()).await;

        assert_eq!(
            harness.store.transitions(),
            vec![JobStatus::Pending, JobStatus::Success]
        );
        assert_eq!(harness.dispatcher.metrics().notify_success_count(), 1);
    }

    /// Handler failure: record transitions to ERROR with the message, then away
    #[tokio::test]
    async fn test_e2e_tracked_failure_cycle() {
        let harness = start_tracked_pair().await;

        harness
            .dispatcher
            .push(JobEnvelope::new("explode", Payload::new("string", "x")))
            .await
            .unwrap();

        let store = Arc::clone(&harness.store);
        wait_until(move || store.is_empty()).await;

        assert_eq!(
            harness.store.transitions(),
            vec![JobStatus::Pending, JobStatus::Error]
        );
        assert_eq!(harness.dispatcher.metrics().notify_error_count(), 1);
    }

    /// Fault isolation: the failing second job stops neither the first nor third
    #[tokio::test]
    async fn test_e2e_fault_isolation() {
        let harness = start_tracked_pair().await;

        for worker in ["echo", "explode", "echo"] {
            harness
                .dispatcher
                .push(JobEnvelope::new(worker, Payload::new("string", "hi")))
                .await
                .unwrap();
        }

        let store = Arc::clone(&harness.store);
        wait_until(move || store.is_empty()).await;

        assert_eq!(harness.observed.lock().unwrap().len(), 2);
        assert_eq!(harness.dispatcher.metrics().notify_success_count(), 2);
        assert_eq!(harness.dispatcher.metrics().notify_error_count(), 1);
    }

    /// Regex payloads survive the wire and compile on the worker side
    #[tokio::test]
    async fn test_e2e_regex_payload() {
        let harness = start_tracked_pair().await;

        harness
            .dispatcher
            .push(JobEnvelope::new("grep", Payload::regex(r"jobq-\d+", "")))
            .await
            .unwrap();

        let store = Arc::clone(&harness.store);
        wait_until(move || store.is_empty()).await;

        let observed = harness.observed.lock().unwrap().clone();
        assert_eq!(
            observed[0].payload.data,
            PayloadValue::regex(r"jobq-\d+", "")
        );
        assert_eq!(
            harness.store.transitions(),
            vec![JobStatus::Pending, JobStatus::Success]
        );
    }

    /// Push with no connected worker fails and leaves no record behind
    #[tokio::test]
    async fn test_e2e_push_without_worker_cleans_up() {
        let fanout = FanoutBinding::bind("127.0.0.1", 0, 16).await.unwrap();
        let store = Arc::new(MemoryJobStore::new());
        let dispatcher = JobDispatcher::new(
            fanout,
            DispatcherConfig {
                manager: true,
                job_max_age: Duration::from_secs(300),
            },
        )
        .with_store(Arc::clone(&store) as Arc<dyn contracts::JobStore>);

        let err = dispatcher
            .push(JobEnvelope::new("echo", Payload::new("string", "hi")))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            dispatcher::DispatchError::Queue(QueueError::NoReadyPeer { .. })
        ));
        assert!(store.is_empty());
    }

    /// A malformed notify request is still acknowledged, so the reporting
    /// worker never stalls on the reply
    #[tokio::test]
    async fn test_e2e_malformed_notify_still_acked() {
        use bytes::Bytes;
        use contracts::NotifyOutlet;

        let fanout = FanoutBinding::bind("127.0.0.1", 0, 16).await.unwrap();
        let notify_binding = NotifyBinding::bind("127.0.0.1", 0, 16).await.unwrap();
        let notify_port = notify_binding.local_addr().port();

        let dispatcher = Arc::new(
            JobDispatcher::new(
                fanout,
                DispatcherConfig {
                    manager: true,
                    job_max_age: Duration::from_secs(300),
                },
            )
            .with_store(Arc::new(MemoryJobStore::new()) as Arc<dyn JobStore>),
        );
        let serving = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            serving.serve_notify(notify_binding).await;
        });

        let mut client = NotifyClient::connect("127.0.0.1", notify_port).await.unwrap();
        let reply = timeout(
            Duration::from_secs(2),
            client.request(Bytes::from_static(b"{not a notify message")),
        )
        .await
        .expect("reply must not stall")
        .unwrap();
        assert_eq!(reply.as_ref(), b"{}");
    }

    /// Fire-and-forget: no store, no notify, handler still runs exactly once
    #[tokio::test]
    async fn test_e2e_fire_and_forget() {
        let fanout = FanoutBinding::bind("127.0.0.1", 0, 16).await.unwrap();
        let port = fanout.local_addr().port();

        let dispatcher = JobDispatcher::new(
            fanout,
            DispatcherConfig {
                manager: true,
                job_max_age: Duration::from_secs(300),
            },
        );

        let invocations = Arc::new(AtomicU64::new(0));
        let mut registry = HandlerMap::new();
        let count = Arc::clone(&invocations);
        registry.register_fn("echo", move |ctx: JobContext| {
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(ctx.payload.data)
            }
        });

        let stream = FanoutStream::connect("127.0.0.1", port).await.unwrap();
        let worker: WorkerLoop<_, NotifyClient> =
            WorkerLoop::new(stream, Arc::new(registry), None, WorkerConfig::default());
        worker.spawn();

        while dispatcher.sink().peer_count() < 1 {
            sleep(Duration::from_millis(10)).await;
        }

        let receipt = dispatcher
            .push(JobEnvelope::new("echo", Payload::new("string", "hi")))
            .await
            .unwrap();
        assert!(receipt.is_none(), "fire-and-forget returns no record");

        let count = Arc::clone(&invocations);
        wait_until(move || count.load(Ordering::SeqCst) == 1).await;
    }

    /// Two workers: each accepted frame goes to exactly one of them
    #[tokio::test]
    async fn test_e2e_load_balanced_delivery() {
        let fanout = FanoutBinding::bind("127.0.0.1", 0, 16).await.unwrap();
        let port = fanout.local_addr().port();
        let dispatcher = JobDispatcher::new(
            fanout,
            DispatcherConfig {
                manager: true,
                job_max_age: Duration::from_secs(300),
            },
        );

        let total = Arc::new(AtomicU64::new(0));
        let mut joins = Vec::new();
        for _ in 0..2 {
            let mut registry = HandlerMap::new();
            let count = Arc::clone(&total);
            registry.register_fn("echo", move |ctx: JobContext| {
                let count = Arc::clone(&count);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(ctx.payload.data)
                }
            });
            let stream = FanoutStream::connect("127.0.0.1", port).await.unwrap();
            let worker: WorkerLoop<_, NotifyClient> =
                WorkerLoop::new(stream, Arc::new(registry), None, WorkerConfig::default());
            joins.push(worker.spawn());
        }

        while dispatcher.sink().peer_count() < 2 {
            sleep(Duration::from_millis(10)).await;
        }

        for _ in 0..10 {
            dispatcher
                .push(JobEnvelope::new("echo", Payload::new("string", "hi")))
                .await
                .unwrap();
        }

        // Exactly once each: ten invocations total, never duplicated
        let count = Arc::clone(&total);
        wait_until(move || count.load(Ordering::SeqCst) == 10).await;
        sleep(Duration::from_millis(50)).await;
        assert_eq!(total.load(Ordering::SeqCst), 10);
    }
}
