//! Complete Dispatch Demo
//!
//! Demonstrates wiring a manager and a worker in one process, pushing a mix
//! of succeeding and failing jobs, and watching the notify cycle finalize
//! their records.
//!
//! Run with: cargo run --bin complete_dispatch

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{JobContext, JobEnvelope, JobStore, Payload, PayloadValue, QueueError};
use dispatcher::{DispatcherConfig, JobDispatcher, MemoryJobStore};
use observability::DispatchStatsAggregator;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use transport::{FanoutBinding, FanoutStream, NotifyBinding, NotifyClient};
use worker::{HandlerMap, WorkerConfig, WorkerLoop};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Complete Dispatch Demo");

    // ==== Stage 1: Manager endpoints ====
    let fanout = FanoutBinding::bind("127.0.0.1", 0, 16).await?;
    let notify_binding = NotifyBinding::bind("127.0.0.1", 0, 16).await?;
    let fanout_port = fanout.local_addr().port();
    let notify_port = notify_binding.local_addr().port();
    info!(fanout_port, notify_port, "Manager endpoints bound");

    // ==== Stage 2: Dispatcher with a record store ====
    let store = Arc::new(MemoryJobStore::new());
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

    // ==== Stage 3: Worker with a small handler set ====
    let mut registry = HandlerMap::new();
    registry.register_fn("word_count", |ctx: JobContext| async move {
        let text = ctx
            .payload
            .data
            .as_str()
            .ok_or_else(|| QueueError::handler("word_count", "payload is not a string"))?;
        Ok(PayloadValue::from(text.split_whitespace().count() as i64))
    });
    registry.register_fn("echo", |ctx: JobContext| async move {
        Ok(ctx.payload.data)
    });
    registry.register_fn("always_fails", |_ctx: JobContext| async move {
        Err(QueueError::handler("always_fails", "intentional failure"))
    });

    let stream = FanoutStream::connect("127.0.0.1", fanout_port).await?;
    let notify = NotifyClient::connect("127.0.0.1", notify_port).await?;
    let worker_loop = WorkerLoop::new(
        stream,
        Arc::new(registry),
        Some(notify),
        WorkerConfig::default(),
    );
    let worker_metrics = worker_loop.metrics();
    worker_loop.spawn();

    while dispatcher.sink().peer_count() < 1 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // ==== Stage 4: Push a mix of jobs, tracking each to its finalization ====
    let mut stats = DispatchStatsAggregator::new();
    let jobs = vec![
        JobEnvelope::new("word_count", Payload::new("string", "the quick brown fox"))
            .with_source("demo.texts:intro"),
        JobEnvelope::new("echo", Payload::new("object", PayloadValue::from(true))),
        JobEnvelope::new("always_fails", Payload::new("string", "doomed")),
        JobEnvelope::new("word_count", Payload::new("string", "one two")),
    ];

    for job in jobs {
        let worker_name = job.worker.clone();
        let succeeded_before = dispatcher.metrics().notify_success_count();
        match dispatcher.push(job).await {
            Ok(Some(record)) => {
                stats.record_pushed();
                info!(worker = %worker_name, job_id = %record.id, "Job pushed");

                // The notify cycle removes the record once the outcome lands
                let started = Instant::now();
                for _ in 0..400 {
                    if store.get(&record.id).is_none() {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                let success = dispatcher.metrics().notify_success_count() > succeeded_before;
                stats.record_completed(&worker_name, success, latency_ms);
                info!(worker = %worker_name, job_id = %record.id, success, "Job finalized");
            }
            Ok(None) => stats.record_pushed(),
            Err(e) => {
                stats.record_dropped();
                info!(worker = %worker_name, error = %e, "Job refused");
            }
        }
    }

    let dispatch = dispatcher.metrics().snapshot();
    let worker_snapshot = worker_metrics.snapshot();
    info!(
        pushed = dispatch.pushed_count,
        finalized_ok = dispatch.notify_success_count,
        finalized_err = dispatch.notify_error_count,
        handler_failures = worker_snapshot.handler_failure_count,
        "Demo finished"
    );
    println!("{}", stats.summary());

    assert!(store.is_empty(), "all records should be finalized and removed");
    Ok(())
}
