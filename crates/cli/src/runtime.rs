//! Service assembly - wiring configured roles into running tasks
//!
//! The manager role binds the fanout endpoint (and the notify endpoint when
//! configured, backed by the in-memory record store); the worker role
//! connects to both and runs the job loop with the built-in handler set.

use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::{JobContext, PayloadValue, QueueConfig};
use dispatcher::{DispatcherConfig, JobDispatcher, MemoryJobStore};
use tokio::task::JoinSet;
use tracing::{debug, info};
use transport::{FanoutBinding, FanoutStream, NotifyBinding, NotifyClient};
use worker::{HandlerMap, WorkerConfig, WorkerLoop};

/// Running manager/worker roles
pub struct Service {
    tasks: JoinSet<()>,
    dispatcher: Option<Arc<JobDispatcher<FanoutBinding>>>,
}

impl Service {
    /// Bind/connect the configured roles and start their loops
    ///
    /// # Errors
    /// Startup-time transport failures (bind/connect) are fatal.
    pub async fn start(config: QueueConfig) -> Result<Self> {
        let mut tasks = JoinSet::new();
        let mut dispatcher = None;

        if config.manager {
            dispatcher = Some(Self::start_manager(&config, &mut tasks).await?);
        }

        if config.effective_worker() {
            Self::start_worker(&config, &mut tasks).await?;
        }

        Ok(Self { tasks, dispatcher })
    }

    async fn start_manager(
        config: &QueueConfig,
        tasks: &mut JoinSet<()>,
    ) -> Result<Arc<JobDispatcher<FanoutBinding>>> {
        let fanout = FanoutBinding::bind(&config.host, config.port, config.queue_capacity)
            .await
            .context("Failed to bind fanout endpoint")?;

        let dispatcher_config = DispatcherConfig::from_queue_config(config)
            .context("Invalid dispatcher configuration")?;
        let mut dispatcher = JobDispatcher::new(fanout, dispatcher_config);
        if config.notify_enabled() {
            dispatcher = dispatcher.with_store(Arc::new(MemoryJobStore::new()));
        }
        let dispatcher = Arc::new(dispatcher);

        if let Some(notify_port) = config.notify_port {
            let binding = NotifyBinding::bind(&config.host, notify_port, config.queue_capacity)
                .await
                .context("Failed to bind notify endpoint")?;
            let serving = Arc::clone(&dispatcher);
            tasks.spawn(async move {
                serving.serve_notify(binding).await;
            });
        }

        info!(host = %config.host, port = config.port, "Manager role started");
        Ok(dispatcher)
    }

    async fn start_worker(config: &QueueConfig, tasks: &mut JoinSet<()>) -> Result<()> {
        let stream = FanoutStream::connect(&config.host, config.port)
            .await
            .context("Failed to connect fanout stream")?;

        let notify = match config.notify_port {
            Some(port) => Some(
                NotifyClient::connect(&config.host, port)
                    .await
                    .context("Failed to connect notify client")?,
            ),
            None => None,
        };

        let registry = Arc::new(builtin_handlers());
        let worker_loop = WorkerLoop::new(
            stream,
            registry,
            notify,
            WorkerConfig::from_queue_config(config),
        );
        tasks.spawn(async move {
            worker_loop.run().await;
        });

        info!(host = %config.host, port = config.port, "Worker role started");
        Ok(())
    }

    /// The dispatcher, for hosts embedding the service and pushing jobs
    pub fn dispatcher(&self) -> Option<&Arc<JobDispatcher<FanoutBinding>>> {
        self.dispatcher.as_ref()
    }

    /// Wait until any role loop stops on its own
    pub async fn wait(&mut self) {
        if self.tasks.join_next().await.is_none() {
            // No role loops running (e.g. manager without notify): park forever
            std::future::pending::<()>().await;
        }
    }

    /// Best-effort shutdown: abort role loops, close endpoints
    pub async fn stop(mut self) {
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
        debug!("Service tasks stopped");
    }
}

/// Built-in worker capabilities for standalone runs
fn builtin_handlers() -> HandlerMap {
    let mut map = HandlerMap::new();
    map.register_fn("echo", |ctx: JobContext| async move {
        Ok(ctx.payload.data)
    });
    map.register_fn("log", |ctx: JobContext| async move {
        info!(
            kind = %ctx.payload.kind,
            source = ?ctx.source,
            "Job payload received"
        );
        Ok(PayloadValue::Null)
    });
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{JobEnvelope, JobStatus, Payload};
    use tokio::time::{sleep, Duration};

    fn loopback_config(port: u16, notify_port: Option<u16>) -> QueueConfig {
        QueueConfig {
            port,
            notify_port,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_service_push_round_trip() {
        // Fixed loopback ports; keep clear of the defaults
        let config = loopback_config(28871, Some(28872));
        let service = Service::start(config).await.unwrap();

        let dispatcher = Arc::clone(service.dispatcher().unwrap());
        while dispatcher.sink().peer_count() < 1 {
            sleep(Duration::from_millis(10)).await;
        }
        let record = dispatcher
            .push(JobEnvelope::new("echo", Payload::new("string", "hi")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, JobStatus::Pending);

        // The worker processes and the notify cycle removes the record
        let mut finalized = false;
        for _ in 0..100 {
            sleep(Duration::from_millis(10)).await;
            if dispatcher.metrics().notify_success_count() == 1 {
                finalized = true;
                break;
            }
        }
        assert!(finalized, "job was not finalized");

        service.stop().await;
    }

    #[tokio::test]
    async fn test_builtin_handlers_present() {
        let map = builtin_handlers();
        assert!(map.contains("echo"));
        assert!(map.contains("log"));
    }
}
