//! HandlerMap - capability-keyed handler registry
//!
//! An explicit mapping from capability name to handler object, populated at
//! startup. Lookup failure is a typed error, never a dynamic-dispatch crash.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use contracts::{HandlerRegistry, JobContext, PayloadValue, QueueError};

/// One registered job handler
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Execute the operation for one job
    async fn handle(&self, ctx: JobContext) -> Result<PayloadValue, QueueError>;
}

/// Adapter so plain async closures register as handlers
struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PayloadValue, QueueError>> + Send,
{
    async fn handle(&self, ctx: JobContext) -> Result<PayloadValue, QueueError> {
        (self.f)(ctx).await
    }
}

/// Capability-keyed registry of job handlers
#[derive(Default)]
pub struct HandlerMap {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerMap {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler object under a capability name
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    /// Register an async closure under a capability name
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PayloadValue, QueueError>> + Send + 'static,
    {
        self.register(name, Arc::new(FnHandler { f }));
    }

    /// Whether a capability name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered capabilities
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl HandlerRegistry for HandlerMap {
    async fn invoke(&self, worker: &str, ctx: JobContext) -> Result<PayloadValue, QueueError> {
        let handler = self
            .handlers
            .get(worker)
            .ok_or_else(|| QueueError::UnknownHandler {
                worker: worker.to_string(),
            })?;
        handler.handle(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Payload;

    fn ctx(data: &str) -> JobContext {
        JobContext::new(Payload::new("string", data), None)
    }

    #[tokio::test]
    async fn test_registered_handler_is_invoked() {
        let mut map = HandlerMap::new();
        map.register_fn("echo", |ctx: JobContext| async move {
            Ok(ctx.payload.data)
        });

        let result = map.invoke("echo", ctx("hi")).await.unwrap();
        assert_eq!(result.as_str(), Some("hi"));
    }

    #[tokio::test]
    async fn test_unknown_capability_is_a_typed_error() {
        let map = HandlerMap::new();
        let err = map.invoke("missing", ctx("hi")).await.unwrap_err();
        assert!(matches!(err, QueueError::UnknownHandler { .. }));
    }

    #[tokio::test]
    async fn test_handler_failure_carries_message() {
        let mut map = HandlerMap::new();
        map.register_fn("explode", |_ctx: JobContext| async move {
            Err(QueueError::handler("explode", "out of fuel"))
        });

        let err = map.invoke("explode", ctx("hi")).await.unwrap_err();
        assert_eq!(err.wire_message(), "out of fuel");
    }
}
