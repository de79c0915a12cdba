//! HandlerRegistry trait - operation dispatch abstraction
//!
//! The generic operation-dispatch table lives in the host; this crate fixes
//! only the invoke contract the worker loop consumes. Lookup failure is a
//! typed error, never a crash.

use async_trait::async_trait;

use crate::{Payload, PayloadValue, QueueError};

/// Arguments handed to an invoked handler
#[derive(Debug, Clone, PartialEq)]
pub struct JobContext {
    /// Typed payload from the envelope
    pub payload: Payload,

    /// Provenance tag from the envelope
    pub source: Option<String>,
}

impl JobContext {
    /// Create a context from envelope fields
    pub fn new(payload: Payload, source: Option<String>) -> Self {
        Self { payload, source }
    }
}

/// Capability-keyed handler registry
///
/// Populated at startup, looked up by capability name per job.
#[async_trait]
pub trait HandlerRegistry: Send + Sync {
    /// Invoke the named capability with the job context
    ///
    /// # Errors
    /// [`QueueError::UnknownHandler`] when the name is not registered;
    /// [`QueueError::Handler`] when the invoked operation fails.
    async fn invoke(&self, worker: &str, ctx: JobContext) -> Result<PayloadValue, QueueError>;
}
