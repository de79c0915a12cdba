//! JobRecord - persisted job state and the store contract
//!
//! The store itself is an external collaborator; this crate only fixes the
//! record shape and the create/update/remove contract the dispatcher consumes.
//! The store must guarantee per-id atomicity.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PayloadValue, QueueError};

/// Job record lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Dispatched, outcome not yet reported
    Pending,
    /// Handler completed
    Success,
    /// Handler failed
    Error,
}

/// Persisted job record
///
/// Invariant: a record must never stay PENDING forever. Every dispatch
/// failure path deletes it, and every received outcome finalizes then
/// removes it. `max_age` is a hint for an external reaper; no timer-driven
/// transition exists in this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Store-generated id, embedded into the envelope for correlation
    pub id: String,

    /// Lifecycle state
    pub status: JobStatus,

    /// Handler result on SUCCESS, failure message string on ERROR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<PayloadValue>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Reaper hint
    pub max_age: Duration,
}

/// Fields for creating a record
#[derive(Debug, Clone)]
pub struct NewJob {
    pub status: JobStatus,
    pub max_age: Duration,
}

impl NewJob {
    /// A fresh PENDING record with the given reaper hint
    pub fn pending(max_age: Duration) -> Self {
        Self {
            status: JobStatus::Pending,
            max_age,
        }
    }
}

/// Fields for finalizing a record
#[derive(Debug, Clone)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub result: Option<PayloadValue>,
}

impl JobUpdate {
    /// Finalize as SUCCESS with the handler result
    pub fn success(result: PayloadValue) -> Self {
        Self {
            status: JobStatus::Success,
            result: Some(result),
        }
    }

    /// Finalize as ERROR with the failure message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Error,
            result: Some(PayloadValue::String(message.into())),
        }
    }
}

/// Options for record removal
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOptions {
    /// Suppress downstream removal hooks
    ///
    /// The notify-serving loop removes records with hooks suppressed so a
    /// removal cannot trigger another notification cycle.
    pub suppress_hooks: bool,
}

impl RemoveOptions {
    /// Removal with hooks suppressed
    pub fn silent() -> Self {
        Self {
            suppress_hooks: true,
        }
    }
}

/// Job record store contract
///
/// Consumed, not implemented, by the dispatch core (a reference in-memory
/// implementation ships with the dispatcher crate for hosts and tests).
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a record, returning it with a generated id
    async fn create(&self, job: NewJob) -> Result<JobRecord, QueueError>;

    /// Update the record with the given id
    async fn update(&self, id: &str, update: JobUpdate) -> Result<(), QueueError>;

    /// Remove the record with the given id
    async fn remove(&self, id: &str, options: RemoveOptions) -> Result<(), QueueError>;
}
