//! NotifyMessage - worker-to-manager outcome report
//!
//! Sent over the request/reply notification channel. The outcome is a tagged
//! success/error enum discriminated by a `status` field on the wire, so
//! presence never depends on the value itself: a success whose result is
//! JSON `null` still decodes as a success.

use serde::{Deserialize, Serialize};

use crate::PayloadValue;

/// Per-job outcome, correlated to a job record by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyMessage {
    /// Record correlation id
    pub job_id: String,

    /// Job outcome
    #[serde(flatten)]
    pub outcome: NotifyOutcome,
}

/// Outcome payload, discriminated on the wire by a `status` tag
///
/// Frames missing the tag, or carrying the wrong field for their tag, fail
/// to decode; there is no ambiguous shape to check after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum NotifyOutcome {
    /// Handler completed; `result` may be any value, `null` included
    Success { result: PayloadValue },
    /// Handler failed; only the message string crosses the wire
    Error { error: String },
}

impl NotifyMessage {
    /// Create a success outcome
    pub fn success(job_id: impl Into<String>, result: PayloadValue) -> Self {
        Self {
            job_id: job_id.into(),
            outcome: NotifyOutcome::Success { result },
        }
    }

    /// Create a failure outcome carrying only the message string
    pub fn failure(job_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            outcome: NotifyOutcome::Error {
                error: error.into(),
            },
        }
    }

    /// Whether this outcome reports success
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, NotifyOutcome::Success { .. })
    }

    /// The handler result, when this is a success outcome
    pub fn result(&self) -> Option<&PayloadValue> {
        match &self.outcome {
            NotifyOutcome::Success { result } => Some(result),
            NotifyOutcome::Error { .. } => None,
        }
    }

    /// The failure message, when this is an error outcome
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            NotifyOutcome::Success { .. } => None,
            NotifyOutcome::Error { error } => Some(error),
        }
    }
}
