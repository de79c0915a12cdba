//! JobEnvelope - the manager-to-worker message unit
//!
//! Carries the handler name, typed payload and provenance tag. `job_id` is
//! present only when the record/notify variant is active and correlates the
//! envelope to at most one notify message.

use serde::{Deserialize, Serialize};

use crate::PayloadValue;

/// Reserved payload kind: data is reduced to an error message string
pub const ERROR_KIND: &str = "error";

/// Job payload: a caller-chosen kind tag plus the value itself
///
/// `kind` is free-form (`"string"`, `"object"`, …) with one reserved value,
/// [`ERROR_KIND`]: such payloads carry only the error's message string. The
/// reduction is intentionally lossy and one-way; stack traces and error
/// identity never cross the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Payload kind tag (`type` on the wire)
    #[serde(rename = "type")]
    pub kind: String,

    /// Payload value
    pub data: PayloadValue,
}

impl Payload {
    /// Create a payload with an explicit kind tag
    pub fn new(kind: impl Into<String>, data: impl Into<PayloadValue>) -> Self {
        Self {
            kind: kind.into(),
            data: data.into(),
        }
    }

    /// Create an error payload, reduced to the error's message string
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            kind: ERROR_KIND.to_string(),
            data: PayloadValue::String(err.to_string()),
        }
    }

    /// Create a regex payload
    pub fn regex(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            kind: "regex".to_string(),
            data: PayloadValue::regex(pattern, flags),
        }
    }

    /// Whether the payload carries the reserved error kind
    pub fn is_error_kind(&self) -> bool {
        self.kind == ERROR_KIND
    }
}

/// Job envelope sent over the fan-out channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    /// Record correlation id; set by the dispatcher in the record/notify variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    /// Capability name in the worker-side handler registry
    pub worker: String,

    /// Typed payload
    pub payload: Payload,

    /// Provenance tag: `namespace.subnamespace:path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Optional second handler invoked after the primary handler succeeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
}

impl JobEnvelope {
    /// Create an envelope for the given capability and payload
    pub fn new(worker: impl Into<String>, payload: Payload) -> Self {
        Self {
            job_id: None,
            worker: worker.into(),
            payload,
            source: None,
            callback: None,
        }
    }

    /// Attach a provenance tag
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a callback handler name
    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }
}
