//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Push attempted with the manager role disabled
    #[error("manager role is disabled")]
    ManagerDisabled,

    /// Required job field missing or empty
    #[error("missing required job field '{field}'")]
    MissingField { field: String },

    /// Error from the queue core (transport, codec, store)
    #[error(transparent)]
    Queue(#[from] contracts::QueueError),
}

impl DispatchError {
    /// Create a missing-field validation error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Whether this is a synchronous validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingField { .. } | Self::ManagerDisabled)
    }
}
