//! Layered error definitions
//!
//! Categorized by source: config / validation / transport / serialization / handler / store

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum QueueError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Job Validation Errors =====
    /// Required job field missing or empty
    #[error("job validation error at '{field}': {message}")]
    Validation { field: String, message: String },

    // ===== Transport Errors =====
    /// Bind/connect/send/receive failure
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Non-blocking send found no connected peer with queue capacity
    #[error("no ready peer: {message}")]
    NoReadyPeer { message: String },

    // ===== Serialization Errors =====
    /// Malformed wire bytes
    #[error("serialization error: {message}")]
    Serialization { message: String },

    // ===== Handler Errors =====
    /// Failure raised by an invoked job handler
    #[error("handler '{worker}' failed: {message}")]
    Handler { worker: String, message: String },

    /// Capability name not present in the handler registry
    #[error("unknown worker handler: {worker}")]
    UnknownHandler { worker: String },

    // ===== Store Errors =====
    /// Job record store failure
    #[error("store error: {message}")]
    Store { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl QueueError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create job validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create no-ready-peer error
    pub fn no_ready_peer(message: impl Into<String>) -> Self {
        Self::NoReadyPeer {
            message: message.into(),
        }
    }

    /// Create serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create handler error
    pub fn handler(worker: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            worker: worker.into(),
            message: message.into(),
        }
    }

    /// Create store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Message string carried over the notify channel; error identity stays local
    pub fn wire_message(&self) -> String {
        match self {
            Self::Handler { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
