//! # Codec
//!
//! Envelope codec: job envelopes and notify messages to/from wire bytes.
//!
//! Responsibilities:
//! - One UTF-8 JSON document per frame, for both message kinds
//! - Payload normalization (reserved `error` kind reduction)
//! - Malformed bytes fail with a recoverable `Serialization` error
//!
//! # Example
//!
//! ```
//! use contracts::{JobEnvelope, Payload};
//!
//! let envelope = JobEnvelope::new("echo", Payload::new("string", "hi"));
//! let bytes = codec::encode_job(&envelope).unwrap();
//! let back = codec::decode_job(&bytes).unwrap();
//! assert_eq!(back, envelope);
//! ```

use bytes::Bytes;
use contracts::{JobEnvelope, NotifyMessage, Payload, PayloadValue, QueueError};

/// Encode a job envelope to wire bytes
pub fn encode_job(envelope: &JobEnvelope) -> Result<Bytes, QueueError> {
    to_bytes(envelope)
}

/// Decode wire bytes into a job envelope
pub fn decode_job(bytes: &[u8]) -> Result<JobEnvelope, QueueError> {
    from_bytes(bytes)
}

/// Encode a notify message to wire bytes
pub fn encode_notify(message: &NotifyMessage) -> Result<Bytes, QueueError> {
    to_bytes(message)
}

/// Decode wire bytes into a notify message
///
/// The tagged outcome makes malformed frames (missing `status`, or the wrong
/// field for the tag) plain decode errors.
pub fn decode_notify(bytes: &[u8]) -> Result<NotifyMessage, QueueError> {
    from_bytes(bytes)
}

/// Apply the reserved `error` kind reduction in place
///
/// An error-kind payload carries only its message string: an object with a
/// string `message` field collapses to that string; any other non-string
/// value collapses to its JSON text. Already-reduced payloads are untouched.
pub fn normalize_payload(payload: &mut Payload) {
    if !payload.is_error_kind() || payload.data.as_str().is_some() {
        return;
    }

    let message = match &payload.data {
        PayloadValue::Object(map) => map.get("message").and_then(|v| v.as_str()).map(String::from),
        _ => None,
    };
    let message = message.unwrap_or_else(|| {
        serde_json::Value::from(payload.data.clone()).to_string()
    });
    payload.data = PayloadValue::String(message);
}

fn to_bytes<T: serde::Serialize>(value: &T) -> Result<Bytes, QueueError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| QueueError::serialization(format!("encode failed: {e}")))
}

fn from_bytes<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, QueueError> {
    serde_json::from_slice(bytes)
        .map_err(|e| QueueError::serialization(format!("decode failed: {e}")))
}
