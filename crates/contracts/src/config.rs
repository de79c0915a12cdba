//! QueueConfig - static dispatch subsystem configuration
//!
//! Constructed once at startup and passed by reference into the dispatcher
//! and worker loop instances; no ambient globals.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::QueueError;

/// Default fan-out port
pub const DEFAULT_PORT: u16 = 27781;

/// Dispatch subsystem configuration
///
/// The notify channel (and with it the record-tracked variant) is present iff
/// `notify_port` is set; fire-and-forget is the same code path with the
/// channel absent.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct QueueConfig {
    /// Enable the send-side/dispatch role
    pub manager: bool,

    /// Enable the receive-side/execution role
    pub worker: bool,

    /// Single-process applet mode; force-disables the worker role
    pub applet: bool,

    /// Bind/connect host for both channels
    #[validate(length(min = 1, message = "host must not be empty"))]
    pub host: String,

    /// Fan-out channel port
    pub port: u16,

    /// Notification channel port; `None` disables outcome tracking
    pub notify_port: Option<u16>,

    /// Per-peer send queue capacity
    #[validate(range(min = 1, message = "queue_capacity must be > 0"))]
    pub queue_capacity: usize,

    /// Job record max age, duration string (reaper hint)
    pub job_max_age: String,

    /// Worker-side capability allow-list; `None` accepts any registered handler
    pub handlers: Option<Vec<String>>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            manager: true,
            worker: true,
            applet: false,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            notify_port: None,
            queue_capacity: 64,
            job_max_age: "5min".to_string(),
            handlers: None,
        }
    }
}

impl QueueConfig {
    /// Worker role after applying applet mode
    pub fn effective_worker(&self) -> bool {
        self.worker && !self.applet
    }

    /// Whether the notify channel (and record tracking) is configured
    pub fn notify_enabled(&self) -> bool {
        self.notify_port.is_some()
    }

    /// Parsed `job_max_age`
    pub fn job_max_age(&self) -> Result<Duration, QueueError> {
        parse_duration(&self.job_max_age)
            .ok_or_else(|| QueueError::config_validation("job_max_age", "invalid duration string"))
    }
}

/// Parse a duration string: integer value + unit (`ms`, `s`, `sec`, `m`,
/// `min`, `h`, `hr`, `d`); a bare integer means seconds.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let value: u64 = digits.parse().ok()?;

    let millis = match unit.trim() {
        "ms" => value,
        "" | "s" | "sec" | "secs" => value * 1_000,
        "m" | "min" | "mins" => value * 60_000,
        "h" | "hr" | "hrs" => value * 3_600_000,
        "d" => value * 86_400_000,
        _ => return None,
    };
    Some(Duration::from_millis(millis))
}
