//! PayloadValue - JSON-superset payload values
//!
//! The wire format is plain JSON, which has no native representation for
//! regular expressions. Instead of smuggling them through sentinel-prefixed
//! strings, a regex travels as an explicit tagged object
//! `{"$kind":"regex","pattern":…,"flags":…}` and decodes back to
//! [`PayloadValue::Regex`] only when the object has exactly that shape.

use std::collections::BTreeMap;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::QueueError;

/// Payload value carried inside a job envelope
///
/// A superset of JSON values: everything JSON-native plus a regex variant
/// carried as pattern + flags. Pattern and flags survive an encode/decode
/// round trip verbatim; compilation happens on demand via [`compile`].
///
/// [`compile`]: PayloadValue::compile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "serde_json::Value", from = "serde_json::Value")]
pub enum PayloadValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<PayloadValue>),
    Object(BTreeMap<String, PayloadValue>),
    /// Regular expression as source pattern + flag characters
    Regex { pattern: String, flags: String },
}

/// Tag value marking a regex object on the wire
const REGEX_KIND: &str = "regex";

impl PayloadValue {
    /// Create a regex value from pattern and flag characters
    pub fn regex(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            flags: flags.into(),
        }
    }

    /// Borrow the string content, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value is a regex
    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex { .. })
    }

    /// Compile a regex value into a usable matcher
    ///
    /// Flag characters map onto `RegexBuilder` switches: `i` (case-insensitive),
    /// `m` (multi-line), `s` (dot matches newline), `x` (ignore whitespace),
    /// `U` (swap greed). The JavaScript-only flags `g`, `u`, `y` and `d` affect
    /// iteration rather than pattern semantics and are accepted as no-ops.
    ///
    /// # Errors
    /// Non-regex values, unknown flag characters, and invalid patterns.
    pub fn compile(&self) -> Result<regex::Regex, QueueError> {
        let Self::Regex { pattern, flags } = self else {
            return Err(QueueError::serialization("value is not a regex"));
        };

        let mut builder = RegexBuilder::new(pattern);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                'U' => builder.swap_greed(true),
                'g' | 'u' | 'y' | 'd' => &mut builder,
                other => {
                    return Err(QueueError::serialization(format!(
                        "unsupported regex flag '{other}'"
                    )))
                }
            };
        }

        builder
            .build()
            .map_err(|e| QueueError::serialization(format!("invalid regex pattern: {e}")))
    }
}

impl From<PayloadValue> for serde_json::Value {
    fn from(value: PayloadValue) -> Self {
        match value {
            PayloadValue::Null => serde_json::Value::Null,
            PayloadValue::Bool(b) => serde_json::Value::Bool(b),
            PayloadValue::Number(n) => serde_json::Value::Number(n),
            PayloadValue::String(s) => serde_json::Value::String(s),
            PayloadValue::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            PayloadValue::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
            PayloadValue::Regex { pattern, flags } => serde_json::json!({
                "$kind": REGEX_KIND,
                "pattern": pattern,
                "flags": flags,
            }),
        }
    }
}

impl From<serde_json::Value> for PayloadValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => {
                if let Some((pattern, flags)) = as_regex_object(&map) {
                    return Self::Regex { pattern, flags };
                }
                Self::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// Match the exact tagged-regex wire shape, nothing looser
fn as_regex_object(map: &serde_json::Map<String, serde_json::Value>) -> Option<(String, String)> {
    if map.len() != 3 || map.get("$kind")?.as_str()? != REGEX_KIND {
        return None;
    }
    let pattern = map.get("pattern")?.as_str()?.to_string();
    let flags = map.get("flags")?.as_str()?.to_string();
    Some((pattern, flags))
}

impl From<&str> for PayloadValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for PayloadValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for PayloadValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}
