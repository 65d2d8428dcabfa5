//! Structured log entries emitted alongside protocol events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry on the `log` event channel.
///
/// `log_type` follows a `direction.kind` scheme, e.g. `server.audio` or
/// `client.realtimeInput`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingLog {
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub log_type: String,
    pub message: LogMessage,
}

impl StreamingLog {
    pub fn new(log_type: impl Into<String>, message: impl Into<LogMessage>) -> Self {
        Self {
            date: Utc::now(),
            log_type: log_type.into(),
            message: message.into(),
        }
    }
}

/// Either a short description or the full structured payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogMessage {
    Text(String),
    Payload(Value),
}

impl LogMessage {
    /// Serialize any payload, falling back to its `Debug` rendering.
    pub fn payload<T: Serialize + std::fmt::Debug>(value: &T) -> Self {
        serde_json::to_value(value)
            .map(Self::Payload)
            .unwrap_or_else(|_| Self::Text(format!("{value:?}")))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Payload(_) => None,
        }
    }
}

impl From<&str> for LogMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for LogMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for LogMessage {
    fn from(value: Value) -> Self {
        Self::Payload(value)
    }
}
