//! Parsed log records.
//!
//! A record carries one mandatory field, the epoch-millisecond `_time` stamp, plus any number
//! of additional fields of arbitrary JSON type. Unknown keys are preserved verbatim.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One NDJSON log entry.
///
/// Deserialization fails when `_time` is absent or not a JSON number, which the stream
/// parser treats as a malformed line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Epoch milliseconds, kept as the original JSON number so integers stay integers.
    #[serde(rename = "_time")]
    pub time: Number,

    /// Every other field of the entry.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogRecord {
    /// Build a record from a timestamp and an existing field map.
    pub fn new(time_ms: i64, fields: Map<String, Value>) -> Self {
        Self {
            time: Number::from(time_ms),
            fields,
        }
    }

    /// Timestamp in epoch milliseconds.
    pub fn timestamp_ms(&self) -> f64 {
        self.time.as_f64().unwrap_or(0.0)
    }

    /// Look up an extra field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Convenience accessor for string-valued fields such as `level` or `message`.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// UTC timestamp formatted as `YYYY-MM-DD HH:MM:SS.mmm`.
    ///
    /// Out-of-range stamps fall back to the raw number.
    pub fn formatted_time(&self) -> String {
        DateTime::from_timestamp_millis(self.timestamp_ms() as i64)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| self.time.to_string())
    }

    /// Single-line JSON form of the whole record.
    pub fn summary(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
