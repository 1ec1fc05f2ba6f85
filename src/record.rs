use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;
use std::time::SystemTime;

/// Default name of the field holding the log message.
pub const DEFAULT_MESSAGE_KEY: &str = "msg";

/// Default name of the field holding a serialized error.
pub const DEFAULT_ERROR_KEY: &str = "err";

/// One structured log emission as produced by pino.
///
/// The record is kept as the raw JSON object so that arbitrary fields can be
/// forwarded, promoted to tags or attached as context.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    fields: Map<String, Value>,
}

impl LogRecord {
    /// Build a record from any JSON value. Only objects qualify.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(LogRecord { fields }),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Numeric pino level, floored.
    ///
    /// Numeric strings count as numbers, the way a JavaScript comparison
    /// coerces them. `None` when absent or not numeric.
    pub fn level(&self) -> Option<i64> {
        let level = match self.fields.get("level")? {
            Value::Number(n) => return n.as_i64().or_else(|| n.as_f64().map(|l| l.floor() as i64)),
            Value::String(s) if s.trim().is_empty() => 0.0,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (!level.is_nan()).then(|| level.floor() as i64)
    }

    /// The message field rendered as text. Strings are taken verbatim; any
    /// other JSON value is rendered as JSON.
    pub fn message(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(value_to_text)
    }

    /// The serialized error under `key`, if it is truthy.
    pub fn error(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|value| is_truthy(value))
    }

    /// pino's `time` field (epoch milliseconds) as a timestamp.
    pub fn time(&self) -> Option<SystemTime> {
        self.fields.get("time")?.as_i64().and_then(millis_to_time)
    }
}

/// Convert epoch milliseconds into a timestamp. `None` if out of range.
pub fn millis_to_time(millis: i64) -> Option<SystemTime> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(SystemTime::from)
}

/// Render a JSON value for a text slot (message, tag value).
///
/// `null` has no text form and yields `None`.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// JavaScript truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// An error rebuilt from its serialized form.
///
/// The stack is the producer's stack text, carried verbatim; nothing is
/// captured at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    pub ty: String,
    pub message: Option<String>,
    pub stack: Option<String>,
}

impl ReportedError {
    /// Rebuild an error from a serialized `{ type, message, stack, .. }`
    /// object.
    ///
    /// A value that is not an object, or lacks `message`, still produces an
    /// error; its message is simply empty.
    pub fn from_serialized(value: &Value) -> Self {
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_owned);

        ReportedError {
            ty: field("type")
                .or_else(|| field("name"))
                .unwrap_or_else(|| "Error".to_owned()),
            message: field("message"),
            stack: field("stack"),
        }
    }
}

impl fmt::Display for ReportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.ty, message),
            None => f.write_str(&self.ty),
        }
    }
}

impl Error for ReportedError {}
