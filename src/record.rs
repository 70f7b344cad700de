use crate::error::FormatError;
use crate::http_request::HttpRequest;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// Log level of a [`LogRecord`].
///
/// Covers the seven levels of classic leveled loggers; `tracing` events
/// only ever produce the lower five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
    Panic,
}

impl Level {
    /// Every level, most verbose first.
    pub const ALL: [Level; 7] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Fatal,
        Level::Panic,
    ];

    /// Lowercase level name, as used as key in a severity table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
            Level::Panic => "panic",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Level::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == lower)
            .or(match lower.as_str() {
                "warn" => Some(Level::Warning),
                _ => None,
            })
            .ok_or_else(|| FormatError::UnknownLevel(s.to_string()))
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warning,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Value of a single user field.
///
/// HTTP request metadata gets its own variant so the formatter can
/// recognise it without inspecting the JSON shape.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Json(serde_json::Value),
    HttpRequest(Box<HttpRequest>),
}

impl FieldValue {
    /// String representation of an error, as attached under `error`.
    pub fn error(err: &dyn Error) -> Self {
        FieldValue::Json(serde_json::Value::String(err.to_string()))
    }

    /// Convert any serializable value into a field.
    ///
    /// Fails with [`FormatError::Encoding`] when the value has no JSON
    /// representation (e.g. a map with non-string keys).
    pub fn serialized<T: Serialize + ?Sized>(value: &T) -> Result<Self, FormatError> {
        Ok(FieldValue::Json(serde_json::to_value(value)?))
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        FieldValue::Json(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Json(serde_json::Value::from(value))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Json(serde_json::Value::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Json(serde_json::Value::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Json(serde_json::Value::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Json(serde_json::Value::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Json(serde_json::Value::from(value))
    }
}

impl From<HttpRequest> for FieldValue {
    fn from(value: HttpRequest) -> Self {
        FieldValue::HttpRequest(Box::new(value))
    }
}

/// One log entry before formatting.
///
/// Built per log call, either by [`StackdriverLayer`](crate::layer::StackdriverLayer)
/// from a `tracing` event or directly by the caller.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: Option<String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub target: Option<String>,
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl LogRecord {
    /// Record stamped with the current time and no fields.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: Some(message.into()),
            fields: BTreeMap::new(),
            target: None,
            module_path: None,
            file: None,
            line: None,
        }
    }

    /// Add a field, replacing any previous value under the same key.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Attach an error's string representation under `error`.
    pub fn with_error(mut self, err: &dyn Error) -> Self {
        self.fields.insert("error".to_string(), FieldValue::error(err));
        self
    }
}
