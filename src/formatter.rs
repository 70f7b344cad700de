use crate::error::FormatError;
use crate::record::{FieldValue, LogRecord};
use crate::severity::SeverityMap;
use crate::timestamp::{self, Clock, TimestampHook, TIMESTAMP_KEY, TIME_KEY};
use serde_json::{Map, Value};

pub const SEVERITY_KEY: &str = "severity";
pub const MESSAGE_KEY: &str = "message";
pub const SOURCE_LOCATION_KEY: &str = "logging.googleapis.com/sourceLocation";

/// Keys written by the formatter itself. User fields with these names are
/// kept under `fields.<key>`; a user field already named `fields.<key>` is
/// overwritten by the renamed one.
const RESERVED_KEYS: [&str; 5] = [SEVERITY_KEY, MESSAGE_KEY, TIMESTAMP_KEY, TIME_KEY, SOURCE_LOCATION_KEY];

/// Options for [`Formatter`].
///
/// **Fields**
/// - `severity`: level → severity table. `None` writes the raw level name.
/// - `timestamp`: hook that injects the current time. `None` leaves
///   timestamping to whoever writes the entry.
/// - `clock`: source of the current time passed to `timestamp`.
/// - `pretty_print`: indent the JSON output.
/// - `disable_timestamp`: skip the timestamp hook even if one is set.
/// - `use_record_timestamp`: pass the record's own timestamp to the hook
///   instead of reading `clock`.
/// - `source_location`: emit `logging.googleapis.com/sourceLocation` for
///   records that know their file. Its `function` holds the module path
///   (or target), not a function name.
#[derive(Clone, Debug)]
pub struct FormatterConfig {
    pub severity: Option<SeverityMap>,
    pub timestamp: Option<TimestampHook>,
    pub clock: Clock,
    pub pretty_print: bool,
    pub disable_timestamp: bool,
    pub use_record_timestamp: bool,
    pub source_location: bool,
}

impl FormatterConfig {
    /// No severity mapping and no timestamp: records pass through with
    /// their raw level name.
    pub fn plain() -> Self {
        Self {
            severity: None,
            timestamp: None,
            clock: timestamp::system_clock,
            pretty_print: false,
            disable_timestamp: false,
            use_record_timestamp: false,
            source_location: false,
        }
    }

    /// Cloud Logging severities and structured `timestamp`.
    pub fn stackdriver() -> Self {
        Self {
            severity: Some(SeverityMap::stackdriver()),
            timestamp: Some(timestamp::structured_timestamp),
            ..Self::plain()
        }
    }

    pub fn severity_map(mut self, map: SeverityMap) -> Self {
        self.severity = Some(map);
        self
    }

    pub fn timestamp_hook(mut self, hook: TimestampHook) -> Self {
        self.timestamp = Some(hook);
        self
    }

    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn pretty_print(mut self, enabled: bool) -> Self {
        self.pretty_print = enabled;
        self
    }

    pub fn disable_timestamp(mut self, disabled: bool) -> Self {
        self.disable_timestamp = disabled;
        self
    }

    pub fn use_record_timestamp(mut self, enabled: bool) -> Self {
        self.use_record_timestamp = enabled;
        self
    }

    /// Emit `logging.googleapis.com/sourceLocation`. `tracing` does not
    /// record the calling function, so `function` is filled with the
    /// module path, or the target when there is none.
    pub fn source_location(mut self, enabled: bool) -> Self {
        self.source_location = enabled;
        self
    }
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self::stackdriver()
    }
}

/// Turns [`LogRecord`]s into Cloud Logging JSON entries.
///
/// Holds only the immutable configuration, so a single formatter can be
/// cloned or shared between threads and used concurrently.
#[derive(Clone, Debug)]
pub struct Formatter {
    config: FormatterConfig,
}

impl Formatter {
    /// Validate `config` and build a formatter from it.
    ///
    /// **Returns**
    /// - `Err(FormatError::Configuration)` if the severity table does not
    ///   cover every level.
    pub fn new(config: FormatterConfig) -> Result<Self, FormatError> {
        if let Some(map) = &config.severity {
            map.validate()?;
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Format one record into a single JSON entry (no trailing newline).
    ///
    /// Either the full entry is returned or an error; partial output is
    /// never produced.
    pub fn format(&self, record: &LogRecord) -> Result<Vec<u8>, FormatError> {
        let entry = self.build_entry(record)?;
        let bytes = if self.config.pretty_print {
            serde_json::to_vec_pretty(&entry)?
        } else {
            serde_json::to_vec(&entry)?
        };
        Ok(bytes)
    }

    /// Build the entry as a JSON map without serializing it.
    pub fn build_entry(&self, record: &LogRecord) -> Result<Map<String, Value>, FormatError> {
        let mut out = Map::new();

        for (key, value) in &record.fields {
            let value = match value {
                FieldValue::Json(v) => v.clone(),
                FieldValue::HttpRequest(req) => match req.encode() {
                    Some(encoded) => Value::Object(encoded),
                    None => continue,
                },
            };
            if RESERVED_KEYS.contains(&key.as_str()) {
                out.insert(format!("fields.{key}"), value);
            } else {
                out.insert(key.clone(), value);
            }
        }

        let severity = match &self.config.severity {
            Some(map) => map.map(record.level),
            None => record.level.as_str(),
        };
        out.insert(SEVERITY_KEY.to_string(), Value::from(severity));

        if let Some(message) = record.message.as_deref().filter(|m| !m.is_empty()) {
            out.insert(MESSAGE_KEY.to_string(), Value::from(message));
        }

        if self.config.source_location {
            if let Some(location) = source_location(record) {
                out.insert(SOURCE_LOCATION_KEY.to_string(), Value::Object(location));
            }
        }

        if !self.config.disable_timestamp {
            if let Some(hook) = self.config.timestamp {
                let now = if self.config.use_record_timestamp {
                    record.timestamp
                } else {
                    (self.config.clock)().ok_or(FormatError::Clock)?
                };
                hook(&mut out, now)?;
            }
        }

        Ok(out)
    }
}

// https://cloud.google.com/logging/docs/reference/v2/rest/v2/LogEntry#LogEntrySourceLocation
fn source_location(record: &LogRecord) -> Option<Map<String, Value>> {
    let file = record.file.as_deref()?;
    let mut location = Map::new();
    location.insert("file".to_string(), Value::from(file));
    if let Some(line) = record.line {
        location.insert("line".to_string(), Value::String(line.to_string()));
    }
    if let Some(function) = record.module_path.as_deref().or(record.target.as_deref()) {
        location.insert("function".to_string(), Value::from(function));
    }
    Some(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Level;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn fixed_clock() -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(1_600_000_000, 0).single()
    }

    fn broken_clock() -> Option<DateTime<Utc>> {
        None
    }

    fn decode(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn plain_config_passes_level_through() {
        let formatter = Formatter::new(FormatterConfig::plain()).unwrap();
        let out = formatter.format(&LogRecord::new(Level::Warning, "careful")).unwrap();
        assert_eq!(decode(&out), json!({"severity": "warning", "message": "careful"}));
    }

    #[test]
    fn incomplete_severity_table_fails_at_construction() {
        let config = FormatterConfig::stackdriver()
            .severity_map(SeverityMap::empty().with("info", "INFO"));
        assert!(matches!(
            Formatter::new(config),
            Err(FormatError::Configuration(_))
        ));
    }

    #[test]
    fn injects_structured_timestamp() {
        let formatter = Formatter::new(FormatterConfig::stackdriver().clock(fixed_clock)).unwrap();
        let out = formatter.format(&LogRecord::new(Level::Info, "tick")).unwrap();
        assert_eq!(
            decode(&out),
            json!({"severity": "INFO", "message": "tick", "timestamp": {"seconds": 1_600_000_000i64}})
        );
    }

    #[test]
    fn broken_clock_aborts_format() {
        let formatter = Formatter::new(FormatterConfig::stackdriver().clock(broken_clock)).unwrap();
        let err = formatter.format(&LogRecord::new(Level::Info, "tick")).unwrap_err();
        assert!(matches!(err, FormatError::Clock));
    }

    #[test]
    fn disabled_timestamp_skips_clock() {
        let config = FormatterConfig::stackdriver()
            .clock(broken_clock)
            .disable_timestamp(true);
        let formatter = Formatter::new(config).unwrap();
        let out = formatter.format(&LogRecord::new(Level::Debug, "quiet")).unwrap();
        assert_eq!(decode(&out), json!({"severity": "DEBUG", "message": "quiet"}));
    }

    #[test]
    fn record_timestamp_replaces_clock() {
        let config = FormatterConfig::stackdriver()
            .clock(broken_clock)
            .use_record_timestamp(true);
        let formatter = Formatter::new(config).unwrap();
        let mut record = LogRecord::new(Level::Info, "then");
        record.timestamp = Utc.timestamp_opt(86_400, 7).unwrap();

        let out = decode(&formatter.format(&record).unwrap());
        assert_eq!(out["timestamp"], json!({"seconds": 86_400, "nanos": 7}));
    }

    #[test]
    fn reserved_field_names_are_moved() {
        let formatter = Formatter::new(FormatterConfig::stackdriver().disable_timestamp(true)).unwrap();
        let record = LogRecord::new(Level::Error, "boom")
            .with_field("severity", "low")
            .with_field("message", "shadow");
        let out = formatter.format(&record).unwrap();
        assert_eq!(
            decode(&out),
            json!({
                "severity": "ERROR",
                "message": "boom",
                "fields.severity": "low",
                "fields.message": "shadow",
            })
        );
    }

    #[test]
    fn renamed_reserved_field_replaces_same_named_field() {
        let formatter = Formatter::new(FormatterConfig::stackdriver().disable_timestamp(true)).unwrap();
        let record = LogRecord::new(Level::Info, "clash")
            .with_field("fields.severity", "user")
            .with_field("severity", "renamed");
        let out = formatter.format(&record).unwrap();
        assert_eq!(
            decode(&out),
            json!({"severity": "INFO", "message": "clash", "fields.severity": "renamed"})
        );
    }

    #[test]
    fn source_location_prefers_module_path() {
        let formatter = Formatter::new(
            FormatterConfig::stackdriver()
                .disable_timestamp(true)
                .source_location(true),
        )
        .unwrap();
        let mut record = LogRecord::new(Level::Info, "here");
        record.file = Some("src/lib.rs".to_string());
        record.module_path = Some("app::handlers".to_string());
        record.target = Some("custom_target".to_string());

        let out = decode(&formatter.format(&record).unwrap());
        assert_eq!(out[SOURCE_LOCATION_KEY]["function"], "app::handlers");
        assert!(out[SOURCE_LOCATION_KEY].get("line").is_none());
    }

    #[test]
    fn source_location_from_record() {
        let formatter = Formatter::new(
            FormatterConfig::stackdriver()
                .disable_timestamp(true)
                .source_location(true),
        )
        .unwrap();
        let mut record = LogRecord::new(Level::Info, "here");
        record.file = Some("src/main.rs".to_string());
        record.line = Some(42);
        record.target = Some("app".to_string());

        let out = decode(&formatter.format(&record).unwrap());
        assert_eq!(
            out[SOURCE_LOCATION_KEY],
            json!({"file": "src/main.rs", "line": "42", "function": "app"})
        );
    }

    #[test]
    fn pretty_print_spans_lines() {
        let formatter = Formatter::new(
            FormatterConfig::stackdriver()
                .disable_timestamp(true)
                .pretty_print(true),
        )
        .unwrap();
        let out = formatter
            .format(&LogRecord::new(Level::Info, "hi").with_field("foo", "bar"))
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains('\n'));
        assert_eq!(
            decode(text.as_bytes()),
            json!({"severity": "INFO", "message": "hi", "foo": "bar"})
        );
    }

    #[test]
    fn formatter_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Formatter>();
    }
}
