//! Timestamp hooks.
//!
//! A hook receives the output map and the current time and inserts the
//! timestamp under a key the Cloud Logging agent recognises. Calling a hook
//! twice overwrites the previous value.
//!
//! See <https://cloud.google.com/logging/docs/agent/logging/configuration#timestamp-processing>.

use crate::error::FormatError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// Hook that injects a timestamp into the output map.
pub type TimestampHook = fn(&mut Map<String, Value>, DateTime<Utc>) -> Result<(), FormatError>;

/// Source of the current time. `None` means the clock is unavailable.
pub type Clock = fn() -> Option<DateTime<Utc>>;

/// Key used by [`structured_timestamp`].
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Key used by [`rfc3339_timestamp`].
pub const TIME_KEY: &str = "time";

/// Wall clock.
pub fn system_clock() -> Option<DateTime<Utc>> {
    Some(Utc::now())
}

/// Insert `now` as `"timestamp": {"seconds": .., "nanos": ..}`.
pub fn structured_timestamp(fields: &mut Map<String, Value>, now: DateTime<Utc>) -> Result<(), FormatError> {
    let value = seconds_nanos(now.timestamp(), now.timestamp_subsec_nanos());
    fields.insert(TIMESTAMP_KEY.to_string(), Value::Object(value));
    Ok(())
}

/// Insert `now` as `"time": "2024-05-01T12:00:00.123456789Z"`.
pub fn rfc3339_timestamp(fields: &mut Map<String, Value>, now: DateTime<Utc>) -> Result<(), FormatError> {
    let text = now.to_rfc3339_opts(SecondsFormat::AutoSi, true);
    fields.insert(TIME_KEY.to_string(), Value::String(text));
    Ok(())
}

/// `{seconds, nanos}` object in the protobuf JSON shape, which leaves out
/// zero components.
pub(crate) fn seconds_nanos(seconds: i64, nanos: u32) -> Map<String, Value> {
    let mut out = Map::new();
    if seconds != 0 {
        out.insert("seconds".to_string(), Value::from(seconds));
    }
    if nanos != 0 {
        out.insert("nanos".to_string(), Value::from(nanos));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn structured_timestamp_splits_seconds_and_nanos() {
        let now = Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap();
        let mut fields = Map::new();
        structured_timestamp(&mut fields, now).unwrap();

        assert_eq!(
            fields[TIMESTAMP_KEY],
            serde_json::json!({"seconds": 1_700_000_000i64, "nanos": 250_000_000})
        );
    }

    #[test]
    fn second_call_overwrites() {
        let mut fields = Map::new();
        structured_timestamp(&mut fields, Utc.timestamp_opt(10, 0).unwrap()).unwrap();
        structured_timestamp(&mut fields, Utc.timestamp_opt(20, 0).unwrap()).unwrap();

        assert_eq!(fields.len(), 1);
        assert_eq!(fields[TIMESTAMP_KEY], serde_json::json!({"seconds": 20}));
    }

    #[test]
    fn rfc3339_uses_time_key() {
        let now = Utc.timestamp_opt(0, 5_000_000).unwrap();
        let mut fields = Map::new();
        rfc3339_timestamp(&mut fields, now).unwrap();

        assert_eq!(fields[TIME_KEY], "1970-01-01T00:00:00.005Z");
    }
}
