//! Environment variable names used by this crate for convenient
//! configuration of the formatter and layer from microservices.
//!
//! These are purely helpers; [`FormatterConfig`] and [`LayerConfig`]
//! remain decoupled from environment access.

use crate::formatter::FormatterConfig;
use crate::init::LayerConfig;
use tracing::Level;

/// Indent JSON output (`true`/`1`/`yes`). Only useful for local reading.
pub const LOG_FORMAT_PRETTY_ENV: &str = "LOG_FORMAT_PRETTY";

/// Leave timestamps to the logging agent instead of injecting them.
pub const LOG_FORMAT_DISABLE_TIMESTAMP_ENV: &str = "LOG_FORMAT_DISABLE_TIMESTAMP";

/// Emit `logging.googleapis.com/sourceLocation` for each entry.
pub const LOG_FORMAT_SOURCE_LOCATION_ENV: &str = "LOG_FORMAT_SOURCE_LOCATION";

/// Most verbose level sent to the sink, e.g. `debug`.
pub const LOG_SINK_MIN_LEVEL_ENV: &str = "LOG_SINK_MIN_LEVEL";

/// Stackdriver formatter config with flags overridden from the
/// environment. Unset or unparsable variables keep their defaults.
pub fn formatter_config_from_env() -> FormatterConfig {
    formatter_config_from(|key| std::env::var(key).ok())
}

/// [`LayerConfig::default`] with the formatter flags and minimum level
/// overridden from the environment.
pub fn layer_config_from_env() -> LayerConfig {
    layer_config_from(|key| std::env::var(key).ok())
}

fn formatter_config_from(lookup: impl Fn(&str) -> Option<String>) -> FormatterConfig {
    let mut config = FormatterConfig::stackdriver();
    if let Some(pretty) = lookup(LOG_FORMAT_PRETTY_ENV).and_then(|v| parse_flag(&v)) {
        config = config.pretty_print(pretty);
    }
    if let Some(disabled) = lookup(LOG_FORMAT_DISABLE_TIMESTAMP_ENV).and_then(|v| parse_flag(&v)) {
        config = config.disable_timestamp(disabled);
    }
    if let Some(enabled) = lookup(LOG_FORMAT_SOURCE_LOCATION_ENV).and_then(|v| parse_flag(&v)) {
        config = config.source_location(enabled);
    }
    config
}

fn layer_config_from(lookup: impl Fn(&str) -> Option<String>) -> LayerConfig {
    let mut config = LayerConfig {
        formatter: formatter_config_from(&lookup),
        ..LayerConfig::default()
    };
    if let Some(level) = lookup(LOG_SINK_MIN_LEVEL_ENV).and_then(|v| v.trim().parse::<Level>().ok()) {
        config.min_level = level;
    }
    config
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
