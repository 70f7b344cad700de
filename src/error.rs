/// Error type returned by the formatter and its configuration.
///
/// Every variant is local to a single call: a failed `format` never
/// produces partial output and never affects later calls.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// The formatter configuration is malformed, e.g. a severity table
    /// that does not cover every level.
    #[error("invalid formatter configuration: {0}")]
    Configuration(String),

    /// A level name outside the seven known levels.
    #[error("unknown log level: {0:?}")]
    UnknownLevel(String),

    /// The timestamp source could not provide the current time.
    #[error("clock unavailable")]
    Clock,

    /// Serializing the final entry (or a caller-supplied value) failed.
    #[error("failed to encode log entry: {0}")]
    Encoding(#[from] serde_json::Error),
}
