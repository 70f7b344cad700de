use crate::error::FormatError;
use crate::record::Level;
use std::collections::BTreeMap;

/// Mapping from level name to the backend's severity string.
///
/// Built once when the formatter is configured and read-only afterwards.
/// A table handed to [`Formatter::new`](crate::formatter::Formatter::new)
/// must cover every [`Level`], so [`SeverityMap::map`] never falls through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityMap {
    table: BTreeMap<String, String>,
}

impl SeverityMap {
    /// Empty table, to be filled with [`SeverityMap::with`].
    pub fn empty() -> Self {
        Self { table: BTreeMap::new() }
    }

    /// Cloud Logging severities.
    ///
    /// See <https://cloud.google.com/logging/docs/reference/v2/rest/v2/LogEntry#LogSeverity>.
    pub fn stackdriver() -> Self {
        Self::empty()
            .with("panic", "CRITICAL")
            .with("fatal", "CRITICAL")
            .with("error", "ERROR")
            .with("warning", "WARNING")
            .with("info", "INFO")
            .with("debug", "DEBUG")
            .with("trace", "DEBUG")
    }

    /// Set the severity for one level name.
    pub fn with(mut self, level: impl Into<String>, severity: impl Into<String>) -> Self {
        self.table.insert(level.into(), severity.into());
        self
    }

    /// Check that every level has an entry and no entry names an
    /// unknown level.
    pub fn validate(&self) -> Result<(), FormatError> {
        if let Some(unknown) = self
            .table
            .keys()
            .find(|name| !Level::ALL.iter().any(|level| level.as_str() == name.as_str()))
        {
            return Err(FormatError::Configuration(format!(
                "severity table names unknown level {unknown:?}"
            )));
        }

        let missing: Vec<&str> = Level::ALL
            .iter()
            .map(Level::as_str)
            .filter(|name| !self.table.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(FormatError::Configuration(format!(
                "severity table has no entry for {}",
                missing.join(", ")
            )));
        }

        if let Some((level, _)) = self.table.iter().find(|(_, severity)| severity.is_empty()) {
            return Err(FormatError::Configuration(format!(
                "severity for level {level:?} is empty"
            )));
        }

        Ok(())
    }

    /// Severity string for `level`.
    ///
    /// Falls back to the raw level name when the table has no entry,
    /// which only happens for tables that skipped [`SeverityMap::validate`].
    pub fn map(&self, level: Level) -> &str {
        self.table
            .get(level.as_str())
            .map(String::as_str)
            .unwrap_or_else(|| level.as_str())
    }
}

impl Default for SeverityMap {
    fn default() -> Self {
        Self::stackdriver()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stackdriver_table() {
        let map = SeverityMap::stackdriver();
        map.validate().unwrap();

        let expected = [
            (Level::Panic, "CRITICAL"),
            (Level::Fatal, "CRITICAL"),
            (Level::Error, "ERROR"),
            (Level::Warning, "WARNING"),
            (Level::Info, "INFO"),
            (Level::Debug, "DEBUG"),
            (Level::Trace, "DEBUG"),
        ];
        for (level, severity) in expected {
            assert_eq!(map.map(level), severity, "level {level}");
        }
    }

    #[test]
    fn incomplete_table_is_rejected() {
        let map = SeverityMap::empty().with("info", "INFO").with("error", "ERROR");
        let err = map.validate().unwrap_err();
        match err {
            FormatError::Configuration(msg) => {
                assert!(msg.contains("trace"));
                assert!(msg.contains("panic"));
                assert!(!msg.contains("info"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_level_name_is_rejected() {
        let map = SeverityMap::stackdriver().with("notice", "NOTICE");
        assert!(matches!(map.validate(), Err(FormatError::Configuration(_))));
    }

    #[test]
    fn empty_severity_is_rejected() {
        let map = SeverityMap::stackdriver().with("debug", "");
        assert!(matches!(map.validate(), Err(FormatError::Configuration(_))));
    }

    #[test]
    fn unvalidated_table_passes_level_through() {
        let map = SeverityMap::empty().with("info", "INFO");
        assert_eq!(map.map(Level::Info), "INFO");
        assert_eq!(map.map(Level::Fatal), "fatal");
    }
}
