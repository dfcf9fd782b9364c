//! Error types for fitsync-core

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the fitsync-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed TCX document
    #[error("XML error in {path}: {message}")]
    Xml { path: PathBuf, message: String },

    /// A raw file the normalizers rely on is not in the day folder
    #[error("missing raw file: {}", path.display())]
    MissingFile { path: PathBuf },

    /// The raw data does not match any known export format
    #[error("schema violation in {file}: {message}")]
    SchemaViolation { file: String, message: String },

    /// A scheduled day has not been fully downloaded yet
    #[error("day {date} is incomplete, missing: {}", missing.join(", "))]
    IncompleteDay { date: NaiveDate, missing: Vec<String> },

    /// Date or time string that could not be parsed
    #[error("invalid timestamp: {value}")]
    InvalidTimestamp { value: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a schema violation for the given raw file
    pub fn schema(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create an invalid timestamp error
    pub fn timestamp(value: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
        }
    }
}

/// Result type alias for fitsync-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_display() {
        let err = Error::schema("sleep.json", "unknown sleep type \"nap\"");
        assert_eq!(
            err.to_string(),
            "schema violation in sleep.json: unknown sleep type \"nap\""
        );
    }

    #[test]
    fn test_incomplete_day_lists_missing_files() {
        let err = Error::IncompleteDay {
            date: NaiveDate::from_ymd_opt(2021, 5, 10).unwrap(),
            missing: vec!["sleep.json".to_string(), "42.xml".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("2021-05-10"));
        assert!(msg.contains("sleep.json, 42.xml"));
    }
}
