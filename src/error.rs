//! Unified error hierarchy for bodycomp
//!
//! Per-record conditions (missing fields, out-of-range fat%) are not errors.
//! Only configuration, storage and file-format problems surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all bodycomp operations
#[derive(Debug, Error)]
pub enum BodyCompError {
    /// Calibration table integrity errors
    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Import/export errors
    #[error("Import/Export error: {0}")]
    ImportExport(#[from] ImportExportError),
}

/// Calibration table errors, raised once when an engine is constructed
#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    /// Fewer anchors than needed to define a slope
    #[error("Fat bias table needs at least 2 anchors, found {count}")]
    TooFewAnchors { count: usize },

    /// Anchors out of order or sharing a weight
    #[error("Fat bias anchors must be strictly ascending by weight: anchor {index} ({weight}) does not exceed {previous}")]
    UnorderedAnchors {
        index: usize,
        weight: f64,
        previous: f64,
    },

    /// NaN or infinite constant
    #[error("Non-finite calibration constant: {field}={value}")]
    NonFinite { field: String, value: f64 },
}

/// Database operation errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Database directory could not be created
    #[error("Database directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// Import and export errors
#[derive(Debug, Error)]
pub enum ImportExportError {
    /// Unsupported format
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// CSV reader/writer failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying reader/writer failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing required column
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    /// Export failed
    #[error("Export failed to {path}: {reason}")]
    ExportFailed { path: PathBuf, reason: String },
}

/// Result type alias for bodycomp operations
pub type Result<T> = std::result::Result<T, BodyCompError>;

impl BodyCompError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BodyCompError::Calibration(_) => ErrorSeverity::Critical,
            BodyCompError::ImportExport(ImportExportError::MissingColumn { .. })
            | BodyCompError::ImportExport(ImportExportError::UnsupportedFormat { .. }) => {
                ErrorSeverity::Warning
            }
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            BodyCompError::Calibration(err) => {
                format!(
                    "Calibration tables are invalid ({}). Fix the [calibration] section of your config.",
                    err
                )
            }
            BodyCompError::Database(DatabaseError::Sqlite(_)) => {
                "Unable to open the measurement database. Please check your data directory."
                    .to_string()
            }
            BodyCompError::ImportExport(ImportExportError::MissingColumn { column }) => {
                format!("The CSV file has no '{}' column.", column)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Configuration is unusable, nothing can be calibrated
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = BodyCompError::Calibration(CalibrationError::TooFewAnchors { count: 1 });
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);

        let err = BodyCompError::ImportExport(ImportExportError::UnsupportedFormat {
            format: "xml".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);

        let err = BodyCompError::Database(DatabaseError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        )));
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_user_messages() {
        let err = BodyCompError::Calibration(CalibrationError::TooFewAnchors { count: 0 });
        assert!(err.user_message().contains("[calibration]"));

        let err = BodyCompError::ImportExport(ImportExportError::MissingColumn {
            column: "weight".to_string(),
        });
        assert!(err.user_message().contains("'weight'"));
    }
}
