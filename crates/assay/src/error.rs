//! Error types for the Assay library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Assay operations.
///
/// These errors stop a whole request: a file that cannot be read, an upload
/// in a format the boundary does not decode, or a settings document that
/// fails validation. Problems inside a single metric are [`MetricError`]s.
#[derive(Debug, Error)]
pub enum AssayError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Upload or file format not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Empty file or no data to score.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Columns of unequal length or other malformed table input.
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// Invalid settings document.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Workbook that could not be decoded.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),
}

/// Result type alias for Assay operations.
pub type Result<T> = std::result::Result<T, AssayError>;

/// Failure of one metric, or of one column inside a metric.
///
/// A `MetricError` never aborts sibling columns or sibling metrics; it is
/// recorded in the report as `{"status": "Error", "error": <message>}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    /// A requested column does not exist in the table.
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// A column handed to a numeric metric holds a non-numeric value.
    #[error("column '{column}' is not numeric (found '{value}')")]
    NotNumeric { column: String, value: String },

    /// The metric was invoked with an unusable configuration.
    #[error("{0}")]
    Configuration(String),
}
