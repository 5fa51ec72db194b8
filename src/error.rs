//! Error types for qc-oxide
//!
//! Every failure the QC core can hit is a variant of [`QcError`]; nothing
//! escapes as a panic. The presentation layer renders these in place of
//! the chart.

use thiserror::Error;

/// Main error type for QC evaluation
#[derive(Error, Debug)]
pub enum QcError {
    /// No column carries the `<analyte>-` prefix
    #[error("No control columns found for analyte '{analyte}'")]
    NoMatchingColumns { analyte: String },

    /// Fewer levels matched than standardization needs
    #[error("Analyte '{analyte}' has {found} control level(s), at least {required} required")]
    TooFewLevels {
        analyte: String,
        found: usize,
        required: usize,
    },

    /// A level's standard deviation is zero or not finite
    #[error("Control level '{level}' has a degenerate standard deviation ({std_dev})")]
    DegenerateSeries { level: String, std_dev: f64 },

    /// Date cell does not parse into a day, month and year
    #[error("Row {row}: malformed date '{value}'")]
    MalformedDate { row: usize, value: String },

    /// Insufficient data for operation
    #[error("Insufficient data: {operation} requires at least {required} points, but got {actual}")]
    InsufficientData {
        operation: String,
        required: usize,
        actual: usize,
    },

    /// No row survived filtering
    #[error("No usable rows for analyte '{analyte}'")]
    EmptyDataset { analyte: String },

    /// Column not found in data
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Polars data processing error
    #[error("Data processing error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// File I/O error (configuration files only)
    #[error("Failed to access file: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for QC operations
pub type Result<T> = std::result::Result<T, QcError>;

/// UI-friendly error message formatting
impl QcError {
    /// Get a user-friendly error message suitable for displaying in place of the chart
    pub fn user_message(&self) -> String {
        match self {
            QcError::NoMatchingColumns { analyte } => {
                format!("No controls found for '{}'", analyte)
            }
            QcError::TooFewLevels {
                analyte,
                found,
                required,
            } => format!(
                "'{}' needs {} control levels, only {} found",
                analyte, required, found
            ),
            QcError::DegenerateSeries { level, .. } => {
                format!("Control '{}' has no spread (SD is zero)", level)
            }
            QcError::MalformedDate { row, value } => {
                format!("Row {} has an unreadable date '{}'", row, value)
            }
            QcError::InsufficientData {
                operation,
                required,
                actual,
            } => format!(
                "{} requires {} points, but only {} available",
                operation, required, actual
            ),
            QcError::EmptyDataset { analyte } => format!("No usable data for '{}'", analyte),
            QcError::ColumnNotFound { column } => format!("Column '{}' not found", column),
            QcError::Config(msg) => format!("Config error: {}", msg),
            QcError::Polars(e) => format!("Data error: {}", e),
            QcError::Io(e) => format!("File error: {}", e),
            QcError::Json(e) => format!("JSON error: {}", e),
        }
    }

    /// Get a short title for the error (for toast notifications)
    pub fn title(&self) -> &'static str {
        match self {
            QcError::NoMatchingColumns { .. } => "No Matching Columns",
            QcError::TooFewLevels { .. } => "Too Few Levels",
            QcError::DegenerateSeries { .. } => "Degenerate Series",
            QcError::MalformedDate { .. } => "Malformed Date",
            QcError::InsufficientData { .. } => "Insufficient Data",
            QcError::EmptyDataset { .. } => "Empty Dataset",
            QcError::ColumnNotFound { .. } => "Column Not Found",
            QcError::Config(_) => "Configuration Error",
            QcError::Polars(_) => "Data Error",
            QcError::Io(_) => "File Error",
            QcError::Json(_) => "JSON Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = QcError::ColumnNotFound {
            column: "GLU-3".to_string(),
        };
        assert_eq!(err.user_message(), "Column 'GLU-3' not found");
        assert_eq!(err.title(), "Column Not Found");

        let err = QcError::InsufficientData {
            operation: "Standardization".to_string(),
            required: 2,
            actual: 1,
        };
        assert_eq!(
            err.user_message(),
            "Standardization requires 2 points, but only 1 available"
        );
    }

    #[test]
    fn test_degenerate_display_names_level() {
        let err = QcError::DegenerateSeries {
            level: "GLU-1".to_string(),
            std_dev: 0.0,
        };
        assert!(err.to_string().contains("GLU-1"));
        assert_eq!(err.title(), "Degenerate Series");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let qc_err: QcError = io_err.into();
        assert!(matches!(qc_err, QcError::Io(_)));
    }
}
