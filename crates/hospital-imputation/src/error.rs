//! Custom error types for the imputation engine.
//!
//! This module provides the error hierarchy using `thiserror`. Undefined
//! aggregates (an empty median, mean or bracket minimum) are *not* errors:
//! the affected cells are simply left null. Errors are reserved for tables
//! that do not have the expected shape and for failures of the surrounding
//! loader/runner.
//!
//! Errors serialize as `{ code, message }` so they can be emitted in the
//! CLI's JSON output.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the imputation engine.
#[derive(Error, Debug)]
pub enum ImputationError {
    /// A required column is missing from the input table.
    #[error("Column '{0}' not found in patient table")]
    ColumnNotFound(String),

    /// The table has the right columns but unusable content (e.g. null ids).
    #[error("Invalid patient table: {0}")]
    InvalidTable(String),

    /// Too few records with both cholesterol and tomography known to fit a line.
    #[error("Not enough training data for regression: {samples} sample(s), need at least 2")]
    NoTrainableData { samples: usize },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The directory holding the hospital files does not exist.
    #[error("Input directory not found: {0}")]
    InputDirNotFound(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ImputationError>,
    },
}

impl ImputationError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ImputationError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, independent of the human-readable message.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidTable(_) => "INVALID_TABLE",
            Self::NoTrainableData { .. } => "NO_TRAINABLE_DATA",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InputDirNotFound(_) => "INPUT_DIR_NOT_FOUND",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error only means "nothing to regress on".
    ///
    /// Context wrappers are looked through.
    pub fn is_no_trainable_data(&self) -> bool {
        match self {
            Self::NoTrainableData { .. } => true,
            Self::WithContext { source, .. } => source.is_no_trainable_data(),
            _ => false,
        }
    }
}

impl Serialize for ImputationError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ImputationError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for imputation operations.
pub type Result<T> = std::result::Result<T, ImputationError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ImputationError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ImputationError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            ImputationError::ColumnNotFound("age".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            ImputationError::NoTrainableData { samples: 1 }.error_code(),
            "NO_TRAINABLE_DATA"
        );
    }

    #[test]
    fn test_is_no_trainable_data_through_context() {
        let error = ImputationError::NoTrainableData { samples: 0 }.with_context("Fitting");
        assert!(error.is_no_trainable_data());
        assert!(!ImputationError::InvalidTable("x".to_string()).is_no_trainable_data());
    }

    #[test]
    fn test_error_serialization() {
        let error = ImputationError::ColumnNotFound("cholesterol".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("cholesterol"));
    }

    #[test]
    fn test_with_context() {
        let error = ImputationError::InputDirNotFound("files".to_string())
            .with_context("While loading");
        assert!(error.to_string().contains("While loading"));
        assert_eq!(error.error_code(), "INPUT_DIR_NOT_FOUND");
    }

    #[test]
    fn test_io_context() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let error = result.context("Reading hospital1.csv").unwrap_err();
        assert_eq!(error.error_code(), "IO_ERROR");
        assert!(error.to_string().starts_with("Reading hospital1.csv"));
    }
}
