//! Configuration for an imputation run.
//!
//! The engine itself takes no configuration; these options drive the
//! [`ImputationRunner`](crate::runner::ImputationRunner): where hospital files
//! come from, which steps run, and where the cleaned table goes.

use crate::error::ImputationError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which imputation operations a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImputationSteps {
    /// Per-hospital median age.
    pub age: bool,
    /// Per-hospital same-age mean cholesterol.
    pub cholesterol_single_hospital: bool,
    /// Cross-hospital 5-year bracket minimum cholesterol.
    pub cholesterol_brackets: bool,
    /// Duplicate sanitization + regression for tomography.
    pub tomography: bool,
}

impl Default for ImputationSteps {
    fn default() -> Self {
        Self {
            age: true,
            cholesterol_single_hospital: true,
            cholesterol_brackets: true,
            tomography: true,
        }
    }
}

impl ImputationSteps {
    pub fn any(&self) -> bool {
        self.age || self.cholesterol_single_hospital || self.cholesterol_brackets || self.tomography
    }
}

/// Configuration for an imputation run.
///
/// Use [`ImputationConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use hospital_imputation::config::ImputationConfig;
///
/// let config = ImputationConfig::builder()
///     .input_dir("files")
///     .hospitals(vec![1, 2])
///     .output_path("output/patients.csv")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputationConfig {
    /// Directory holding one delimited file per hospital.
    /// Default: "files"
    pub input_dir: PathBuf,

    /// Extension of hospital files (without the dot).
    /// Default: "csv"
    pub file_extension: String,

    /// Field separator of hospital files.
    /// Default: b','
    pub separator: u8,

    /// Hospitals the per-hospital steps run for.
    /// If None, every hospital present in the loaded table is used.
    /// Default: None
    pub hospitals: Option<Vec<i64>>,

    /// Steps to run.
    /// Default: all
    pub steps: ImputationSteps,

    /// Destination of the cleaned table as CSV.
    /// Default: None
    pub output_path: Option<PathBuf>,

    /// Whether to write the cleaned table to `output_path`.
    /// When false, results are kept in memory only.
    /// Default: false
    pub save_to_disk: bool,
}

impl Default for ImputationConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("files"),
            file_extension: "csv".to_string(),
            separator: b',',
            hospitals: None,
            steps: ImputationSteps::default(),
            output_path: None,
            save_to_disk: false,
        }
    }
}

impl ImputationConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ImputationConfigBuilder {
        ImputationConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.file_extension.trim_start_matches('.').is_empty() {
            return Err(ConfigValidationError::EmptyFileExtension);
        }

        if !self.separator.is_ascii() || matches!(self.separator, b'"' | b'\n' | b'\r') {
            return Err(ConfigValidationError::InvalidSeparator(self.separator));
        }

        if self.save_to_disk && self.output_path.is_none() {
            return Err(ConfigValidationError::MissingOutputPath);
        }

        if !self.steps.any() {
            return Err(ConfigValidationError::NoStepsEnabled);
        }

        Ok(())
    }

    /// File extension without a leading dot.
    pub fn extension(&self) -> &str {
        self.file_extension.trim_start_matches('.')
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("File extension must not be empty")]
    EmptyFileExtension,

    #[error("Invalid separator byte {0:#04x} (must be ASCII and not a quote or newline)")]
    InvalidSeparator(u8),

    #[error("save_to_disk is enabled but no output path is set")]
    MissingOutputPath,

    #[error("At least one imputation step must be enabled")]
    NoStepsEnabled,
}

impl From<ConfigValidationError> for ImputationError {
    fn from(error: ConfigValidationError) -> Self {
        ImputationError::InvalidConfig(error.to_string())
    }
}

/// Builder for [`ImputationConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ImputationConfigBuilder {
    input_dir: Option<PathBuf>,
    file_extension: Option<String>,
    separator: Option<u8>,
    hospitals: Option<Vec<i64>>,
    steps: Option<ImputationSteps>,
    output_path: Option<PathBuf>,
    save_to_disk: Option<bool>,
}

impl ImputationConfigBuilder {
    /// Set the directory holding the hospital files.
    pub fn input_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_dir = Some(path.into());
        self
    }

    /// Set the extension of hospital files, e.g. "csv" or "tsv".
    pub fn file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = Some(extension.into());
        self
    }

    /// Set the field separator of hospital files.
    pub fn separator(mut self, separator: u8) -> Self {
        self.separator = Some(separator);
        self
    }

    /// Restrict the per-hospital steps to these hospitals.
    pub fn hospitals(mut self, hospitals: Vec<i64>) -> Self {
        self.hospitals = Some(hospitals);
        self
    }

    /// Set which steps run.
    pub fn steps(mut self, steps: ImputationSteps) -> Self {
        self.steps = Some(steps);
        self
    }

    /// Set the CSV destination of the cleaned table.
    ///
    /// Setting a path also enables `save_to_disk` unless it was set explicitly.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Enable or disable writing the cleaned table.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ImputationConfig` or an error if validation fails.
    pub fn build(self) -> Result<ImputationConfig, ConfigValidationError> {
        let save_to_disk = self
            .save_to_disk
            .unwrap_or(self.output_path.is_some());

        let config = ImputationConfig {
            input_dir: self.input_dir.unwrap_or_else(|| PathBuf::from("files")),
            file_extension: self.file_extension.unwrap_or_else(|| "csv".to_string()),
            separator: self.separator.unwrap_or(b','),
            hospitals: self.hospitals,
            steps: self.steps.unwrap_or_default(),
            output_path: self.output_path,
            save_to_disk,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ImputationConfig::default();
        assert_eq!(config.input_dir, PathBuf::from("files"));
        assert_eq!(config.extension(), "csv");
        assert_eq!(config.separator, b',');
        assert!(config.hospitals.is_none());
        assert_eq!(config.steps, ImputationSteps::default());
        assert!(!config.save_to_disk);
    }

    #[test]
    fn test_builder_defaults() {
        let config = ImputationConfig::builder().build().unwrap();
        assert_eq!(config.file_extension, "csv");
        assert!(config.steps.tomography);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ImputationConfig::builder()
            .input_dir("data/hospitals")
            .file_extension(".tsv")
            .separator(b'\t')
            .hospitals(vec![2, 1])
            .output_path("out/clean.csv")
            .build()
            .unwrap();

        assert_eq!(config.input_dir, PathBuf::from("data/hospitals"));
        assert_eq!(config.extension(), "tsv");
        assert_eq!(config.separator, b'\t');
        assert_eq!(config.hospitals, Some(vec![2, 1]));
        assert!(config.save_to_disk);
    }

    #[test]
    fn test_output_path_without_saving() {
        let config = ImputationConfig::builder()
            .output_path("out/clean.csv")
            .save_to_disk(false)
            .build()
            .unwrap();
        assert!(!config.save_to_disk);
    }

    #[test]
    fn test_validation_missing_output_path() {
        let result = ImputationConfig::builder().save_to_disk(true).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::MissingOutputPath
        ));
    }

    #[test]
    fn test_validation_invalid_separator() {
        let result = ImputationConfig::builder().separator(b'"').build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidSeparator(b'"')
        ));
    }

    #[test]
    fn test_validation_no_steps() {
        let steps = ImputationSteps {
            age: false,
            cholesterol_single_hospital: false,
            cholesterol_brackets: false,
            tomography: false,
        };
        let result = ImputationConfig::builder().steps(steps).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::NoStepsEnabled
        ));
    }

    #[test]
    fn test_validation_error_converts() {
        let error: ImputationError = ConfigValidationError::EmptyFileExtension.into();
        assert_eq!(error.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "input_dir": "files",
            "file_extension": "csv",
            "separator": 59,
            "hospitals": [1, 3],
            "steps": {
                "age": true,
                "cholesterol_single_hospital": false,
                "cholesterol_brackets": true,
                "tomography": true
            },
            "output_path": "clean.csv",
            "save_to_disk": true
        }"#;

        let config: ImputationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.separator, b';');
        assert_eq!(config.hospitals, Some(vec![1, 3]));
        assert!(!config.steps.cholesterol_single_hospital);
        assert!(config.validate().is_ok());
    }
}
