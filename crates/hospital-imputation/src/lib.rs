//! Hospital Patient Imputation Library
//!
//! Deterministic filling of missing patient measurements collected from
//! several hospitals, built on Polars.
//!
//! # Overview
//!
//! The core is [`ImputationEngine`], which owns a patient table with the
//! columns `patientID`, `hospitalID`, `age`, `cholesterol` and `tomography`
//! and provides four operations:
//!
//! - **`impute_age(hospital)`**: unknown ages become the hospital's median known age
//! - **`impute_cholesterol_single_hospital(hospital)`**: unknown cholesterol becomes
//!   the mean of patients of exactly the same age at that hospital
//! - **`impute_cholesterol()`**: unknown cholesterol becomes the lowest known value
//!   of the patient's 5-year age bracket, across all hospitals
//! - **`impute_tomography()`**: duplicate patients are reconciled by majority vote,
//!   then unknown tomography is predicted by a linear regression on cholesterol
//!
//! Each operation returns a table of exactly the rows it changed, in table order.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hospital_imputation::ImputationEngine;
//! use polars::prelude::*;
//!
//! let df = df![
//!     "patientID" => [0i64, 1, 2, 3],
//!     "hospitalID" => [0i64, 0, 1, 1],
//!     "age" => [Some(15.0), None, None, Some(20.0)],
//!     "cholesterol" => [Some(0.0), Some(42.0), None, Some(10.0)],
//!     "tomography" => [Some(0.0), Some(12.0), Some(100.0), None],
//! ]?;
//!
//! let mut engine = ImputationEngine::new(df)?;
//! let changed = engine.impute_age(1)?;
//! assert_eq!(changed.height(), 1);
//! ```
//!
//! # Loading Hospital Files
//!
//! [`ImputationRunner`] wraps the engine with a loader for one CSV file per
//! hospital and an in-memory [`PatientStore`]:
//!
//! ```rust,ignore
//! use hospital_imputation::{ImputationConfig, ImputationRunner};
//!
//! let config = ImputationConfig::builder()
//!     .input_dir("files")
//!     .output_path("output/patients.csv")
//!     .build()?;
//!
//! let output = ImputationRunner::new(config)?.run()?;
//! println!("{} rows changed", output.summary.rows_changed_total());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod runner;
pub mod store;
pub mod table;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{ConfigValidationError, ImputationConfig, ImputationConfigBuilder, ImputationSteps};
pub use engine::ImputationEngine;
pub use error::{ImputationError, Result as ImputationResult, ResultExt};
pub use imputers::{
    AgeImputer, CholesterolImputer, LinearRegression, TomographyImputer, TomographyOutcome,
};
pub use loader::{LoadReport, LoadedFile};
pub use runner::{ImputationRunner, RunOutput};
pub use store::{PatientStore, StoreSession, UpsertStats};
pub use table::{PatientColumns, PatientRecord, ResultColumns};
pub use types::{ImputationOperation, ImputationStep, ImputationSummary};
pub use utils::{Majority, numeric_mode};
