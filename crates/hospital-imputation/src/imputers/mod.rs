//! Imputation strategies for the patient table.
//!
//! This module provides:
//! - Per-hospital median age imputation
//! - Cholesterol imputation (per-hospital same-age mean, cross-hospital bracket minimum)
//! - Tomography imputation (duplicate sanitization + linear regression)
//!
//! Every imputer works in place on [`PatientColumns`](crate::table::PatientColumns)
//! and reports the rows it changed.

mod age;
mod cholesterol;
mod regression;
mod tomography;

pub use age::AgeImputer;
pub use cholesterol::{AGE_BRACKET_WIDTH, CholesterolImputer, age_bracket};
pub use regression::LinearRegression;
pub use tomography::{TomographyImputer, TomographyOutcome};
