//! Cholesterol imputation.
//!
//! Two strategies:
//! - per hospital, the mean cholesterol of patients with exactly the same age;
//! - across all hospitals, the lowest cholesterol within a 5-year age bracket.
//!
//! Both aggregate over the table as it was when the call started, so cells
//! filled during a call never feed back into it.

use crate::error::Result;
use crate::table::{AGE, CHOLESTEROL, HOSPITAL_ID, PatientColumns, float_lookup};
use crate::utils::float_key;
use polars::prelude::*;
use tracing::debug;

/// Width of an age bracket, in years.
pub const AGE_BRACKET_WIDTH: f64 = 5.0;

const AGE_BRACKET: &str = "age_bracket";

/// Lower bound of the age bracket containing `age` (`floor(age / 5) * 5`).
#[inline]
pub fn age_bracket(age: f64) -> f64 {
    (age / AGE_BRACKET_WIDTH).floor() * AGE_BRACKET_WIDTH
}

/// Cholesterol imputation strategies.
pub struct CholesterolImputer;

impl CholesterolImputer {
    /// Fill unknown cholesterol at `hospital_id` with the mean of same-age patients.
    ///
    /// Records with unknown age, or whose age has no known cholesterol at the
    /// hospital, stay null. Returns the filled rows in table order.
    pub fn impute_age_mean(columns: &mut PatientColumns, hospital_id: i64) -> Result<Vec<usize>> {
        let means = columns
            .to_frame()?
            .lazy()
            .filter(
                col(HOSPITAL_ID)
                    .eq(lit(hospital_id))
                    .and(col(AGE).is_not_null())
                    .and(col(CHOLESTEROL).is_not_null()),
            )
            .group_by([col(AGE)])
            .agg([col(CHOLESTEROL).mean()])
            .collect()?;
        let means = float_lookup(&means, AGE, CHOLESTEROL)?;

        let mut filled = Vec::new();
        for row in columns.hospital_rows(hospital_id) {
            if columns.cholesterol[row].is_some() {
                continue;
            }
            let Some(age) = columns.age[row] else {
                continue;
            };
            if let Some(&age_mean) = means.get(&float_key(age)) {
                columns.cholesterol[row] = Some(age_mean);
                filled.push(row);
            }
        }

        debug!(
            "Hospital {}: {} age group(s) with known cholesterol, {} filled",
            hospital_id,
            means.len(),
            filled.len()
        );
        Ok(filled)
    }

    /// Fill unknown cholesterol everywhere with the minimum of the age bracket.
    ///
    /// Minimums are taken over the whole table regardless of hospital.
    /// Records with unknown age have no bracket and are skipped.
    pub fn impute_bracket_minimum(columns: &mut PatientColumns) -> Result<Vec<usize>> {
        let brackets: Vec<Option<f64>> = columns.age.iter().map(|age| age.map(age_bracket)).collect();
        let mut table = columns.to_frame()?;
        table.with_column(Series::new(AGE_BRACKET.into(), brackets))?;

        let minimums = table
            .lazy()
            .filter(col(AGE_BRACKET).is_not_null().and(col(CHOLESTEROL).is_not_null()))
            .group_by([col(AGE_BRACKET)])
            .agg([col(CHOLESTEROL).min()])
            .collect()?;
        let minimums = float_lookup(&minimums, AGE_BRACKET, CHOLESTEROL)?;

        let mut filled = Vec::new();
        for row in 0..columns.len() {
            if columns.cholesterol[row].is_some() {
                continue;
            }
            let Some(age) = columns.age[row] else {
                continue;
            };
            if let Some(&minimum) = minimums.get(&float_key(age_bracket(age))) {
                columns.cholesterol[row] = Some(minimum);
                filled.push(row);
            }
        }

        debug!(
            "{} age bracket(s) with known cholesterol, {} filled",
            minimums.len(),
            filled.len()
        );
        Ok(filled)
    }
}
