//! Per-hospital median age imputation.

use crate::error::Result;
use crate::table::{AGE, HOSPITAL_ID, PatientColumns};
use polars::prelude::*;
use tracing::debug;

/// Fills unknown ages with the median known age of the same hospital.
pub struct AgeImputer;

impl AgeImputer {
    /// Impute the ages of `hospital_id` in place.
    ///
    /// Returns the rows that were filled, in table order. If no record of the
    /// hospital has a known age the median is undefined and nothing changes.
    pub fn impute_hospital_median(columns: &mut PatientColumns, hospital_id: i64) -> Result<Vec<usize>> {
        let table = columns.to_frame()?;
        let in_hospital = table
            .column(HOSPITAL_ID)?
            .as_materialized_series()
            .i64()?
            .equal(hospital_id);
        let ages = table.column(AGE)?.as_materialized_series().filter(&in_hospital)?;

        let Some(median_age) = ages.median() else {
            debug!("Hospital {}: no known ages, median undefined", hospital_id);
            return Ok(Vec::new());
        };

        let filled: Vec<usize> = columns
            .hospital_rows(hospital_id)
            .into_iter()
            .filter(|&row| columns.age[row].is_none())
            .collect();
        for &row in &filled {
            columns.age[row] = Some(median_age);
        }

        debug!(
            "Hospital {}: median age {:.2} over {} known value(s), {} filled",
            hospital_id,
            median_age,
            ages.len() - ages.null_count(),
            filled.len()
        );
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::PatientRecord;

    fn columns(records: &[(i64, i64, Option<f64>)]) -> PatientColumns {
        let records: Vec<PatientRecord> = records
            .iter()
            .map(|&(patient, hospital, age)| PatientRecord::new(patient, hospital, age, None, None))
            .collect();
        PatientColumns::from_records(&records)
    }

    #[test]
    fn test_single_known_value() {
        let mut cols = columns(&[(0, 0, Some(15.0)), (1, 0, None), (2, 1, None), (3, 1, Some(20.0))]);

        let filled = AgeImputer::impute_hospital_median(&mut cols, 1).unwrap();

        assert_eq!(filled, vec![2]);
        assert_eq!(cols.age, vec![Some(15.0), None, Some(20.0), Some(20.0)]);
    }

    #[test]
    fn test_even_count_averages_central_values() {
        let mut cols = columns(&[(3, 1, None), (4, 1, Some(20.0)), (5, 1, Some(20.2))]);

        let filled = AgeImputer::impute_hospital_median(&mut cols, 1).unwrap();

        assert_eq!(filled, vec![0]);
        assert!((cols.age[0].unwrap() - 20.1).abs() < 1e-9);
    }

    #[test]
    fn test_no_known_ages_is_noop() {
        let mut cols = columns(&[(0, 0, Some(15.0)), (1, 1, None), (2, 1, None)]);
        let before = cols.clone();

        let filled = AgeImputer::impute_hospital_median(&mut cols, 1).unwrap();

        assert!(filled.is_empty());
        assert_eq!(cols, before);
    }

    #[test]
    fn test_other_hospitals_untouched() {
        let mut cols = columns(&[(0, 2, None), (1, 1, Some(40.0)), (2, 2, Some(17.0))]);

        AgeImputer::impute_hospital_median(&mut cols, 1).unwrap();

        assert_eq!(cols.age[0], None);
    }
}
