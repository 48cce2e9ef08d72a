//! Tomography imputation by linear regression on cholesterol.
//!
//! Runs in two phases:
//!
//! 1. **Sanitization.** A patient seen at several hospitals should carry the
//!    same cholesterol and tomography everywhere. For each patient and each of
//!    the two columns, if the known values have a unique mode, every record of
//!    the patient is set to it (known minority values included). Singleton
//!    groups and tied modes are left alone.
//! 2. **Prediction.** A line `tomography = slope * cholesterol + intercept` is
//!    fitted on records with both values known, then used to fill tomography
//!    wherever cholesterol is known and tomography is not.

use crate::error::Result;
use crate::imputers::regression::LinearRegression;
use crate::table::PatientColumns;
use crate::utils::{Majority, numeric_mode};
use std::collections::HashMap;
use tracing::debug;

/// What a tomography pass changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TomographyOutcome {
    /// Rows where sanitization replaced a previously known value.
    pub sanitized_rows: Vec<usize>,
    /// Rows whose tomography was predicted by the regression.
    pub predicted_rows: Vec<usize>,
    /// The fitted model, if there was enough data to fit one.
    pub model: Option<LinearRegression>,
}

impl TomographyOutcome {
    /// Union of sanitized and predicted rows, in table order, without repeats.
    pub fn changed_rows(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self
            .sanitized_rows
            .iter()
            .chain(&self.predicted_rows)
            .copied()
            .collect();
        rows.sort_unstable();
        rows.dedup();
        rows
    }
}

/// Sanitizes duplicate patients, then regresses tomography on cholesterol.
pub struct TomographyImputer;

impl TomographyImputer {
    /// Run both phases over the whole table.
    ///
    /// If no record has a known cholesterol there is nothing to regress on:
    /// the table is left untouched, sanitization included.
    pub fn impute(columns: &mut PatientColumns) -> Result<TomographyOutcome> {
        if columns.cholesterol.iter().all(Option::is_none) {
            debug!("No known cholesterol values, skipping tomography imputation");
            return Ok(TomographyOutcome::default());
        }

        let cholesterol_before = columns.cholesterol.clone();
        let tomography_before = columns.tomography.clone();

        let rewritten = Self::sanitize_duplicates(columns);
        let sanitized_rows: Vec<usize> = (0..columns.len())
            .filter(|&row| {
                replaced_known(cholesterol_before[row], columns.cholesterol[row])
                    || replaced_known(tomography_before[row], columns.tomography[row])
            })
            .collect();
        debug!(
            "Sanitization rewrote {} cell(s), {} row(s) lost a known value",
            rewritten,
            sanitized_rows.len()
        );

        let samples: Vec<(f64, f64)> = columns
            .cholesterol
            .iter()
            .zip(&columns.tomography)
            .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
            .collect();

        let model = match LinearRegression::fit(&samples) {
            Ok(model) => model,
            Err(e) if e.is_no_trainable_data() => {
                debug!("Skipping tomography prediction: {}", e);
                return Ok(TomographyOutcome {
                    sanitized_rows,
                    ..Default::default()
                });
            }
            Err(e) => return Err(e),
        };
        debug!(
            "Fitted tomography = {:.4} * cholesterol + {:.4} on {} sample(s)",
            model.slope,
            model.intercept,
            samples.len()
        );

        let mut predicted_rows = Vec::new();
        for row in 0..columns.len() {
            if let (Some(cholesterol), None) = (columns.cholesterol[row], columns.tomography[row]) {
                columns.tomography[row] = Some(model.predict(cholesterol));
                predicted_rows.push(row);
            }
        }

        Ok(TomographyOutcome {
            sanitized_rows,
            predicted_rows,
            model: Some(model),
        })
    }

    /// Reconcile cholesterol and tomography across each patient's records.
    ///
    /// Returns the number of cells rewritten (fills from null included).
    pub fn sanitize_duplicates(columns: &mut PatientColumns) -> usize {
        let mut groups: HashMap<i64, Vec<usize>> = HashMap::new();
        for (row, patient_id) in columns.patient_id.iter().enumerate() {
            groups.entry(*patient_id).or_default().push(row);
        }

        let groups: Vec<Vec<usize>> = groups.into_values().collect();
        reconcile(&groups, &mut columns.cholesterol) + reconcile(&groups, &mut columns.tomography)
    }
}

/// Apply the unique mode of each group to `column`.
fn reconcile(groups: &[Vec<usize>], column: &mut [Option<f64>]) -> usize {
    let mut rewritten = 0;
    for rows in groups {
        let cells: Vec<Option<f64>> = rows.iter().map(|&row| column[row]).collect();
        let Majority::Unique(value) = numeric_mode(&cells) else {
            continue;
        };
        for &row in rows {
            if column[row] != Some(value) {
                column[row] = Some(value);
                rewritten += 1;
            }
        }
    }
    rewritten
}

/// A known value was replaced by a different one. Fills from null do not count.
fn replaced_known(before: Option<f64>, after: Option<f64>) -> bool {
    before.is_some() && before != after
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::PatientRecord;

    fn columns(records: &[(i64, i64, Option<f64>, Option<f64>)]) -> PatientColumns {
        let records: Vec<PatientRecord> = records
            .iter()
            .map(|&(patient, hospital, cholesterol, tomography)| {
                PatientRecord::new(patient, hospital, None, cholesterol, tomography)
            })
            .collect();
        PatientColumns::from_records(&records)
    }

    #[test]
    fn test_sanitize_unique_mode_overwrites_minority() {
        let mut cols = columns(&[
            (1, 4, Some(0.0), Some(0.0)),
            (1, 0, Some(0.0), Some(200.0)),
            (1, 1, Some(42.0), Some(0.0)),
        ]);

        let rewritten = TomographyImputer::sanitize_duplicates(&mut cols);

        assert_eq!(rewritten, 2);
        assert_eq!(cols.cholesterol, vec![Some(0.0); 3]);
        assert_eq!(cols.tomography, vec![Some(0.0); 3]);
    }

    #[test]
    fn test_sanitize_tie_is_left_alone() {
        let mut cols = columns(&[(1, 0, Some(10.0), None), (1, 1, Some(20.0), None)]);
        let before = cols.clone();

        assert_eq!(TomographyImputer::sanitize_duplicates(&mut cols), 0);
        assert_eq!(cols, before);
    }

    #[test]
    fn test_sanitize_fills_null_from_mode() {
        let mut cols = columns(&[(5, 0, Some(180.0), None), (5, 1, None, None)]);

        assert_eq!(TomographyImputer::sanitize_duplicates(&mut cols), 1);
        assert_eq!(cols.cholesterol, vec![Some(180.0), Some(180.0)]);
    }

    #[test]
    fn test_interpolate_between_two_points() {
        let mut cols = columns(&[
            (0, 0, Some(0.0), Some(0.0)),
            (1, 0, Some(100.0), Some(200.0)),
            (3, 2, Some(10.0), None),
        ]);

        let outcome = TomographyImputer::impute(&mut cols).unwrap();

        assert_eq!(outcome.predicted_rows, vec![2]);
        assert!(outcome.sanitized_rows.is_empty());
        assert!((cols.tomography[2].unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_cholesterol_null_short_circuits() {
        // Patient 1 would be sanitized to 5.0 if the pass ran
        let mut cols = columns(&[(1, 0, None, Some(5.0)), (1, 1, None, Some(5.0)), (1, 2, None, None)]);
        let before = cols.clone();

        let outcome = TomographyImputer::impute(&mut cols).unwrap();

        assert_eq!(outcome, TomographyOutcome::default());
        assert_eq!(cols, before);
    }

    #[test]
    fn test_single_training_sample_skips_prediction() {
        let mut cols = columns(&[(0, 0, Some(10.0), Some(20.0)), (1, 0, Some(30.0), None)]);

        let outcome = TomographyImputer::impute(&mut cols).unwrap();

        assert!(outcome.model.is_none());
        assert!(outcome.predicted_rows.is_empty());
        assert_eq!(cols.tomography[1], None);
    }

    #[test]
    fn test_sanitization_fill_from_null_not_reported() {
        let mut cols = columns(&[
            (1, 0, Some(50.0), Some(60.0)),
            (1, 1, Some(50.0), None),
            (2, 0, Some(0.0), Some(10.0)),
            (3, 0, Some(100.0), Some(110.0)),
        ]);

        let outcome = TomographyImputer::impute(&mut cols).unwrap();

        // row 1 got its tomography from its duplicate, not from the model
        assert_eq!(cols.tomography[1], Some(60.0));
        assert!(outcome.changed_rows().is_empty());
    }

    #[test]
    fn test_changed_rows_union_is_ordered() {
        let outcome = TomographyOutcome {
            sanitized_rows: vec![1, 4],
            predicted_rows: vec![0, 4, 2],
            model: None,
        };
        assert_eq!(outcome.changed_rows(), vec![0, 1, 2, 4]);
    }
}
