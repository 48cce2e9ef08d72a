//! The imputation engine.
//!
//! [`ImputationEngine`] owns one patient table and exposes the four
//! imputation operations. Each operation mutates the table in place and
//! returns the rows it changed as a new [`DataFrame`] whose rows keep the
//! table's relative order.

use crate::error::{Result, ResultExt};
use crate::imputers::{AgeImputer, CholesterolImputer, TomographyImputer};
use crate::table::{
    AGE, CHOLESTEROL, PatientColumns, PatientRecord, ResultColumns, TOMOGRAPHY, normalize_frame,
    records_to_frame, write_float_column,
};
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::info;

/// Owns a patient table and imputes its missing measurements.
///
/// The table always has the canonical schema: `patientID` and `hospitalID`
/// as `Int64`, `age`, `cholesterol` and `tomography` as `Float64`.
///
/// # Example
///
/// ```rust,ignore
/// use hospital_imputation::ImputationEngine;
///
/// let mut engine = ImputationEngine::new(df)?;
/// let ages = engine.impute_age(1)?;
/// let cholesterol = engine.impute_cholesterol()?;
/// let tomography = engine.impute_tomography()?;
/// let cleaned = engine.into_frame();
/// ```
pub struct ImputationEngine {
    table: DataFrame,
}

static_assertions::assert_impl_all!(ImputationEngine: Send);

impl ImputationEngine {
    /// Take ownership of `table`, normalizing it to the canonical schema.
    ///
    /// Fails if a patient column is missing or an id is null.
    pub fn new(table: DataFrame) -> Result<Self> {
        let table = normalize_frame(&table).context("Normalizing patient table")?;
        Ok(Self { table })
    }

    pub fn from_records(records: &[PatientRecord]) -> Result<Self> {
        Ok(Self {
            table: records_to_frame(records)?,
        })
    }

    /// The current state of the table.
    pub fn frame(&self) -> &DataFrame {
        &self.table
    }

    pub fn into_frame(self) -> DataFrame {
        self.table
    }

    pub fn records(&self) -> Result<Vec<PatientRecord>> {
        Ok(self.columns()?.records())
    }

    /// Distinct hospital ids present in the table, ascending.
    pub fn hospital_ids(&self) -> Result<Vec<i64>> {
        let ids: BTreeSet<i64> = self.columns()?.hospital_id.into_iter().collect();
        Ok(ids.into_iter().collect())
    }

    /// Fill unknown ages at `hospital_id` with the hospital's median known age.
    ///
    /// Returns `patientID, age, cholesterol, tomography` of the filled rows.
    pub fn impute_age(&mut self, hospital_id: i64) -> Result<DataFrame> {
        let mut columns = self.columns()?;
        let filled = AgeImputer::impute_hospital_median(&mut columns, hospital_id)?;

        if !filled.is_empty() {
            write_float_column(&mut self.table, AGE, &columns.age)?;
        }
        info!(
            "Imputed age of {} patient(s) at hospital {}",
            filled.len(),
            hospital_id
        );
        columns.select_rows(&filled, ResultColumns::HospitalScoped)
    }

    /// Fill unknown cholesterol at `hospital_id` with the mean of same-age patients.
    ///
    /// Returns `patientID, age, cholesterol, tomography` of the filled rows.
    pub fn impute_cholesterol_single_hospital(&mut self, hospital_id: i64) -> Result<DataFrame> {
        let mut columns = self.columns()?;
        let filled = CholesterolImputer::impute_age_mean(&mut columns, hospital_id)?;

        if !filled.is_empty() {
            write_float_column(&mut self.table, CHOLESTEROL, &columns.cholesterol)?;
        }
        info!(
            "Imputed cholesterol of {} patient(s) at hospital {} from same-age means",
            filled.len(),
            hospital_id
        );
        columns.select_rows(&filled, ResultColumns::HospitalScoped)
    }

    /// Fill unknown cholesterol in every hospital with the minimum of the 5-year age bracket.
    ///
    /// Returns `patientID, hospitalID, age, cholesterol, tomography` of the filled rows.
    pub fn impute_cholesterol(&mut self) -> Result<DataFrame> {
        let mut columns = self.columns()?;
        let filled = CholesterolImputer::impute_bracket_minimum(&mut columns)?;

        if !filled.is_empty() {
            write_float_column(&mut self.table, CHOLESTEROL, &columns.cholesterol)?;
        }
        info!(
            "Imputed cholesterol of {} patient(s) from age bracket minimums",
            filled.len()
        );
        columns.select_rows(&filled, ResultColumns::AllHospitals)
    }

    /// Sanitize duplicate patients, then predict unknown tomography from cholesterol.
    ///
    /// Returns `patientID, hospitalID, age, cholesterol, tomography` of rows
    /// where sanitization replaced a known value or tomography was predicted.
    pub fn impute_tomography(&mut self) -> Result<DataFrame> {
        let mut columns = self.columns()?;
        let outcome = TomographyImputer::impute(&mut columns).context("Imputing tomography")?;

        // sanitization may fill cells it does not report, so always write back
        write_float_column(&mut self.table, CHOLESTEROL, &columns.cholesterol)?;
        write_float_column(&mut self.table, TOMOGRAPHY, &columns.tomography)?;

        let changed = outcome.changed_rows();
        info!(
            "Imputed tomography of {} patient(s); {} row(s) reconciled across hospitals",
            outcome.predicted_rows.len(),
            outcome.sanitized_rows.len()
        );
        columns.select_rows(&changed, ResultColumns::AllHospitals)
    }

    fn columns(&self) -> Result<PatientColumns> {
        PatientColumns::from_frame(&self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_new_rejects_missing_columns() {
        let df = df!["patientID" => [1i64], "age" => [1.0]].unwrap();
        let err = ImputationEngine::new(df).err().unwrap();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_impute_age_writes_back_into_table() {
        let df = df![
            "patientID" => [0i64, 1, 2, 3],
            "hospitalID" => [0i64, 0, 1, 1],
            "age" => [Some(15.0), None, None, Some(20.0)],
            "cholesterol" => [Some(0.0), Some(42.0), None, Some(10.0)],
            "tomography" => [Some(0.0), Some(12.0), Some(100.0), None],
        ]
        .unwrap();
        let mut engine = ImputationEngine::new(df).unwrap();

        let result = engine.impute_age(1).unwrap();

        assert_eq!(result.height(), 1);
        assert_eq!(result.width(), 4);
        assert_eq!(
            f64_column(engine.frame(), AGE),
            vec![Some(15.0), None, Some(20.0), Some(20.0)]
        );
    }

    #[test]
    fn test_hospital_ids_sorted_distinct() {
        let records = vec![
            PatientRecord::new(1, 3, None, None, None),
            PatientRecord::new(2, 1, None, None, None),
            PatientRecord::new(3, 3, None, None, None),
        ];
        let engine = ImputationEngine::from_records(&records).unwrap();
        assert_eq!(engine.hospital_ids().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_empty_table_is_total() {
        let mut engine = ImputationEngine::from_records(&[]).unwrap();

        assert_eq!(engine.impute_age(1).unwrap().height(), 0);
        assert_eq!(engine.impute_cholesterol_single_hospital(1).unwrap().height(), 0);
        assert_eq!(engine.impute_cholesterol().unwrap().height(), 0);
        let tomography = engine.impute_tomography().unwrap();
        assert_eq!(tomography.height(), 0);
        assert_eq!(tomography.width(), 5);
    }
}
