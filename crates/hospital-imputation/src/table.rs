//! Patient table schema and conversions.
//!
//! The engine keeps its table as a polars [`DataFrame`], but every imputer
//! works on [`PatientColumns`]: the five columns materialized as plain
//! vectors. This module converts between the two and assembles the
//! "changed rows" tables the engine returns.

use crate::error::{ImputationError, Result};
use crate::utils::float_key;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Column Names
// =============================================================================

pub const PATIENT_ID: &str = "patientID";
pub const HOSPITAL_ID: &str = "hospitalID";
pub const AGE: &str = "age";
pub const CHOLESTEROL: &str = "cholesterol";
pub const TOMOGRAPHY: &str = "tomography";

/// All columns of the patient table, in canonical order.
pub const TABLE_COLUMNS: [&str; 5] = [PATIENT_ID, HOSPITAL_ID, AGE, CHOLESTEROL, TOMOGRAPHY];

/// Column set of a result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultColumns {
    /// `patientID, age, cholesterol, tomography`: the hospital is implied.
    HospitalScoped,
    /// `patientID, hospitalID, age, cholesterol, tomography`.
    AllHospitals,
}

impl ResultColumns {
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            ResultColumns::HospitalScoped => &[PATIENT_ID, AGE, CHOLESTEROL, TOMOGRAPHY],
            ResultColumns::AllHospitals => &TABLE_COLUMNS,
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// One row of the patient table.
///
/// A patient may appear once per hospital visited, so only the pair
/// `(patient_id, hospital_id)` identifies a row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "patientID")]
    pub patient_id: i64,
    #[serde(rename = "hospitalID")]
    pub hospital_id: i64,
    pub age: Option<f64>,
    pub cholesterol: Option<f64>,
    pub tomography: Option<f64>,
}

impl PatientRecord {
    pub fn new(
        patient_id: i64,
        hospital_id: i64,
        age: Option<f64>,
        cholesterol: Option<f64>,
        tomography: Option<f64>,
    ) -> Self {
        Self {
            patient_id,
            hospital_id,
            age,
            cholesterol,
            tomography,
        }
    }

    /// Row identity used by the store.
    pub fn key(&self) -> (i64, i64) {
        (self.patient_id, self.hospital_id)
    }

    /// Fill this record's null measurements from `other`.
    ///
    /// Known values are never overwritten. Returns whether anything changed.
    pub fn fill_missing_from(&mut self, other: &PatientRecord) -> bool {
        let mut changed = false;
        for (mine, theirs) in [
            (&mut self.age, other.age),
            (&mut self.cholesterol, other.cholesterol),
            (&mut self.tomography, other.tomography),
        ] {
            if mine.is_none() && theirs.is_some() {
                *mine = theirs;
                changed = true;
            }
        }
        changed
    }

    /// Number of null measurements.
    pub fn missing_count(&self) -> usize {
        [self.age, self.cholesterol, self.tomography]
            .iter()
            .filter(|value| value.is_none())
            .count()
    }
}

// =============================================================================
// Column-Oriented Working Table
// =============================================================================

/// The patient table as typed vectors, one per column, sharing row indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientColumns {
    pub patient_id: Vec<i64>,
    pub hospital_id: Vec<i64>,
    pub age: Vec<Option<f64>>,
    pub cholesterol: Vec<Option<f64>>,
    pub tomography: Vec<Option<f64>>,
}

impl PatientColumns {
    /// Materialize the five patient columns of `df`.
    ///
    /// Ids are cast to `Int64` and must be non-null; measurements are cast
    /// to `Float64`. Any other column is ignored.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        Ok(Self {
            patient_id: id_values(df, PATIENT_ID)?,
            hospital_id: id_values(df, HOSPITAL_ID)?,
            age: float_values(df, AGE)?,
            cholesterol: float_values(df, CHOLESTEROL)?,
            tomography: float_values(df, TOMOGRAPHY)?,
        })
    }

    pub fn from_records(records: &[PatientRecord]) -> Self {
        let mut columns = Self::default();
        for record in records {
            columns.push(*record);
        }
        columns
    }

    pub fn push(&mut self, record: PatientRecord) {
        self.patient_id.push(record.patient_id);
        self.hospital_id.push(record.hospital_id);
        self.age.push(record.age);
        self.cholesterol.push(record.cholesterol);
        self.tomography.push(record.tomography);
    }

    pub fn len(&self) -> usize {
        self.patient_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patient_id.is_empty()
    }

    pub fn record(&self, row: usize) -> PatientRecord {
        PatientRecord {
            patient_id: self.patient_id[row],
            hospital_id: self.hospital_id[row],
            age: self.age[row],
            cholesterol: self.cholesterol[row],
            tomography: self.tomography[row],
        }
    }

    pub fn records(&self) -> Vec<PatientRecord> {
        (0..self.len()).map(|row| self.record(row)).collect()
    }

    /// Row indices belonging to `hospital_id`, in table order.
    pub fn hospital_rows(&self, hospital_id: i64) -> Vec<usize> {
        self.hospital_id
            .iter()
            .enumerate()
            .filter(|(_, id)| **id == hospital_id)
            .map(|(row, _)| row)
            .collect()
    }

    /// Build a normalized frame holding every row.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let all_rows: Vec<usize> = (0..self.len()).collect();
        self.select_rows(&all_rows, ResultColumns::AllHospitals)
    }

    /// Build a result table from `rows` (kept in the given order).
    ///
    /// Ids are always emitted as `Int64` and measurements as `Float64`, so an
    /// empty selection still has the full column shape.
    pub fn select_rows(&self, rows: &[usize], columns: ResultColumns) -> Result<DataFrame> {
        let ids = |values: &[i64]| -> Vec<i64> { rows.iter().map(|&row| values[row]).collect() };
        let measurements = |values: &[Option<f64>]| -> Vec<Option<f64>> {
            rows.iter().map(|&row| values[row]).collect()
        };

        let frame = match columns {
            ResultColumns::HospitalScoped => df!(
                PATIENT_ID => ids(&self.patient_id),
                AGE => measurements(&self.age),
                CHOLESTEROL => measurements(&self.cholesterol),
                TOMOGRAPHY => measurements(&self.tomography),
            )?,
            ResultColumns::AllHospitals => df!(
                PATIENT_ID => ids(&self.patient_id),
                HOSPITAL_ID => ids(&self.hospital_id),
                AGE => measurements(&self.age),
                CHOLESTEROL => measurements(&self.cholesterol),
                TOMOGRAPHY => measurements(&self.tomography),
            )?,
        };
        Ok(frame)
    }
}

// =============================================================================
// Frame Helpers
// =============================================================================

/// Cast a frame to the canonical patient schema, dropping extra columns.
pub fn normalize_frame(df: &DataFrame) -> Result<DataFrame> {
    PatientColumns::from_frame(df)?.to_frame()
}

pub fn records_to_frame(records: &[PatientRecord]) -> Result<DataFrame> {
    PatientColumns::from_records(records).to_frame()
}

pub fn frame_to_records(df: &DataFrame) -> Result<Vec<PatientRecord>> {
    Ok(PatientColumns::from_frame(df)?.records())
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|column| column.as_materialized_series())
        .map_err(|_| ImputationError::ColumnNotFound(name.to_string()))
}

/// Read a measurement column as `Float64` cells.
pub(crate) fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = column(df, name)?.cast(&DataType::Float64)?;
    // NaN is how float-only sources spell "unknown"
    Ok(series
        .f64()?
        .into_iter()
        .map(|value| value.filter(|v| !v.is_nan()))
        .collect())
}

/// Read an id column as non-null `Int64` values.
///
/// Float ids must be whole numbers; a plain cast would truncate them.
pub(crate) fn id_values(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let source = column(df, name)?;
    if source.dtype().is_float() {
        let fractional = source
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .flatten()
            .filter(|value| value.fract() != 0.0)
            .count();
        if fractional > 0 {
            return Err(ImputationError::InvalidTable(format!(
                "column '{}' has {} non-integer id(s)",
                name, fractional
            )));
        }
    }
    let series = source.strict_cast(&DataType::Int64)?;
    let ids = series.i64()?;
    if ids.null_count() > 0 {
        return Err(ImputationError::InvalidTable(format!(
            "column '{}' has {} null id(s)",
            name,
            ids.null_count()
        )));
    }
    Ok(ids.into_iter().flatten().collect())
}

/// Read an aggregate table as `key -> value`, keyed by [`float_key`].
///
/// Rows where either cell is null are skipped.
pub(crate) fn float_lookup(df: &DataFrame, key: &str, value: &str) -> Result<HashMap<u64, f64>> {
    let keys = float_values(df, key)?;
    let values = float_values(df, value)?;
    Ok(keys
        .into_iter()
        .zip(values)
        .filter_map(|(key, value)| Some((float_key(key?), value?)))
        .collect())
}

/// Overwrite a measurement column of `df` with `values`.
pub(crate) fn write_float_column(df: &mut DataFrame, name: &str, values: &[Option<f64>]) -> Result<()> {
    let series = Series::new(name.into(), values.to_vec());
    df.replace(name, series)?;
    Ok(())
}
