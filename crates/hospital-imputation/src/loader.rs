//! Loading hospital files into a [`PatientStore`](crate::store::PatientStore).
//!
//! Each hospital ships one delimited file with the columns `patientID`,
//! `age`, `cholesterol` and `tomography` (any order, matched by name). The
//! hospital id is not a column: it is the trailing number of the file name,
//! so `hospital3.csv` holds patients of hospital 3.

use crate::config::ImputationConfig;
use crate::error::{ImputationError, Result, ResultExt};
use crate::store::StoreSession;
use crate::table::{AGE, CHOLESTEROL, PATIENT_ID, PatientRecord, TOMOGRAPHY, float_values, id_values};
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One hospital file that was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedFile {
    pub path: String,
    pub hospital_id: i64,
    pub rows: usize,
}

/// What a directory load read and skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub files: Vec<LoadedFile>,
    /// Files with the right extension but no hospital id in their name.
    pub skipped: Vec<String>,
}

impl LoadReport {
    pub fn total_rows(&self) -> usize {
        self.files.iter().map(|file| file.rows).sum()
    }
}

/// Hospital id encoded as the trailing digits of the file stem.
///
/// `hospital12.csv` -> 12, `h_3.tsv` -> 3, `notes.csv` -> None.
pub fn hospital_id_from_path(path: &Path) -> Option<i64> {
    let stem = path.file_stem()?.to_str()?;
    let prefix_len = stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    stem[prefix_len..].parse().ok()
}

/// Hospital files of `dir` with the given extension, sorted by file name.
///
/// Files whose name carries no hospital id are returned separately.
pub fn hospital_files(dir: &Path, extension: &str) -> Result<(Vec<(PathBuf, i64)>, Vec<PathBuf>)> {
    if !dir.is_dir() {
        return Err(ImputationError::InputDirNotFound(dir.display().to_string()));
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).context(format!("Listing {}", dir.display()))? {
        let path = entry.context(format!("Listing {}", dir.display()))?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut files = Vec::new();
    let mut unnamed = Vec::new();
    for path in paths {
        match hospital_id_from_path(&path) {
            Some(hospital_id) => files.push((path, hospital_id)),
            None => unnamed.push(path),
        }
    }
    Ok((files, unnamed))
}

/// Read one hospital file into records of `hospital_id`.
///
/// Column types are inferred from every row: an integer-looking prefix
/// followed by a fractional value still reads as a float column.
pub fn read_hospital_file(path: &Path, hospital_id: i64, separator: u8) -> Result<Vec<PatientRecord>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(CsvParseOptions::default().with_separator(separator))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Opening {}", path.display()))?
        .finish()
        .context(format!("Parsing {}", path.display()))?;

    let context = || format!("Reading {}", path.display());
    let patient_ids = id_values(&df, PATIENT_ID).context(context())?;
    let ages = float_values(&df, AGE).context(context())?;
    let cholesterol = float_values(&df, CHOLESTEROL).context(context())?;
    let tomography = float_values(&df, TOMOGRAPHY).context(context())?;

    let records = patient_ids
        .into_iter()
        .enumerate()
        .map(|(row, patient_id)| {
            PatientRecord::new(patient_id, hospital_id, ages[row], cholesterol[row], tomography[row])
        })
        .collect();
    Ok(records)
}

/// Stage every hospital file of the configured directory into `session`.
///
/// Rows repeating a `(patientID, hospitalID)` key are merged by the
/// session's fill-null rule once it commits.
pub fn load_directory(config: &ImputationConfig, session: &mut StoreSession<'_>) -> Result<LoadReport> {
    let (files, unnamed) = hospital_files(&config.input_dir, config.extension())?;

    let mut report = LoadReport::default();
    for path in unnamed {
        warn!(
            "Skipping {}: no hospital id in file name",
            path.display()
        );
        report.skipped.push(path.display().to_string());
    }

    for (path, hospital_id) in files {
        info!("Inserting {} (hospital {})", path.display(), hospital_id);
        let records = read_hospital_file(&path, hospital_id, config.separator)?;
        debug!("Read {} row(s) from {}", records.len(), path.display());

        report.files.push(LoadedFile {
            path: path.display().to_string(),
            hospital_id,
            rows: records.len(),
        });
        for record in records {
            session.upsert(record);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hospital_id_from_path() {
        assert_eq!(hospital_id_from_path(Path::new("files/hospital1.csv")), Some(1));
        assert_eq!(hospital_id_from_path(Path::new("hospital12.csv")), Some(12));
        assert_eq!(hospital_id_from_path(Path::new("h_3.tsv")), Some(3));
        assert_eq!(hospital_id_from_path(Path::new("7.csv")), Some(7));
        assert_eq!(hospital_id_from_path(Path::new("notes.csv")), None);
        assert_eq!(hospital_id_from_path(Path::new("2nd_site.csv")), None);
    }

    fn fixtures_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
    }

    #[test]
    fn test_hospital_files_sorted_and_split() {
        let (files, unnamed) = hospital_files(&fixtures_path().join("hospitals"), "csv").unwrap();

        let ids: Vec<i64> = files.iter().map(|(_, id)| *id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(unnamed.len(), 1);
        assert!(unnamed[0].ends_with("notes.csv"));
    }

    #[test]
    fn test_late_fractional_value_reads_as_float() {
        let path = fixtures_path().join("late_fraction/hospital7.csv");

        let records = read_hospital_file(&path, 7, b',').unwrap();

        assert_eq!(records.len(), 151);
        assert_eq!(records[0].age, Some(30.0));
        let last = records[150];
        assert_eq!(last.patient_id, 999);
        assert_eq!(last.hospital_id, 7);
        assert_eq!(last.age, Some(30.5));
        assert_eq!(last.tomography, Some(50.0));
    }

    #[test]
    fn test_missing_directory() {
        let err = hospital_files(Path::new("definitely/not/here"), "csv").unwrap_err();
        assert_eq!(err.error_code(), "INPUT_DIR_NOT_FOUND");
    }
}
