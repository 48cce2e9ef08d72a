use crate::loader::LoadReport;
use crate::store::UpsertStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four imputation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationOperation {
    Age,
    CholesterolSingleHospital,
    CholesterolBrackets,
    Tomography,
}

impl ImputationOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::CholesterolSingleHospital => "cholesterol_single_hospital",
            Self::CholesterolBrackets => "cholesterol_brackets",
            Self::Tomography => "tomography",
        }
    }
}

impl std::fmt::Display for ImputationOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One operation performed by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImputationStep {
    pub operation: ImputationOperation,
    /// Set for the per-hospital operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital_id: Option<i64>,
    /// Rows reported as changed by the operation.
    pub rows_changed: usize,
}

// ============================================================================
// Run Summary
// ============================================================================

/// Summary of an imputation run, suitable for JSON output.
///
/// # Example
///
/// ```rust,ignore
/// let output = ImputationRunner::new(config)?.run()?;
/// println!(
///     "{} rows changed in {}ms",
///     output.summary.rows_changed_total(),
///     output.summary.duration_ms
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputationSummary {
    pub started_at: DateTime<Utc>,
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    /// What was read from the input directory.
    pub load: LoadReport,
    /// Rows in the patient table after merging duplicate keys.
    pub rows: usize,
    /// Null measurement cells before imputation.
    pub missing_before: usize,
    /// Null measurement cells after imputation.
    pub missing_after: usize,

    /// Operations in the order they ran.
    pub steps: Vec<ImputationStep>,

    /// Effect of writing the cleaned table back to the store.
    pub store_update: UpsertStats,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

impl ImputationSummary {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration_ms: 0,
            load: LoadReport::default(),
            rows: 0,
            missing_before: 0,
            missing_after: 0,
            steps: Vec::new(),
            store_update: UpsertStats::default(),
            output_path: None,
        }
    }

    pub fn add_step(&mut self, operation: ImputationOperation, hospital_id: Option<i64>, rows_changed: usize) {
        self.steps.push(ImputationStep {
            operation,
            hospital_id,
            rows_changed,
        });
    }

    pub fn rows_changed_total(&self) -> usize {
        self.steps.iter().map(|step| step.rows_changed).sum()
    }

    /// Rows changed by one kind of operation, summed over hospitals.
    pub fn rows_changed_by(&self, operation: ImputationOperation) -> usize {
        self.steps
            .iter()
            .filter(|step| step.operation == operation)
            .map(|step| step.rows_changed)
            .sum()
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
