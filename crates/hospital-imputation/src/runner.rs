//! End-to-end imputation run.
//!
//! Loads the hospital files into a [`PatientStore`], runs the configured
//! imputation operations on an [`ImputationEngine`], writes the cleaned
//! table back to the store and optionally to a CSV file.

use crate::config::ImputationConfig;
use crate::engine::ImputationEngine;
use crate::error::{Result, ResultExt};
use crate::loader::load_directory;
use crate::store::PatientStore;
use crate::table::{PatientRecord, frame_to_records};
use crate::types::{ImputationOperation, ImputationSummary};
use chrono::Utc;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Result of a run: the cleaned table and what happened to it.
pub struct RunOutput {
    pub table: DataFrame,
    pub summary: ImputationSummary,
}

/// Drives a full load -> impute -> store -> export run.
///
/// # Example
///
/// ```rust,ignore
/// use hospital_imputation::{ImputationConfig, ImputationRunner};
///
/// let config = ImputationConfig::builder().input_dir("files").build()?;
/// let output = ImputationRunner::new(config)?.run()?;
/// println!("{}", output.summary.to_json()?);
/// ```
pub struct ImputationRunner {
    config: ImputationConfig,
    store: PatientStore,
}

static_assertions::assert_impl_all!(ImputationRunner: Send);

impl ImputationRunner {
    /// Create a runner with an empty store. The configuration is validated.
    pub fn new(config: ImputationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store: PatientStore::new(),
        })
    }

    pub fn config(&self) -> &ImputationConfig {
        &self.config
    }

    /// The store as of the last run.
    pub fn store(&self) -> &PatientStore {
        &self.store
    }

    /// Load the input directory and impute it.
    pub fn run(&mut self) -> Result<RunOutput> {
        let started = Instant::now();
        let mut summary = ImputationSummary::new(Utc::now());

        info!("Step 1: Loading hospital files from {}", self.config.input_dir.display());
        let mut session = self.store.session();
        summary.load = load_directory(&self.config, &mut session)?;
        let stats = session.commit();
        info!(
            "Loaded {} row(s) from {} file(s) into {} patient record(s)",
            summary.load.total_rows(),
            summary.load.files.len(),
            stats.inserted
        );

        let table = self.store.to_frame()?;
        self.process(table, summary, started)
    }

    /// Impute an already loaded patient table.
    ///
    /// The table is merged into the store first, as if it had been loaded.
    pub fn run_on_table(&mut self, table: DataFrame) -> Result<RunOutput> {
        let started = Instant::now();
        let summary = ImputationSummary::new(Utc::now());

        let mut session = self.store.session();
        session.upsert_frame(&table)?;
        session.commit();

        let table = self.store.to_frame()?;
        self.process(table, summary, started)
    }

    fn process(
        &mut self,
        table: DataFrame,
        mut summary: ImputationSummary,
        started: Instant,
    ) -> Result<RunOutput> {
        let mut engine = ImputationEngine::new(table)?;
        let before = engine.records()?;
        summary.rows = before.len();
        summary.missing_before = count_missing(&before);

        info!("Step 2: Imputing missing values");
        self.impute(&mut engine, &mut summary)?;

        let mut table = engine.into_frame();
        summary.missing_after = count_missing(&frame_to_records(&table)?);

        info!("Step 3: Writing imputed values back to the store");
        let mut session = self.store.session();
        session.upsert_frame(&table)?;
        summary.store_update = session.commit();

        if self.config.save_to_disk {
            if let Some(path) = self.config.output_path.clone() {
                info!("Step 4: Saving cleaned table to {}", path.display());
                write_csv(&path, &mut table)?;
                summary.output_path = Some(path.display().to_string());
            }
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "Imputation complete: {} row(s) changed, {} -> {} missing cell(s)",
            summary.rows_changed_total(),
            summary.missing_before,
            summary.missing_after
        );

        Ok(RunOutput { table, summary })
    }

    fn impute(&self, engine: &mut ImputationEngine, summary: &mut ImputationSummary) -> Result<()> {
        let steps = self.config.steps;
        let hospitals = match &self.config.hospitals {
            Some(hospitals) => hospitals.clone(),
            None => engine.hospital_ids()?,
        };
        debug!("Per-hospital steps run for hospitals {:?}", hospitals);

        for &hospital_id in &hospitals {
            if steps.age {
                let changed = engine
                    .impute_age(hospital_id)
                    .context(format!("Imputing age at hospital {}", hospital_id))?;
                summary.add_step(ImputationOperation::Age, Some(hospital_id), changed.height());
            }
            if steps.cholesterol_single_hospital {
                let changed = engine
                    .impute_cholesterol_single_hospital(hospital_id)
                    .context(format!("Imputing cholesterol at hospital {}", hospital_id))?;
                summary.add_step(
                    ImputationOperation::CholesterolSingleHospital,
                    Some(hospital_id),
                    changed.height(),
                );
            }
        }

        if steps.cholesterol_brackets {
            let changed = engine.impute_cholesterol()?;
            summary.add_step(ImputationOperation::CholesterolBrackets, None, changed.height());
        }

        if steps.tomography {
            let changed = engine.impute_tomography()?;
            summary.add_step(ImputationOperation::Tomography, None, changed.height());
        }

        Ok(())
    }
}

fn count_missing(records: &[PatientRecord]) -> usize {
    records.iter().map(PatientRecord::missing_count).sum()
}

fn write_csv(path: &Path, table: &mut DataFrame) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(format!("Creating {}", parent.display()))?;
    }
    let mut file = File::create(path).context(format!("Creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(table)
        .context(format!("Writing {}", path.display()))?;
    Ok(())
}
