//! In-memory patient store keyed by `(patientID, hospitalID)`.
//!
//! Writes go through a [`StoreSession`]: open one with
//! [`PatientStore::session`], stage upserts, then [`StoreSession::commit`].
//! A session dropped without commit discards its staged records.
//!
//! Upserts never overwrite known values: on a key conflict only the stored
//! record's null fields are filled.

use crate::error::Result;
use crate::table::{PatientColumns, PatientRecord, frame_to_records};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Counts produced by a committed session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertStats {
    /// Records whose key was new to the store.
    pub inserted: usize,
    /// Existing records that had at least one null field filled.
    pub updated: usize,
    /// Staged records that changed nothing.
    pub unchanged: usize,
}

/// Ordered collection of patient records with unique keys.
#[derive(Debug, Clone, Default)]
pub struct PatientStore {
    records: Vec<PatientRecord>,
    index: HashMap<(i64, i64), usize>,
}

impl PatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, patient_id: i64, hospital_id: i64) -> Option<&PatientRecord> {
        self.index
            .get(&(patient_id, hospital_id))
            .map(|&position| &self.records[position])
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    /// The store as a patient table.
    pub fn to_frame(&self) -> Result<DataFrame> {
        PatientColumns::from_records(&self.records).to_frame()
    }

    /// Open a write session. The store is borrowed until it ends.
    pub fn session(&mut self) -> StoreSession<'_> {
        StoreSession {
            store: self,
            staged: Vec::new(),
        }
    }

    fn apply(&mut self, record: PatientRecord, stats: &mut UpsertStats) {
        let existing = self.index.get(&record.key()).copied();
        match existing {
            Some(position) => {
                if self.records[position].fill_missing_from(&record) {
                    stats.updated += 1;
                } else {
                    stats.unchanged += 1;
                }
            }
            None => {
                self.index.insert(record.key(), self.records.len());
                self.records.push(record);
                stats.inserted += 1;
            }
        }
    }
}

/// A unit of work against a [`PatientStore`].
pub struct StoreSession<'a> {
    store: &'a mut PatientStore,
    staged: Vec<PatientRecord>,
}

impl StoreSession<'_> {
    /// Stage one record.
    pub fn upsert(&mut self, record: PatientRecord) {
        self.staged.push(record);
    }

    /// Stage every row of a patient table. Returns the number of rows staged.
    pub fn upsert_frame(&mut self, df: &DataFrame) -> Result<usize> {
        let records = frame_to_records(df)?;
        let count = records.len();
        self.staged.extend(records);
        Ok(count)
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Apply staged records in staging order and close the session.
    pub fn commit(mut self) -> UpsertStats {
        let mut stats = UpsertStats::default();
        for record in std::mem::take(&mut self.staged) {
            self.store.apply(record, &mut stats);
        }
        debug!(
            "Session committed: {} inserted, {} updated, {} unchanged",
            stats.inserted, stats.updated, stats.unchanged
        );
        stats
    }

    /// Discard staged records and close the session.
    pub fn rollback(mut self) {
        debug!("Session rolled back, {} record(s) discarded", self.staged.len());
        self.staged.clear();
    }
}

impl Drop for StoreSession<'_> {
    fn drop(&mut self) {
        if !self.staged.is_empty() {
            warn!(
                "Session dropped without commit, {} staged record(s) discarded",
                self.staged.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_commit_inserts_in_order() {
        let mut store = PatientStore::new();
        let mut session = store.session();
        session.upsert(PatientRecord::new(2, 1, Some(40.0), None, None));
        session.upsert(PatientRecord::new(1, 1, None, Some(180.0), None));
        assert_eq!(session.staged_len(), 2);

        let stats = session.commit();

        assert_eq!(stats.inserted, 2);
        assert_eq!(store.records()[0].patient_id, 2);
        assert_eq!(store.get(1, 1).unwrap().cholesterol, Some(180.0));
    }

    #[test]
    fn test_conflict_fills_only_nulls() {
        let mut store = PatientStore::new();
        let mut session = store.session();
        session.upsert(PatientRecord::new(1, 1, Some(40.0), None, None));
        session.upsert(PatientRecord::new(1, 1, Some(99.0), Some(200.0), None));
        session.upsert(PatientRecord::new(1, 1, Some(99.0), Some(1.0), None));

        let stats = session.commit();

        assert_eq!(
            stats,
            UpsertStats {
                inserted: 1,
                updated: 1,
                unchanged: 1
            }
        );
        assert_eq!(store.len(), 1);
        assert_eq!(
            *store.get(1, 1).unwrap(),
            PatientRecord::new(1, 1, Some(40.0), Some(200.0), None)
        );
    }

    #[test]
    fn test_same_patient_different_hospitals_are_distinct() {
        let mut store = PatientStore::new();
        let mut session = store.session();
        session.upsert(PatientRecord::new(1, 1, None, None, None));
        session.upsert(PatientRecord::new(1, 2, None, None, None));
        session.commit();

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_rollback_and_drop_discard() {
        let mut store = PatientStore::new();

        let mut session = store.session();
        session.upsert(PatientRecord::new(1, 1, None, None, None));
        session.rollback();

        {
            let mut session = store.session();
            session.upsert(PatientRecord::new(2, 1, None, None, None));
        }

        assert!(store.is_empty());
    }

    #[test]
    fn test_upsert_frame_and_to_frame() {
        let df = df![
            "patientID" => [1i64, 2],
            "hospitalID" => [3i64, 3],
            "age" => [Some(20.0), None],
            "cholesterol" => [None, Some(150.0)],
            "tomography" => [Some(1.0), None],
        ]
        .unwrap();

        let mut store = PatientStore::new();
        let mut session = store.session();
        assert_eq!(session.upsert_frame(&df).unwrap(), 2);
        session.commit();

        let out = store.to_frame().unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(frame_to_records(&out).unwrap(), store.records().to_vec());
    }
}
