//! Collection repository for JSON storage
//!
//! Each registered collection lives in its own `data/<name>.json` file. The
//! repository keeps the records in memory in insertion order, indexed by id.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{StudyError, StudyResult};
use crate::models::{CollectionName, Record, RecordId};

use super::file_io::{read_json, write_json_atomic};

/// On-disk layout as read back
#[derive(Debug, Default, Deserialize)]
struct CollectionFile {
    #[serde(default)]
    records: Vec<Value>,
}

/// On-disk layout as written
#[derive(Serialize)]
struct CollectionFileRef<'a> {
    records: &'a [Record],
}

#[derive(Debug, Default)]
struct CollectionState {
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
}

impl CollectionState {
    fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id().clone(), i))
            .collect();
    }
}

/// Repository for one collection's records
pub struct CollectionRepository {
    name: CollectionName,
    path: PathBuf,
    state: RwLock<CollectionState>,
}

impl CollectionRepository {
    /// Create a new, empty repository backed by `path`
    pub fn new(name: CollectionName, path: PathBuf) -> Self {
        Self {
            name,
            path,
            state: RwLock::new(CollectionState::default()),
        }
    }

    /// The collection this repository holds
    pub fn name(&self) -> CollectionName {
        self.name
    }

    fn read_state(&self) -> StudyResult<RwLockReadGuard<'_, CollectionState>> {
        self.state
            .read()
            .map_err(|e| StudyError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write_state(&self) -> StudyResult<RwLockWriteGuard<'_, CollectionState>> {
        self.state
            .write()
            .map_err(|e| StudyError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Load records from disk
    ///
    /// A missing file is an empty collection. Entries that no longer decode
    /// (no id, duplicated id) are skipped with a warning.
    pub fn load(&self) -> StudyResult<()> {
        let file_data: CollectionFile = read_json(&self.path)?;

        let mut state = self.write_state()?;
        state.records.clear();
        state.index.clear();

        for (position, value) in file_data.records.into_iter().enumerate() {
            match Record::decode(self.name, value) {
                Ok(record) if state.index.contains_key(record.id()) => {
                    warn!(
                        collection = %self.name,
                        id = %record.id(),
                        "skipping duplicate record on load"
                    );
                }
                Ok(record) => {
                    let slot = state.records.len();
                    state.index.insert(record.id().clone(), slot);
                    state.records.push(record);
                }
                Err(e) => {
                    warn!(collection = %self.name, position, error = %e, "skipping unreadable record");
                }
            }
        }

        Ok(())
    }

    /// Save records to disk
    pub fn save(&self) -> StudyResult<()> {
        let state = self.read_state()?;
        write_json_atomic(
            &self.path,
            &CollectionFileRef {
                records: &state.records,
            },
        )
    }

    /// Get all records in insertion order
    pub fn get_all(&self) -> StudyResult<Vec<Record>> {
        Ok(self.read_state()?.records.clone())
    }

    /// Get a record by id
    pub fn get(&self, id: &RecordId) -> StudyResult<Option<Record>> {
        let state = self.read_state()?;
        Ok(state.index.get(id).map(|&i| state.records[i].clone()))
    }

    /// Find a record by the display form of its id
    pub fn find(&self, id: &str) -> StudyResult<Option<Record>> {
        let state = self.read_state()?;
        Ok(state
            .records
            .iter()
            .find(|r| r.id().to_string() == id)
            .cloned())
    }

    /// Insert a new record, failing if its id is taken
    pub fn insert(&self, record: Record) -> StudyResult<()> {
        let mut state = self.write_state()?;

        if state.index.contains_key(record.id()) {
            return Err(StudyError::duplicate_record(format!(
                "{} in '{}'",
                record.id(),
                self.name
            )));
        }

        let slot = state.records.len();
        state.index.insert(record.id().clone(), slot);
        state.records.push(record);
        Ok(())
    }

    /// Delete a record
    pub fn delete(&self, id: &RecordId) -> StudyResult<bool> {
        let mut state = self.write_state()?;

        match state.index.get(id).copied() {
            Some(slot) => {
                state.records.remove(slot);
                state.reindex();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove every record (in memory only; call `save` to persist)
    pub fn clear(&self) -> StudyResult<()> {
        let mut state = self.write_state()?;
        state.records.clear();
        state.index.clear();
        Ok(())
    }

    /// Count records
    pub fn count(&self) -> StudyResult<usize> {
        Ok(self.read_state()?.records.len())
    }
}
