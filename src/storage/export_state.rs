//! Export state repository
//!
//! Persists the "last exported at" marker in `export_state.json`, apart from
//! the collections and from any snapshot.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::StudyResult;
use crate::models::ExportState;

use super::file_io::{read_json, write_json_atomic};

/// Repository for the export marker
#[derive(Debug, Clone)]
pub struct ExportStateRepository {
    path: PathBuf,
}

impl ExportStateRepository {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the marker, defaulting to "never exported"
    pub fn load(&self) -> StudyResult<ExportState> {
        read_json(&self.path)
    }

    /// Overwrite the marker with `timestamp`
    pub fn record(&self, timestamp: DateTime<Utc>) -> StudyResult<()> {
        write_json_atomic(&self.path, &ExportState::at(timestamp))
    }

    /// Timestamp of the most recent export attempt, if any
    pub fn get_last_export_date(&self) -> StudyResult<Option<DateTime<Utc>>> {
        Ok(self.load()?.last_export_date)
    }
}
