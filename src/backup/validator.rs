//! Snapshot validation
//!
//! Shallow structural checks on untrusted input. The size guard runs before
//! any parsing; the structural checks only look at the top-level mapping.
//! Record shapes are left to the accessor, which rejects bad records one at a
//! time during insert.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::settings::{Settings, DEFAULT_MAX_IMPORT_BYTES};
use crate::error::{StudyError, StudyResult};
use crate::models::record::json_type_name;
use crate::models::{
    CollectionName, ImportedSnapshot, InboundCollection, EXPORT_DATE_KEY, SCHEMA_VERSION_KEY,
};

/// Validates snapshot input before it may reach the restore executor
#[derive(Debug, Clone)]
pub struct SnapshotValidator {
    max_bytes: u64,
}

impl Default for SnapshotValidator {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_IMPORT_BYTES,
        }
    }
}

impl SnapshotValidator {
    /// Validator with the default 10 MiB ceiling
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator with a custom size ceiling
    pub fn with_limit(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Validator using the configured ceiling
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_limit(settings.max_import_bytes)
    }

    /// The size ceiling in bytes
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Reject inputs larger than the ceiling
    pub fn check_size(&self, size: u64) -> StudyResult<()> {
        if size > self.max_bytes {
            warn!(size, limit = self.max_bytes, "snapshot rejected by size guard");
            return Err(StudyError::Size {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Validate serialized snapshot text
    pub fn validate(&self, raw: &str) -> StudyResult<ImportedSnapshot> {
        self.validate_bytes(raw.as_bytes())
    }

    /// Validate serialized snapshot bytes
    pub fn validate_bytes(&self, raw: &[u8]) -> StudyResult<ImportedSnapshot> {
        self.check_size(raw.len() as u64)?;

        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| StudyError::Schema(format!("input is not valid JSON: {}", e)))?;

        self.validate_value(value)
    }

    /// Validate a snapshot file, checking its size before reading it
    pub fn validate_file(&self, path: &Path) -> StudyResult<ImportedSnapshot> {
        let metadata = fs::metadata(path).map_err(|e| {
            StudyError::Io(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.check_size(metadata.len())?;

        let raw = fs::read(path)
            .map_err(|e| StudyError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        self.validate_bytes(&raw)
    }

    /// Validate an already parsed value
    pub fn validate_value(&self, value: Value) -> StudyResult<ImportedSnapshot> {
        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Err(StudyError::Schema(format!(
                    "expected a mapping at the top level, found {}",
                    json_type_name(&other)
                )))
            }
        };

        let sentinel = CollectionName::SENTINEL.as_str();
        match object.get(sentinel) {
            Some(Value::Array(_)) => {}
            Some(other) => {
                return Err(StudyError::Schema(format!(
                    "'{}' must be an array, found {}",
                    sentinel,
                    json_type_name(other)
                )))
            }
            None => {
                return Err(StudyError::Schema(format!(
                    "missing required key '{}'",
                    sentinel
                )))
            }
        }

        let export_date = object
            .remove(EXPORT_DATE_KEY)
            .and_then(|v| v.as_str().map(String::from));
        let schema_version = object.remove(SCHEMA_VERSION_KEY).and_then(|v| v.as_u64());

        let collections = classify_collections(&mut object);

        let mut ignored_keys: Vec<String> = object.keys().cloned().collect();
        ignored_keys.sort();
        if !ignored_keys.is_empty() {
            warn!(keys = ?ignored_keys, "ignoring unrecognized snapshot keys");
        }

        let snapshot = ImportedSnapshot {
            export_date,
            schema_version,
            collections,
            ignored_keys,
        };
        debug!(
            collections = snapshot.collections.len(),
            records = snapshot.total_records(),
            "snapshot validated"
        );
        Ok(snapshot)
    }
}

/// Take every registered collection out of `object`, tagging each one
fn classify_collections(object: &mut Map<String, Value>) -> Vec<(CollectionName, InboundCollection)> {
    CollectionName::ALL
        .iter()
        .filter_map(|name| {
            let value = object.remove(name.as_str())?;
            let inbound = match value {
                Value::Array(values) => InboundCollection::Records(values),
                other => InboundCollection::Malformed(format!(
                    "expected an array, found {}",
                    json_type_name(&other)
                )),
            };
            Some((*name, inbound))
        })
        .collect()
}
