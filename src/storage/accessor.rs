//! Collection store accessor
//!
//! [`CollectionStore`] is the only path through which the backup engine reads
//! or mutates collections. Implementors supply the primitive steps; the
//! provided `replace_all` turns them into a clear-then-insert that is isolated
//! per record.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{StudyError, StudyResult};
use crate::models::{CollectionName, Record, RecordId};

/// Lifecycle of one collection during a restore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionPhase {
    Pending,
    Clearing,
    Inserting,
    Done,
    Failed,
}

impl fmt::Display for CollectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CollectionPhase::Pending => "PENDING",
            CollectionPhase::Clearing => "CLEARING",
            CollectionPhase::Inserting => "INSERTING",
            CollectionPhase::Done => "DONE",
            CollectionPhase::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// One record that could not be inserted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertFailure {
    /// Position of the record in the inbound sequence
    pub index: usize,
    /// The record's id, when it had a readable one
    pub id: Option<String>,
    /// Why the insert failed
    pub reason: String,
}

/// Result of `replace_all` on one collection
#[derive(Debug)]
pub enum ReplaceOutcome {
    /// Every record was inserted
    Complete { inserted: usize },
    /// The collection was cleared but some records failed to insert
    Partial {
        inserted: usize,
        failures: Vec<InsertFailure>,
    },
    /// Clearing or committing failed
    Aborted(StudyError),
}

impl ReplaceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReplaceOutcome::Complete { .. })
    }

    /// Records that made it into the collection
    pub fn inserted(&self) -> usize {
        match self {
            ReplaceOutcome::Complete { inserted } | ReplaceOutcome::Partial { inserted, .. } => {
                *inserted
            }
            ReplaceOutcome::Aborted(_) => 0,
        }
    }

    /// Records that failed to insert
    pub fn failed_count(&self) -> usize {
        match self {
            ReplaceOutcome::Partial { failures, .. } => failures.len(),
            _ => 0,
        }
    }

    /// Collapse into a plain result, reporting partial inserts as an error
    pub fn into_result(self, name: CollectionName) -> StudyResult<usize> {
        match self {
            ReplaceOutcome::Complete { inserted } => Ok(inserted),
            ReplaceOutcome::Partial { inserted, failures } => Err(StudyError::PartialInsert {
                collection: name.to_string(),
                failed: failures.len(),
                total: inserted + failures.len(),
            }),
            ReplaceOutcome::Aborted(err) => Err(err),
        }
    }
}

/// Access to the store's collections
pub trait CollectionStore {
    /// All records of a collection; empty when the collection does not exist
    fn list_all(&self, name: CollectionName) -> StudyResult<Vec<Record>>;

    /// Remove every record of a collection
    fn clear(&self, name: CollectionName) -> StudyResult<()>;

    /// Insert one record
    fn insert(&self, name: CollectionName, record: Record) -> StudyResult<()>;

    /// Make inserts durable
    fn commit(&self, _name: CollectionName) -> StudyResult<()> {
        Ok(())
    }

    /// Number of records in a collection
    fn count(&self, name: CollectionName) -> StudyResult<usize> {
        Ok(self.list_all(name)?.len())
    }

    /// Clear a collection, then insert each value independently
    fn replace_all(&self, name: CollectionName, values: Vec<Value>) -> ReplaceOutcome {
        self.replace_all_observed(name, values, &mut |_| {})
    }

    /// `replace_all`, reporting each phase transition to `on_phase`
    ///
    /// If the clear fails nothing is inserted. Once cleared, every value is
    /// attempted; a failed insert never stops the ones after it.
    fn replace_all_observed(
        &self,
        name: CollectionName,
        values: Vec<Value>,
        on_phase: &mut dyn FnMut(CollectionPhase),
    ) -> ReplaceOutcome {
        on_phase(CollectionPhase::Clearing);
        if let Err(err) = self.clear(name) {
            let err = match err {
                StudyError::Clear { .. } => err,
                other => StudyError::Clear {
                    collection: name.to_string(),
                    reason: other.to_string(),
                },
            };
            warn!(collection = %name, error = %err, "clear failed, no records inserted");
            on_phase(CollectionPhase::Failed);
            return ReplaceOutcome::Aborted(err);
        }

        on_phase(CollectionPhase::Inserting);
        let attempts: Vec<Result<(), InsertFailure>> = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                let id = value
                    .get(name.key_path())
                    .and_then(RecordId::from_value)
                    .map(|id| id.to_string());

                Record::decode(name, value)
                    .and_then(|record| self.insert(name, record))
                    .map_err(|e| InsertFailure {
                        index,
                        id,
                        reason: e.to_string(),
                    })
            })
            .collect();

        let (inserted, failures) = gather(attempts);
        for failure in &failures {
            warn!(
                collection = %name,
                index = failure.index,
                id = failure.id.as_deref().unwrap_or("-"),
                reason = %failure.reason,
                "record failed to insert"
            );
        }

        if let Err(err) = self.commit(name) {
            warn!(collection = %name, error = %err, "commit failed after clear");
            on_phase(CollectionPhase::Failed);
            return ReplaceOutcome::Aborted(err);
        }

        debug!(collection = %name, inserted, failed = failures.len(), "replace finished");

        if failures.is_empty() {
            on_phase(CollectionPhase::Done);
            ReplaceOutcome::Complete { inserted }
        } else {
            on_phase(CollectionPhase::Failed);
            ReplaceOutcome::Partial { inserted, failures }
        }
    }
}

/// Split independent attempts into a success count and the failures
fn gather(attempts: Vec<Result<(), InsertFailure>>) -> (usize, Vec<InsertFailure>) {
    attempts
        .into_iter()
        .fold((0, Vec::new()), |(ok, mut failed), attempt| match attempt {
            Ok(()) => (ok + 1, failed),
            Err(failure) => {
                failed.push(failure);
                (ok, failed)
            }
        })
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory stores for exercising the accessor contract

    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;

    /// Simple in-memory store with optional fault injection
    #[derive(Default)]
    pub struct MemoryStore {
        pub data: Mutex<BTreeMap<CollectionName, Vec<Record>>>,
        pub fail_clear: Option<CollectionName>,
        pub fail_commit: Option<CollectionName>,
        /// Reject inserts of these ids
        pub reject_ids: Vec<String>,
    }

    impl CollectionStore for MemoryStore {
        fn list_all(&self, name: CollectionName) -> StudyResult<Vec<Record>> {
            let data = self.data.lock().unwrap();
            Ok(data.get(&name).cloned().unwrap_or_default())
        }

        fn clear(&self, name: CollectionName) -> StudyResult<()> {
            if self.fail_clear == Some(name) {
                return Err(StudyError::Storage("store is locked".into()));
            }
            self.data.lock().unwrap().remove(&name);
            Ok(())
        }

        fn insert(&self, name: CollectionName, record: Record) -> StudyResult<()> {
            if self.reject_ids.contains(&record.id().to_string()) {
                return Err(StudyError::Storage(format!(
                    "constraint violated by {}",
                    record.id()
                )));
            }
            let mut data = self.data.lock().unwrap();
            let records = data.entry(name).or_default();
            if records.iter().any(|r| r.id() == record.id()) {
                return Err(StudyError::duplicate_record(record.id().to_string()));
            }
            records.push(record);
            Ok(())
        }

        fn commit(&self, name: CollectionName) -> StudyResult<()> {
            if self.fail_commit == Some(name) {
                return Err(StudyError::Io("disk full".into()));
            }
            Ok(())
        }
    }
}
