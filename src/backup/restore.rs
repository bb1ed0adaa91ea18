//! Snapshot restoration
//!
//! Applies a validated snapshot collection by collection, in declaration
//! order. Each collection runs `Pending -> Clearing -> Inserting -> Done |
//! Failed` independently: a failure is recorded and the next collection is
//! still attempted, and collections that already succeeded are never rolled
//! back. A collection that fails after its clear is left emptied; the report
//! says so instead of hiding it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{ErrorKind, StudyError};
use crate::events::{EngineEvent, EventBus};
use crate::models::{CollectionName, ImportedSnapshot, InboundCollection};
use crate::storage::{CollectionPhase, CollectionStore, InsertFailure, ReplaceOutcome};

/// Outcome for one collection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CollectionOutcome {
    /// Every record was restored
    Success { inserted: usize },
    /// The collection was replaced but some records failed to insert
    PartialFailure {
        inserted: usize,
        failed_count: usize,
        failures: Vec<InsertFailure>,
    },
    /// Nothing was restored into this collection
    HardFailure {
        kind: ErrorKind,
        reason: String,
        /// Whether the collection's prior contents were already cleared
        cleared: bool,
    },
}

/// Report line for one collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionReport {
    pub collection: CollectionName,
    /// Records carried by the snapshot for this collection
    pub expected: usize,
    pub outcome: CollectionOutcome,
}

impl CollectionReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CollectionOutcome::Success { .. })
    }

    /// Final phase reached by the collection
    pub fn phase(&self) -> CollectionPhase {
        if self.is_success() {
            CollectionPhase::Done
        } else {
            CollectionPhase::Failed
        }
    }

    /// The error this report represents, if it failed
    pub fn error(&self) -> Option<StudyError> {
        match &self.outcome {
            CollectionOutcome::Success { .. } => None,
            CollectionOutcome::PartialFailure {
                inserted,
                failed_count,
                ..
            } => Some(StudyError::PartialInsert {
                collection: self.collection.to_string(),
                failed: *failed_count,
                total: inserted + failed_count,
            }),
            CollectionOutcome::HardFailure { kind, reason, .. } => Some(match kind {
                ErrorKind::ClearError => StudyError::Clear {
                    collection: self.collection.to_string(),
                    reason: reason.clone(),
                },
                ErrorKind::SchemaError => StudyError::Schema(reason.clone()),
                _ => StudyError::Storage(reason.clone()),
            }),
        }
    }
}

/// Result of a restore operation
#[derive(Debug, Clone, Serialize)]
pub struct RestoreResult {
    /// Export date carried by the snapshot
    pub snapshot_date: Option<String>,
    /// Schema version carried by the snapshot
    pub schema_version: Option<u64>,
    /// One report per targeted collection, in declaration order
    pub reports: Vec<CollectionReport>,
    /// Snapshot keys that were not restored
    pub ignored_keys: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RestoreResult {
    /// True only if every targeted collection succeeded
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(CollectionReport::is_success)
    }

    /// Report for one collection
    pub fn report(&self, name: CollectionName) -> Option<&CollectionReport> {
        self.reports.iter().find(|r| r.collection == name)
    }

    /// Collections that did not fully restore
    pub fn failed_collections(&self) -> Vec<CollectionName> {
        self.reports
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.collection)
            .collect()
    }

    /// Collections that failed after being cleared (possible data loss)
    pub fn emptied_collections(&self) -> Vec<CollectionName> {
        self.reports
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    CollectionOutcome::HardFailure { cleared: true, .. }
                )
            })
            .map(|r| r.collection)
            .collect()
    }

    /// Errors per failed collection
    pub fn errors(&self) -> Vec<StudyError> {
        self.reports.iter().filter_map(CollectionReport::error).collect()
    }

    /// Total records inserted across all collections
    pub fn inserted_total(&self) -> usize {
        self.reports
            .iter()
            .map(|r| match &r.outcome {
                CollectionOutcome::Success { inserted }
                | CollectionOutcome::PartialFailure { inserted, .. } => *inserted,
                CollectionOutcome::HardFailure { .. } => 0,
            })
            .sum()
    }

    /// One-line summary of what was restored
    pub fn summary(&self) -> String {
        let restored: Vec<&str> = self
            .reports
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.collection.as_str())
            .collect();
        let failed: Vec<String> = self
            .reports
            .iter()
            .filter_map(|r| r.error().map(|e| format!("{} ({})", r.collection, e.kind())))
            .collect();

        if failed.is_empty() {
            format!(
                "Restored {} record(s): {}",
                self.inserted_total(),
                restored.join(", ")
            )
        } else {
            format!(
                "Restore incomplete: restored {}; failed {}",
                if restored.is_empty() {
                    "nothing".to_string()
                } else {
                    restored.join(", ")
                },
                failed.join(", ")
            )
        }
    }
}

/// Applies validated snapshots to a store
pub struct RestoreExecutor<'a, S: CollectionStore + ?Sized> {
    store: &'a S,
    events: Option<&'a EventBus>,
}

impl<'a, S: CollectionStore + ?Sized> RestoreExecutor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            events: None,
        }
    }

    /// Publish phase changes on `events`
    pub fn with_events(mut self, events: &'a EventBus) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(bus) = self.events {
            bus.emit(event);
        }
    }

    fn emit_phase(&self, collection: CollectionName, phase: CollectionPhase) {
        self.emit(EngineEvent::CollectionPhaseChanged { collection, phase });
    }

    /// Restore every registered collection present in `snapshot`
    ///
    /// Destructive: the caller must have obtained confirmation. Collections
    /// absent from the snapshot are left untouched.
    pub fn restore(&self, snapshot: ImportedSnapshot) -> RestoreResult {
        let started_at = Utc::now();
        let targets: Vec<CollectionName> =
            snapshot.collections.iter().map(|(name, _)| *name).collect();

        info!(collections = ?targets, "restore started");
        self.emit(EngineEvent::RestoreStarted {
            collections: targets.clone(),
        });
        for name in &targets {
            self.emit_phase(*name, CollectionPhase::Pending);
        }

        let reports: Vec<CollectionReport> = snapshot
            .collections
            .into_iter()
            .map(|(name, inbound)| self.restore_collection(name, inbound))
            .collect();

        let result = RestoreResult {
            snapshot_date: snapshot.export_date,
            schema_version: snapshot.schema_version,
            reports,
            ignored_keys: snapshot.ignored_keys,
            started_at,
            finished_at: Utc::now(),
        };

        if result.is_success() {
            info!(records = result.inserted_total(), "restore completed");
        } else {
            error!(failed = ?result.failed_collections(), "restore completed with failures");
        }
        self.emit(EngineEvent::RestoreCompleted {
            success: result.is_success(),
        });

        result
    }

    fn restore_collection(
        &self,
        name: CollectionName,
        inbound: InboundCollection,
    ) -> CollectionReport {
        let values = match inbound {
            InboundCollection::Records(values) => values,
            InboundCollection::Malformed(reason) => {
                warn!(collection = %name, %reason, "skipping malformed collection");
                self.emit_phase(name, CollectionPhase::Failed);
                return CollectionReport {
                    collection: name,
                    expected: 0,
                    outcome: CollectionOutcome::HardFailure {
                        kind: ErrorKind::SchemaError,
                        reason,
                        cleared: false,
                    },
                };
            }
        };

        let expected = values.len();
        let mut cleared = false;
        let outcome = self
            .store
            .replace_all_observed(name, values, &mut |phase| {
                if phase == CollectionPhase::Inserting {
                    cleared = true;
                }
                self.emit_phase(name, phase);
            });

        let outcome = match outcome {
            ReplaceOutcome::Complete { inserted } => CollectionOutcome::Success { inserted },
            ReplaceOutcome::Partial { inserted, failures } => {
                warn!(
                    collection = %name,
                    failed = failures.len(),
                    total = expected,
                    "collection partially restored"
                );
                CollectionOutcome::PartialFailure {
                    inserted,
                    failed_count: failures.len(),
                    failures,
                }
            }
            ReplaceOutcome::Aborted(err) => {
                error!(collection = %name, error = %err, cleared, "collection restore failed");
                CollectionOutcome::HardFailure {
                    kind: err.kind(),
                    reason: err.to_string(),
                    cleared,
                }
            }
        };

        CollectionReport {
            collection: name,
            expected,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::builder::build_full_snapshot;
    use crate::backup::stats::compute_stats;
    use crate::backup::validator::SnapshotValidator;
    use crate::storage::accessor::test_support::MemoryStore;
    use serde_json::json;

    fn imported(raw: &str) -> ImportedSnapshot {
        SnapshotValidator::new().validate(raw).unwrap()
    }

    #[test]
    fn test_scenario_subjects_and_history() {
        let store = MemoryStore::default();
        let result = RestoreExecutor::new(&store)
            .restore(imported(r#"{"subjects":[{"id":"s1"}],"answerHistory":[]}"#));

        assert!(result.is_success());
        let stats = compute_stats(&store).unwrap();
        assert_eq!(stats.get(CollectionName::Subjects), 1);
        assert_eq!(stats.get(CollectionName::AnswerHistory), 0);
    }

    #[test]
    fn test_counts_match_snapshot_lengths() {
        let store = MemoryStore::default();
        store.replace_all(CollectionName::Flashcards, vec![json!({"id": "stale"})]);

        let snapshot = imported(
            r#"{
                "subjects": [{"id": "s1"}, {"id": "s2"}],
                "studyItems": [{"id": 1}, {"id": 2}, {"id": 3}],
                "answerHistory": [],
                "flashcards": [{"id": "f1"}],
                "settings": [{"key": "theme", "value": "dark"}]
            }"#,
        );
        let result = RestoreExecutor::new(&store).restore(snapshot.clone());

        assert!(result.is_success());
        let stats = compute_stats(&store).unwrap();
        assert!(stats.mismatches(&snapshot).is_empty());
        assert_eq!(stats.total(), 7);
    }

    #[test]
    fn test_round_trip() {
        let store = MemoryStore::default();
        store.replace_all(
            CollectionName::Subjects,
            vec![json!({"id": "s1"}), json!({"id": "s2"})],
        );
        store.replace_all(CollectionName::Settings, vec![json!({"key": "lang"})]);
        let before = compute_stats(&store).unwrap();

        let snapshot = build_full_snapshot(&store).unwrap();
        let result = RestoreExecutor::new(&store).restore(snapshot.into());

        assert!(result.is_success());
        assert_eq!(compute_stats(&store).unwrap(), before);
    }

    #[test]
    fn test_partial_insert_reports_failed_count() {
        let store = MemoryStore::default();
        let result = RestoreExecutor::new(&store).restore(imported(
            r#"{"subjects":[{"id":"a"},{"id":"b"},{"oops":true},{"id":"d"},{"id":"e"}]}"#,
        ));

        assert!(!result.is_success());
        let report = result.report(CollectionName::Subjects).unwrap();
        match &report.outcome {
            CollectionOutcome::PartialFailure { failed_count, inserted, .. } => {
                assert_eq!(*failed_count, 1);
                assert_eq!(*inserted, 4);
            }
            other => panic!("expected partial failure, got {:?}", other),
        }
        assert_eq!(
            report.error().unwrap().kind().code(),
            "PARTIAL_INSERT_ERROR"
        );
        assert_eq!(store.count(CollectionName::Subjects).unwrap(), 4);
    }

    #[test]
    fn test_failure_does_not_stop_later_collections() {
        let store = MemoryStore {
            fail_clear: Some(CollectionName::StudyItems),
            ..Default::default()
        };

        let result = RestoreExecutor::new(&store).restore(imported(
            r#"{"subjects":[{"id":"s1"}],"studyItems":[{"id":1}],"flashcards":[{"id":"f1"}]}"#,
        ));

        assert!(!result.is_success());
        assert_eq!(result.failed_collections(), vec![CollectionName::StudyItems]);
        assert_eq!(store.count(CollectionName::Subjects).unwrap(), 1);
        assert_eq!(store.count(CollectionName::Flashcards).unwrap(), 1);

        let errors = result.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind().code(), "CLEAR_ERROR");
        assert!(result.emptied_collections().is_empty());
    }

    #[test]
    fn test_commit_failure_marks_collection_emptied() {
        let store = MemoryStore {
            fail_commit: Some(CollectionName::Subjects),
            ..Default::default()
        };

        let result =
            RestoreExecutor::new(&store).restore(imported(r#"{"subjects":[{"id":"s1"}]}"#));

        assert_eq!(result.emptied_collections(), vec![CollectionName::Subjects]);
        assert_eq!(result.errors()[0].kind().code(), "IO_ERROR");
    }

    #[test]
    fn test_malformed_collection_is_not_cleared() {
        let store = MemoryStore::default();
        store.replace_all(CollectionName::Flashcards, vec![json!({"id": "keep"})]);

        let result = RestoreExecutor::new(&store)
            .restore(imported(r#"{"subjects":[],"flashcards":{"id":"x"}}"#));

        let report = result.report(CollectionName::Flashcards).unwrap();
        assert!(matches!(
            report.outcome,
            CollectionOutcome::HardFailure {
                kind: ErrorKind::SchemaError,
                cleared: false,
                ..
            }
        ));
        assert_eq!(store.count(CollectionName::Flashcards).unwrap(), 1);
    }

    #[test]
    fn test_absent_collections_untouched() {
        let store = MemoryStore::default();
        store.replace_all(CollectionName::AnswerHistory, vec![json!({"id": 1})]);

        let result = RestoreExecutor::new(&store).restore(imported(r#"{"subjects":[]}"#));

        assert_eq!(result.reports.len(), 1);
        assert_eq!(store.count(CollectionName::AnswerHistory).unwrap(), 1);
    }

    #[test]
    fn test_reports_follow_declaration_order() {
        let store = MemoryStore::default();
        let result = RestoreExecutor::new(&store)
            .restore(imported(r#"{"settings":[],"flashcards":[],"subjects":[]}"#));

        let order: Vec<CollectionName> = result.reports.iter().map(|r| r.collection).collect();
        assert_eq!(
            order,
            vec![
                CollectionName::Subjects,
                CollectionName::Flashcards,
                CollectionName::Settings
            ]
        );
    }

    #[test]
    fn test_phase_events() {
        let store = MemoryStore::default();
        let bus = EventBus::new();
        let sub = bus.subscribe();

        RestoreExecutor::new(&store)
            .with_events(&bus)
            .restore(imported(r#"{"subjects":[{"id":"s1"}]}"#));

        let phases: Vec<CollectionPhase> = sub
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::CollectionPhaseChanged { phase, .. } => Some(phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                CollectionPhase::Pending,
                CollectionPhase::Clearing,
                CollectionPhase::Inserting,
                CollectionPhase::Done
            ]
        );
    }

    #[test]
    fn test_summary() {
        let store = MemoryStore {
            fail_clear: Some(CollectionName::Settings),
            ..Default::default()
        };
        let result = RestoreExecutor::new(&store)
            .restore(imported(r#"{"subjects":[{"id":"s1"}],"settings":[]}"#));

        let summary = result.summary();
        assert!(summary.starts_with("Restore incomplete"));
        assert!(summary.contains("subjects"));
        assert!(summary.contains("settings (CLEAR_ERROR)"));
    }
}
