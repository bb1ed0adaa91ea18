//! Backup engine
//!
//! Ties the builder, writer, validator and restore executor together behind
//! the two operations a front end calls: [`BackupEngine::on_backup`] and
//! [`BackupEngine::on_restore`]. Both return fresh collection stats.
//!
//! Each engine value owns one gate shared by its exports and restores. A
//! second operation started on the same engine while one is running is
//! rejected with [`StudyError::Busy`]. The gate is not keyed to the store:
//! two engines built over the same store do not exclude each other, so
//! callers that need serialization must share a single engine. Nothing
//! guards against another process using the same data directory.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use tracing::{info, warn};

use crate::activity::{ActivityEntry, ActivityLogger, Operation, Outcome};
use crate::config::paths::StudyPaths;
use crate::config::settings::Settings;
use crate::error::{StudyError, StudyResult};
use crate::events::{EngineEvent, EventBus};
use crate::models::ImportedSnapshot;
use crate::storage::CollectionStore;

use super::builder::build_full_snapshot;
use super::restore::{CollectionOutcome, RestoreExecutor, RestoreResult};
use super::stats::{compute_stats, CollectionStats};
use super::validator::SnapshotValidator;
use super::writer::{ExportArtifact, SnapshotWriter};

/// Result of [`BackupEngine::on_backup`]
#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub artifact: ExportArtifact,
    pub stats: CollectionStats,
}

/// Result of a restore that got past validation
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub result: RestoreResult,
    pub stats: CollectionStats,
    /// Snapshot of the store taken just before the restore, if enabled
    pub safety_artifact: Option<ExportArtifact>,
}

/// Rejects overlapping operations on one engine
#[derive(Default)]
struct OperationGate {
    current: Mutex<Option<&'static str>>,
}

impl OperationGate {
    fn enter(&self, operation: &'static str) -> StudyResult<GateGuard<'_>> {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(running) = *current {
            warn!(requested = operation, running, "operation rejected, gate is held");
            return Err(StudyError::Busy(running));
        }
        *current = Some(operation);
        Ok(GateGuard { gate: self })
    }
}

struct GateGuard<'a> {
    gate: &'a OperationGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        let mut current = self.gate.current.lock().unwrap_or_else(|p| p.into_inner());
        *current = None;
    }
}

/// Export and restore entry point for one store
pub struct BackupEngine<'a, S: CollectionStore + ?Sized> {
    store: &'a S,
    writer: SnapshotWriter,
    validator: SnapshotValidator,
    events: &'a EventBus,
    activity: Option<&'a ActivityLogger>,
    safety_export: bool,
    gate: OperationGate,
}

impl<'a, S: CollectionStore + ?Sized> BackupEngine<'a, S> {
    pub fn new(
        store: &'a S,
        writer: SnapshotWriter,
        validator: SnapshotValidator,
        events: &'a EventBus,
    ) -> Self {
        Self {
            store,
            writer,
            validator,
            events,
            activity: None,
            safety_export: false,
            gate: OperationGate::default(),
        }
    }

    /// Engine configured from settings
    pub fn from_settings(
        store: &'a S,
        paths: &StudyPaths,
        settings: &Settings,
        events: &'a EventBus,
    ) -> Self {
        Self::new(
            store,
            SnapshotWriter::from_settings(paths, settings),
            SnapshotValidator::from_settings(settings),
            events,
        )
        .safety_export(settings.safety_export_before_restore)
    }

    /// Record every operation in `logger`
    pub fn with_activity(mut self, logger: &'a ActivityLogger) -> Self {
        self.activity = Some(logger);
        self
    }

    /// Export the current store before each restore
    pub fn safety_export(mut self, enabled: bool) -> Self {
        self.safety_export = enabled;
        self
    }

    /// Write export artifacts to `dir` instead of the configured directory
    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.writer = self.writer.with_export_dir(dir);
        self
    }

    pub fn writer(&self) -> &SnapshotWriter {
        &self.writer
    }

    pub fn validator(&self) -> &SnapshotValidator {
        &self.validator
    }

    fn log_activity(&self, entry: ActivityEntry) {
        if let Some(logger) = self.activity {
            logger.record(&entry);
        }
    }

    /// Recompute counts from the store and publish them
    pub fn refresh_stats(&self) -> StudyResult<CollectionStats> {
        let stats = compute_stats(self.store)?;
        self.events.emit(EngineEvent::StatsRefreshed {
            stats: stats.clone(),
        });
        Ok(stats)
    }

    /// Build a snapshot of every collection and write it to a new artifact
    pub fn on_backup(&self) -> StudyResult<BackupReport> {
        let _guard = self.gate.enter("export")?;

        match self.export_artifact() {
            Ok(artifact) => {
                self.log_activity(
                    ActivityEntry::new(
                        Operation::Export,
                        Outcome::Success,
                        format!("Exported {} record(s) to {}", artifact.records, artifact.filename),
                    )
                    .with_details(&artifact),
                );
                let stats = self.refresh_stats()?;
                Ok(BackupReport { artifact, stats })
            }
            Err(e) => {
                self.log_activity(ActivityEntry::failure(Operation::Export, &e));
                Err(e)
            }
        }
    }

    /// Build a snapshot and serialize it onto `out` instead of a file
    ///
    /// Returns the number of bytes written.
    pub fn on_backup_to<W: Write>(&self, out: &mut W) -> StudyResult<usize> {
        let _guard = self.gate.enter("export")?;
        self.events.emit(EngineEvent::ExportStarted);

        let result = build_full_snapshot(self.store).and_then(|snapshot| {
            let written = self.writer.write_to(&snapshot, out)?;
            Ok((written, snapshot.total_records()))
        });

        match result {
            Ok((written, records)) => {
                info!(bytes = written, records, "snapshot streamed");
                self.log_activity(ActivityEntry::new(
                    Operation::Export,
                    Outcome::Success,
                    format!("Streamed {} record(s) to stdout", records),
                ));
                Ok(written)
            }
            Err(e) => {
                self.log_activity(ActivityEntry::failure(Operation::Export, &e));
                Err(e)
            }
        }
    }

    fn export_artifact(&self) -> StudyResult<ExportArtifact> {
        self.events.emit(EngineEvent::ExportStarted);
        let snapshot = build_full_snapshot(self.store)?;
        let artifact = self.writer.write(&snapshot)?;
        info!(path = %artifact.path.display(), records = artifact.records, "export completed");
        self.events.emit(EngineEvent::ExportCompleted {
            path: artifact.path.clone(),
            records: artifact.records,
        });
        Ok(artifact)
    }

    /// Validate snapshot text without touching the store
    pub fn validate(&self, raw: &str) -> StudyResult<ImportedSnapshot> {
        self.logged_validation(self.validator.validate(raw))
    }

    /// Validate a snapshot file without touching the store
    pub fn validate_file(&self, path: &Path) -> StudyResult<ImportedSnapshot> {
        self.logged_validation(self.validator.validate_file(path))
    }

    fn logged_validation(
        &self,
        result: StudyResult<ImportedSnapshot>,
    ) -> StudyResult<ImportedSnapshot> {
        match &result {
            Ok(snapshot) => self.log_activity(ActivityEntry::new(
                Operation::Validate,
                Outcome::Success,
                snapshot.summary(),
            )),
            Err(e) => self.log_activity(ActivityEntry::failure(Operation::Validate, e)),
        }
        result
    }

    /// Validate `raw` and restore it
    ///
    /// Destructive: the caller must have obtained confirmation first.
    /// Validation failures return an error before anything is mutated; once
    /// the restore runs, per-collection failures are reported in the result.
    pub fn on_restore(&self, raw: &str) -> StudyResult<RestoreReport> {
        let _guard = self.gate.enter("restore")?;
        let snapshot = self.validated_for_restore(self.validator.validate(raw))?;
        self.run_restore(snapshot)
    }

    /// [`on_restore`](Self::on_restore) reading from a file
    pub fn on_restore_file(&self, path: &Path) -> StudyResult<RestoreReport> {
        let _guard = self.gate.enter("restore")?;
        let snapshot = self.validated_for_restore(self.validator.validate_file(path))?;
        self.run_restore(snapshot)
    }

    /// Restore an already validated snapshot
    pub fn restore(&self, snapshot: ImportedSnapshot) -> StudyResult<RestoreReport> {
        let _guard = self.gate.enter("restore")?;
        self.run_restore(snapshot)
    }

    fn validated_for_restore(
        &self,
        result: StudyResult<ImportedSnapshot>,
    ) -> StudyResult<ImportedSnapshot> {
        result.map_err(|e| {
            warn!(error = %e, "restore rejected before any mutation");
            self.log_activity(ActivityEntry::failure(Operation::Restore, &e));
            e
        })
    }

    fn run_restore(&self, snapshot: ImportedSnapshot) -> StudyResult<RestoreReport> {
        let safety_artifact = if self.safety_export {
            match self.export_artifact() {
                Ok(artifact) => {
                    info!(path = %artifact.path.display(), "safety export written");
                    Some(artifact)
                }
                Err(e) => {
                    // Refuse to mutate the store without a way back
                    self.log_activity(ActivityEntry::failure(Operation::Restore, &e));
                    return Err(e);
                }
            }
        } else {
            None
        };

        let result = RestoreExecutor::new(self.store)
            .with_events(self.events)
            .restore(snapshot);

        self.log_activity(
            ActivityEntry::new(Operation::Restore, restore_outcome(&result), result.summary())
                .with_details(&result.reports),
        );

        let stats = self.refresh_stats()?;
        Ok(RestoreReport {
            result,
            stats,
            safety_artifact,
        })
    }
}

fn restore_outcome(result: &RestoreResult) -> Outcome {
    if result.is_success() {
        return Outcome::Success;
    }
    let anything_restored = result.reports.iter().any(|r| {
        !matches!(r.outcome, CollectionOutcome::HardFailure { .. })
    });
    if anything_restored {
        Outcome::PartialFailure
    } else {
        Outcome::Failure
    }
}
