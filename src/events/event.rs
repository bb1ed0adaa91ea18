//! Engine event types
//!
//! Published while exports and restores run so a front end can follow the
//! per-collection state machine and refresh its counts.

use std::path::PathBuf;

use serde::Serialize;

use crate::backup::CollectionStats;
use crate::models::CollectionName;
use crate::storage::CollectionPhase;

/// Events emitted by the backup engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// An export began
    ExportStarted,
    /// The export artifact was written
    ExportCompleted { path: PathBuf, records: usize },
    /// A restore began for the listed collections
    RestoreStarted { collections: Vec<CollectionName> },
    /// A collection moved to a new phase
    CollectionPhaseChanged {
        collection: CollectionName,
        phase: CollectionPhase,
    },
    /// A restore finished; `success` is false if any collection failed
    RestoreCompleted { success: bool },
    /// Counts were recomputed
    StatsRefreshed { stats: CollectionStats },
}

impl EngineEvent {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            EngineEvent::ExportStarted => "export_started",
            EngineEvent::ExportCompleted { .. } => "export_completed",
            EngineEvent::RestoreStarted { .. } => "restore_started",
            EngineEvent::CollectionPhaseChanged { .. } => "collection_phase_changed",
            EngineEvent::RestoreCompleted { .. } => "restore_completed",
            EngineEvent::StatsRefreshed { .. } => "stats_refreshed",
        }
    }
}
