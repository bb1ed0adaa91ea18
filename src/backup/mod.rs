//! Backup, export and restore for the study scheduler store
//!
//! # Architecture
//!
//! - `build_snapshot`: reads every registered collection through the
//!   [`CollectionStore`](crate::storage::CollectionStore) accessor.
//! - `SnapshotWriter`: serializes snapshots to dated artifacts and stamps the
//!   export marker.
//! - `SnapshotValidator`: size guard and shallow structural checks on
//!   untrusted input.
//! - `RestoreExecutor`: replaces collections one at a time in declaration
//!   order, reporting a per-collection outcome.
//! - `compute_stats`: record counts straight from the store.
//! - `BackupEngine`: the front-end facing `on_backup` / `on_restore` pair.
//!
//! # Snapshot Format
//!
//! ```text
//! {
//!   "subjects": [ ... ],
//!   "studyItems": [ ... ],
//!   "answerHistory": [ ... ],
//!   "flashcards": [ ... ],
//!   "settings": [ ... ],
//!   "exportDate": "2026-03-01T09:30:00Z",
//!   "schemaVersion": 1
//! }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use study_scheduler::backup::BackupEngine;
//! use study_scheduler::events::EventBus;
//!
//! let events = EventBus::new();
//! let engine = BackupEngine::from_settings(&storage, &paths, &settings, &events);
//!
//! let backup = engine.on_backup()?;
//! println!("wrote {}", backup.artifact.path.display());
//!
//! // Only after the user confirmed the overwrite
//! let report = engine.on_restore(&raw)?;
//! println!("{}", report.result.summary());
//! ```

pub mod builder;
pub mod engine;
pub mod restore;
pub mod stats;
pub mod validator;
pub mod writer;

pub use builder::{build_full_snapshot, build_snapshot};
pub use engine::{BackupEngine, BackupReport, RestoreReport};
pub use restore::{CollectionOutcome, CollectionReport, RestoreExecutor, RestoreResult};
pub use stats::{compute_stats, CollectionStats};
pub use validator::SnapshotValidator;
pub use writer::{ArtifactInfo, ExportArtifact, SnapshotWriter};
