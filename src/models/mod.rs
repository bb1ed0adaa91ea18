//! Core data models for the study scheduler store
//!
//! This module contains the collection registry, the opaque record type and
//! the snapshot structures exchanged by the backup engine.

pub mod collection;
pub mod export_state;
pub mod record;
pub mod snapshot;

pub use collection::CollectionName;
pub use export_state::ExportState;
pub use record::{Record, RecordId};
pub use snapshot::{
    ImportedSnapshot, InboundCollection, Snapshot, EXPORT_DATE_KEY, SCHEMA_VERSION_KEY,
    SNAPSHOT_SCHEMA_VERSION,
};
