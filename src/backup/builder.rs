//! Snapshot builder
//!
//! Reads every requested collection through the accessor, one after another,
//! and assembles a versioned snapshot.

use chrono::Utc;
use tracing::debug;

use crate::error::StudyResult;
use crate::models::{CollectionName, Snapshot, SNAPSHOT_SCHEMA_VERSION};
use crate::storage::CollectionStore;

/// Build a snapshot of the given collections
///
/// Every name passed in appears as a key, even when its collection is empty.
pub fn build_snapshot<S: CollectionStore + ?Sized>(
    store: &S,
    names: &[CollectionName],
) -> StudyResult<Snapshot> {
    let mut snapshot = Snapshot {
        collections: Default::default(),
        export_date: Utc::now(),
        schema_version: Some(SNAPSHOT_SCHEMA_VERSION),
    };

    for name in names {
        let records = store.list_all(*name)?;
        debug!(collection = %name, records = records.len(), "collection read for snapshot");
        snapshot.collections.insert(*name, records);
    }

    Ok(snapshot)
}

/// Build a snapshot of every registered collection
pub fn build_full_snapshot<S: CollectionStore + ?Sized>(store: &S) -> StudyResult<Snapshot> {
    build_snapshot(store, &CollectionName::ALL)
}
