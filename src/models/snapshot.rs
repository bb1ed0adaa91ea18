//! Snapshot data structures
//!
//! A [`Snapshot`] is what the builder produces from the live store. An
//! [`ImportedSnapshot`] is what the validator produces from untrusted input:
//! its collections are still raw JSON, classified per collection, and are only
//! decoded record by record while being inserted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::collection::CollectionName;
use super::record::Record;

/// Current snapshot schema version
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Snapshot key holding the export timestamp
pub const EXPORT_DATE_KEY: &str = "exportDate";

/// Snapshot key holding the optional schema version
pub const SCHEMA_VERSION_KEY: &str = "schemaVersion";

/// Point-in-time copy of every registered collection
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Records per collection; every registered collection is present
    #[serde(flatten)]
    pub collections: BTreeMap<CollectionName, Vec<Record>>,

    /// When the snapshot was built
    #[serde(rename = "exportDate")]
    pub export_date: DateTime<Utc>,

    /// Schema version tag
    #[serde(rename = "schemaVersion", skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
}

impl Snapshot {
    /// Total number of records across all collections
    pub fn total_records(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }
}

/// Classification of one inbound collection
#[derive(Debug, Clone, PartialEq)]
pub enum InboundCollection {
    /// An array of not-yet-decoded records
    Records(Vec<Value>),
    /// The key was present but its value cannot be restored
    Malformed(String),
}

impl InboundCollection {
    /// Number of inbound records, zero for malformed collections
    pub fn len(&self) -> usize {
        match self {
            InboundCollection::Records(values) => values.len(),
            InboundCollection::Malformed(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A structurally validated snapshot ready for restore
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedSnapshot {
    /// Export timestamp as written in the input, if any
    pub export_date: Option<String>,

    /// Schema version as written in the input, if any
    pub schema_version: Option<u64>,

    /// Registered collections present in the input, in declaration order
    pub collections: Vec<(CollectionName, InboundCollection)>,

    /// Keys that are neither collections nor metadata
    pub ignored_keys: Vec<String>,
}

impl ImportedSnapshot {
    /// Find one inbound collection
    pub fn collection(&self, name: CollectionName) -> Option<&InboundCollection> {
        self.collections
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, inbound)| inbound)
    }

    /// Expected record count per targeted collection
    pub fn expected_counts(&self) -> BTreeMap<CollectionName, usize> {
        self.collections
            .iter()
            .map(|(name, inbound)| (*name, inbound.len()))
            .collect()
    }

    /// Total inbound records
    pub fn total_records(&self) -> usize {
        self.collections.iter().map(|(_, inbound)| inbound.len()).sum()
    }

    /// Registered collections absent from the input (left untouched by restore)
    pub fn missing_collections(&self) -> Vec<CollectionName> {
        CollectionName::ALL
            .iter()
            .copied()
            .filter(|name| self.collection(*name).is_none())
            .collect()
    }

    /// Human-readable summary of the snapshot contents
    pub fn summary(&self) -> String {
        let present: Vec<String> = self
            .collections
            .iter()
            .map(|(name, inbound)| match inbound {
                InboundCollection::Records(values) => format!("{} ({})", name, values.len()),
                InboundCollection::Malformed(_) => format!("{} (malformed)", name),
            })
            .collect();

        let version = self
            .schema_version
            .map(|v| format!("v{}", v))
            .unwrap_or_else(|| "unversioned".to_string());

        let missing = self.missing_collections();
        if missing.is_empty() {
            format!("Complete snapshot ({}): {}", version, present.join(", "))
        } else {
            let missing: Vec<&str> = missing.iter().map(|n| n.as_str()).collect();
            format!(
                "Partial snapshot ({}): has {}, missing {}",
                version,
                present.join(", "),
                missing.join(", ")
            )
        }
    }
}

impl From<Snapshot> for ImportedSnapshot {
    fn from(snapshot: Snapshot) -> Self {
        let collections = snapshot
            .collections
            .into_iter()
            .map(|(name, records)| {
                let values = records.into_iter().map(Record::into_value).collect();
                (name, InboundCollection::Records(values))
            })
            .collect();

        Self {
            export_date: Some(snapshot.export_date.to_rfc3339()),
            schema_version: snapshot.schema_version.map(u64::from),
            collections,
            ignored_keys: Vec::new(),
        }
    }
}
