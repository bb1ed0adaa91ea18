//! Export state marker
//!
//! Records when an export was last triggered. The marker is written when the
//! write is started, not when the artifact is known to be durable, so it says
//! nothing about whether a usable backup exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted "last exported at" marker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportState {
    /// ISO-8601 timestamp of the most recent export attempt
    #[serde(default, rename = "lastExportDate")]
    pub last_export_date: Option<DateTime<Utc>>,
}

impl ExportState {
    /// Marker stamped at the given instant
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            last_export_date: Some(timestamp),
        }
    }

    /// Display form of the marker
    pub fn describe(&self) -> String {
        match self.last_export_date {
            Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            None => "never".to_string(),
        }
    }
}
