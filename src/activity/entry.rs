//! Activity entry data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{ErrorKind, StudyError};

/// Operations recorded in the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Export,
    Validate,
    Restore,
    /// A record was added outside of a restore
    RecordAdd,
    /// A record was removed outside of a restore
    RecordRemove,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Export => write!(f, "EXPORT"),
            Operation::Validate => write!(f, "VALIDATE"),
            Operation::Restore => write!(f, "RESTORE"),
            Operation::RecordAdd => write!(f, "RECORD ADD"),
            Operation::RecordRemove => write!(f, "RECORD REMOVE"),
        }
    }
}

/// How an operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    PartialFailure,
    Failure,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "ok"),
            Outcome::PartialFailure => write!(f, "partial"),
            Outcome::Failure => write!(f, "failed"),
        }
    }
}

/// A single activity log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Unique id of the entry
    pub id: Uuid,

    /// When the operation finished (UTC)
    pub timestamp: DateTime<Utc>,

    pub operation: Operation,

    pub outcome: Outcome,

    /// One-line human-readable summary
    pub summary: String,

    /// Error code when the operation failed outright
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    /// Structured details (per-collection report, artifact path, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ActivityEntry {
    /// Create an entry stamped with the current time
    pub fn new(operation: Operation, outcome: Outcome, summary: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            operation,
            outcome,
            summary: summary.into(),
            error_kind: None,
            details: None,
        }
    }

    /// Entry for an operation that failed with `error`
    pub fn failure(operation: Operation, error: &StudyError) -> Self {
        let mut entry = Self::new(operation, Outcome::Failure, error.to_string());
        entry.error_kind = Some(error.kind());
        entry
    }

    /// Attach structured details; details that fail to serialize are logged
    /// and left out
    pub fn with_details<T: Serialize>(mut self, details: &T) -> Self {
        self.details = match serde_json::to_value(details) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(operation = %self.operation, error = %e, "activity details not serialized");
                None
            }
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_failure_entry_carries_kind() {
        let err = StudyError::Size { size: 20, limit: 10 };
        let entry = ActivityEntry::failure(Operation::Validate, &err);

        assert_eq!(entry.outcome, Outcome::Failure);
        assert_eq!(entry.error_kind, Some(ErrorKind::SizeError));
        assert!(entry.summary.contains("20 bytes"));
    }

    #[test]
    fn test_serialization() {
        let entry = ActivityEntry::new(Operation::Export, Outcome::Success, "wrote 3 records")
            .with_details(&json!({"path": "/tmp/a.json"}));

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["operation"], "export");
        assert_eq!(value["outcome"], "success");
        assert_eq!(value["details"]["path"], "/tmp/a.json");
        assert!(value.get("error_kind").is_none());

        let parsed: ActivityEntry = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.id, entry.id);
    }

    #[test]
    fn test_display() {
        assert_eq!(Operation::RecordRemove.to_string(), "RECORD REMOVE");
        assert_eq!(Outcome::PartialFailure.to_string(), "partial");
    }

    #[test]
    fn test_unserializable_details_are_dropped() {
        // JSON object keys must be strings
        let mut details = BTreeMap::new();
        details.insert((1, 2), "pair");

        let entry = ActivityEntry::new(Operation::Export, Outcome::Success, "exported")
            .with_details(&details);

        assert!(entry.details.is_none());
        assert_eq!(entry.summary, "exported");
    }
}
