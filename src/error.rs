//! Custom error types for the study scheduler store
//!
//! This module defines the error hierarchy for the backup engine using thiserror
//! for ergonomic error definitions. Every error maps onto one [`ErrorKind`], the
//! taxonomy reported to the operator after an export or restore.

use std::fmt;

use thiserror::Error;

/// The main error type for store and backup operations
#[derive(Error, Debug)]
pub enum StudyError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Storage errors (store connection or transaction failure)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Snapshot structure is malformed or missing required keys
    #[error("Schema error: {0}")]
    Schema(String),

    /// Serialized input exceeds the import size guard
    #[error("Snapshot is too large: {size} bytes exceeds the {limit} byte limit")]
    Size { size: u64, limit: u64 },

    /// A collection could not be emptied before insert
    #[error("Failed to clear collection '{collection}': {reason}")]
    Clear { collection: String, reason: String },

    /// Some records in a collection failed to insert
    #[error("{failed} of {total} records failed to insert into '{collection}'")]
    PartialInsert {
        collection: String,
        failed: usize,
        total: usize,
    },

    /// A single inbound record could not be decoded
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// Another export or restore holds the operation gate
    #[error("Another {0} is already in progress")]
    Busy(&'static str),
}

/// Error taxonomy surfaced in reports and the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    SchemaError,
    SizeError,
    IoError,
    ClearError,
    PartialInsertError,
    /// Errors outside the backup taxonomy (configuration, lookups, busy gate)
    Other,
}

impl ErrorKind {
    /// The stable code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::SchemaError => "SCHEMA_ERROR",
            ErrorKind::SizeError => "SIZE_ERROR",
            ErrorKind::IoError => "IO_ERROR",
            ErrorKind::ClearError => "CLEAR_ERROR",
            ErrorKind::PartialInsertError => "PARTIAL_INSERT_ERROR",
            ErrorKind::Other => "OTHER_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl StudyError {
    /// Create a "not found" error for records
    pub fn record_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Record",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for collections
    pub fn collection_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Collection",
            identifier: identifier.into(),
        }
    }

    /// Create a "duplicate" error for records
    pub fn duplicate_record(identifier: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: "Record",
            identifier: identifier.into(),
        }
    }

    /// Map this error onto the reporting taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(_) => ErrorKind::SchemaError,
            Self::Size { .. } => ErrorKind::SizeError,
            Self::Io(_) | Self::Json(_) | Self::Storage(_) => ErrorKind::IoError,
            Self::Clear { .. } => ErrorKind::ClearError,
            Self::PartialInsert { .. } | Self::InvalidRecord(_) | Self::Duplicate { .. } => {
                ErrorKind::PartialInsertError
            }
            Self::Config(_) | Self::NotFound { .. } | Self::Busy(_) => ErrorKind::Other,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error was raised before any store mutation
    pub fn is_pre_mutation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::SchemaError | ErrorKind::SizeError
        ) || matches!(self, Self::Busy(_))
    }
}

impl From<std::io::Error> for StudyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StudyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for store and backup operations
pub type StudyResult<T> = Result<T, StudyError>;
