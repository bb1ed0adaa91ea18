//! Path management for the study scheduler store
//!
//! Provides platform-aware path resolution for configuration, collection data,
//! export artifacts and the activity log.
//!
//! ## Path Resolution Order
//!
//! 1. `STUDY_SCHEDULER_DATA_DIR` environment variable (if set)
//! 2. The platform config directory (`~/.config/study-scheduler` on Linux,
//!    `~/Library/Application Support/study-scheduler` on macOS,
//!    `%APPDATA%\study-scheduler` on Windows)

use std::path::PathBuf;

use crate::error::StudyError;
use crate::models::CollectionName;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "STUDY_SCHEDULER_DATA_DIR";

/// Manages all paths used by the store
#[derive(Debug, Clone)]
pub struct StudyPaths {
    /// Base directory for all store data
    base_dir: PathBuf,
}

impl StudyPaths {
    /// Create a new StudyPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home/config directory can be determined.
    pub fn new() -> Result<Self, StudyError> {
        let base_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create StudyPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory holding one JSON file per collection
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the default directory for export artifacts
    pub fn export_dir(&self) -> PathBuf {
        self.base_dir.join("exports")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the activity log
    pub fn activity_log(&self) -> PathBuf {
        self.base_dir.join("activity.log")
    }

    /// Get the path to the persisted "last exported at" marker
    pub fn export_state_file(&self) -> PathBuf {
        self.base_dir.join("export_state.json")
    }

    /// Get the path to a collection's data file
    pub fn collection_file(&self, name: CollectionName) -> PathBuf {
        self.data_dir().join(format!("{}.json", name.as_str()))
    }

    /// Ensure base, data and export directories exist
    pub fn ensure_directories(&self) -> Result<(), StudyError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| StudyError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| StudyError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.export_dir())
            .map_err(|e| StudyError::Io(format!("Failed to create export directory: {}", e)))?;

        Ok(())
    }

    /// Check if the store has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

/// Resolve the default base directory from the platform config directory
fn resolve_default_path() -> Result<PathBuf, StudyError> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.config_dir().join("study-scheduler"))
        .ok_or_else(|| StudyError::Config("Could not determine a config directory".into()))
}
