//! User settings for the study scheduler store
//!
//! Manages export naming, the import size guard and restore safety options.

use serde::{Deserialize, Serialize};

use super::paths::StudyPaths;
use crate::error::StudyError;

/// Default prefix for export artifact filenames
pub const DEFAULT_EXPORT_PREFIX: &str = "study_scheduler_backup";

/// Default ceiling for serialized snapshot input (10 MiB)
pub const DEFAULT_MAX_IMPORT_BYTES: u64 = 10 * 1024 * 1024;

/// User settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version of the settings file
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Prefix used when naming export artifacts
    #[serde(default = "default_export_prefix")]
    pub export_prefix: String,

    /// Largest snapshot input accepted for import, in bytes
    #[serde(default = "default_max_import_bytes")]
    pub max_import_bytes: u64,

    /// Pretty-print export artifacts
    #[serde(default = "default_true")]
    pub pretty_export: bool,

    /// Write a snapshot of the current store before a restore
    #[serde(default = "default_true")]
    pub safety_export_before_restore: bool,
}

fn default_schema_version() -> u32 {
    1
}

fn default_export_prefix() -> String {
    DEFAULT_EXPORT_PREFIX.to_string()
}

fn default_max_import_bytes() -> u64 {
    DEFAULT_MAX_IMPORT_BYTES
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            export_prefix: default_export_prefix(),
            max_import_bytes: default_max_import_bytes(),
            pretty_export: true,
            safety_export_before_restore: true,
        }
    }
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &StudyPaths) -> Result<Self, StudyError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| StudyError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                StudyError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &StudyPaths) -> Result<(), StudyError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| StudyError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| StudyError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.export_prefix, "study_scheduler_backup");
        assert_eq!(settings.max_import_bytes, 10_485_760);
        assert!(settings.pretty_export);
        assert!(settings.safety_export_before_restore);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = StudyPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.export_prefix = "nightly".to_string();
        settings.safety_export_before_restore = false;
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.export_prefix, "nightly");
        assert!(!loaded.safety_export_before_restore);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"pretty_export": false}"#).unwrap();
        assert!(!settings.pretty_export);
        assert_eq!(settings.max_import_bytes, DEFAULT_MAX_IMPORT_BYTES);
        assert_eq!(settings.export_prefix, DEFAULT_EXPORT_PREFIX);
    }
}
