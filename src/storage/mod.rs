//! Storage layer for the study scheduler store
//!
//! Provides JSON file storage with atomic writes, one file per registered
//! collection, and the [`CollectionStore`] accessor the backup engine uses.

pub mod accessor;
pub mod collection;
pub mod export_state;
pub mod file_io;

pub use accessor::{CollectionPhase, CollectionStore, InsertFailure, ReplaceOutcome};
pub use collection::CollectionRepository;
pub use export_state::ExportStateRepository;
pub use file_io::{read_json, write_bytes_atomic, write_json_atomic};

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::paths::StudyPaths;
use crate::error::{StudyError, StudyResult};
use crate::models::{CollectionName, Record};

/// Main storage coordinator that provides access to all collections
pub struct Storage {
    paths: StudyPaths,
    collections: BTreeMap<CollectionName, CollectionRepository>,
}

impl Storage {
    /// Create a new Storage instance without loading any data
    pub fn new(paths: StudyPaths) -> StudyResult<Self> {
        paths.ensure_directories()?;

        let collections = CollectionName::ALL
            .iter()
            .map(|name| {
                (
                    *name,
                    CollectionRepository::new(*name, paths.collection_file(*name)),
                )
            })
            .collect();

        Ok(Self { paths, collections })
    }

    /// Create a Storage instance and load every collection from disk
    pub fn open(paths: StudyPaths) -> StudyResult<Self> {
        let storage = Self::new(paths)?;
        storage.load_all()?;
        Ok(storage)
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &StudyPaths {
        &self.paths
    }

    /// Get the repository for one collection
    pub fn repository(&self, name: CollectionName) -> StudyResult<&CollectionRepository> {
        self.collections
            .get(&name)
            .ok_or_else(|| StudyError::collection_not_found(name.as_str()))
    }

    /// The export marker repository for this store
    pub fn export_state(&self) -> ExportStateRepository {
        ExportStateRepository::new(self.paths.export_state_file())
    }

    /// Load all collections from disk
    pub fn load_all(&self) -> StudyResult<()> {
        for repo in self.collections.values() {
            repo.load()?;
        }
        Ok(())
    }

    /// Save all collections to disk
    pub fn save_all(&self) -> StudyResult<()> {
        for repo in self.collections.values() {
            repo.save()?;
        }
        Ok(())
    }

    /// Check if storage has been initialized
    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }

    /// Save one collection, reloading it from disk when the write fails so
    /// the in-memory view never diverges from what is persisted
    fn persist(&self, repo: &CollectionRepository) -> StudyResult<()> {
        repo.save().map_err(|e| {
            if let Err(reload) = repo.load() {
                warn!(
                    collection = %repo.name(),
                    error = %reload,
                    "reload after failed save also failed"
                );
            }
            e
        })
    }
}

impl CollectionStore for Storage {
    fn list_all(&self, name: CollectionName) -> StudyResult<Vec<Record>> {
        self.repository(name)?.get_all()
    }

    fn clear(&self, name: CollectionName) -> StudyResult<()> {
        let repo = self.repository(name)?;
        // Persist the empty collection before any insert is attempted
        repo.clear()
            .and_then(|_| self.persist(repo))
            .map_err(|e| StudyError::Clear {
                collection: name.to_string(),
                reason: e.to_string(),
            })?;
        debug!(collection = %name, "collection cleared");
        Ok(())
    }

    fn insert(&self, name: CollectionName, record: Record) -> StudyResult<()> {
        self.repository(name)?.insert(record)
    }

    fn commit(&self, name: CollectionName) -> StudyResult<()> {
        self.persist(self.repository(name)?)
    }

    fn count(&self, name: CollectionName) -> StudyResult<usize> {
        self.repository(name)?.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::compute_stats;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = StudyPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_storage_creation() {
        let (temp_dir, storage) = create_storage();

        assert!(temp_dir.path().join("data").exists());
        assert!(temp_dir.path().join("exports").exists());
        assert!(!storage.is_initialized());
        for name in CollectionName::ALL {
            assert_eq!(storage.count(name).unwrap(), 0);
        }
    }

    #[test]
    fn test_replace_all_persists() {
        let (temp_dir, storage) = create_storage();

        let outcome = storage.replace_all(
            CollectionName::Flashcards,
            vec![json!({"id": "f1", "front": "猫"}), json!({"id": "f2"})],
        );
        assert!(outcome.is_success());

        let reopened =
            Storage::open(StudyPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(reopened.count(CollectionName::Flashcards).unwrap(), 2);
    }

    #[test]
    fn test_partial_replace_persists_successful_records() {
        let (temp_dir, storage) = create_storage();

        let outcome = storage.replace_all(
            CollectionName::Subjects,
            vec![
                json!({"id": "s1"}),
                json!({"id": "s2"}),
                json!(["not", "an", "object"]),
                json!({"id": "s4"}),
                json!({"id": "s5"}),
            ],
        );
        assert_eq!(outcome.failed_count(), 1);

        let reopened =
            Storage::open(StudyPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(reopened.count(CollectionName::Subjects).unwrap(), 4);
    }

    #[test]
    fn test_clear_persists_empty_collection() {
        let (temp_dir, storage) = create_storage();
        storage.replace_all(CollectionName::Subjects, vec![json!({"id": "s1"})]);

        storage.clear(CollectionName::Subjects).unwrap();

        let reopened =
            Storage::open(StudyPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(reopened.count(CollectionName::Subjects).unwrap(), 0);
    }

    fn block_saves(temp_dir: &TempDir, name: CollectionName) {
        // A directory at the temp path makes the atomic write fail
        let temp_path = temp_dir
            .path()
            .join("data")
            .join(format!("{}.json.tmp", name.as_str()));
        std::fs::create_dir_all(temp_path).unwrap();
    }

    #[test]
    fn test_failed_clear_keeps_memory_in_sync_with_disk() {
        let (temp_dir, storage) = create_storage();
        storage.replace_all(
            CollectionName::Subjects,
            vec![json!({"id": "s1"}), json!({"id": "s2"})],
        );
        block_saves(&temp_dir, CollectionName::Subjects);

        let err = storage.clear(CollectionName::Subjects).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ClearError);

        let reopened =
            Storage::open(StudyPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(reopened.count(CollectionName::Subjects).unwrap(), 2);
        assert_eq!(
            compute_stats(&storage).unwrap(),
            compute_stats(&reopened).unwrap()
        );
    }

    #[test]
    fn test_failed_commit_keeps_memory_in_sync_with_disk() {
        let (temp_dir, storage) = create_storage();
        storage.replace_all(CollectionName::Flashcards, vec![json!({"id": "f1"})]);
        storage.clear(CollectionName::Flashcards).unwrap();
        storage
            .insert(
                CollectionName::Flashcards,
                Record::decode(CollectionName::Flashcards, json!({"id": "f2"})).unwrap(),
            )
            .unwrap();
        block_saves(&temp_dir, CollectionName::Flashcards);

        assert!(storage.commit(CollectionName::Flashcards).is_err());

        let reopened =
            Storage::open(StudyPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(reopened.count(CollectionName::Flashcards).unwrap(), 0);
        assert_eq!(storage.count(CollectionName::Flashcards).unwrap(), 0);
        assert_eq!(
            compute_stats(&storage).unwrap(),
            compute_stats(&reopened).unwrap()
        );
    }

    #[test]
    fn test_number_ids_round_trip_through_disk() {
        let (temp_dir, storage) = create_storage();

        let outcome = storage.replace_all(
            CollectionName::AnswerHistory,
            vec![
                json!({"id": 1712345678901.123, "correct": true}),
                json!({"id": 18446744073709551615u64}),
                json!({"id": 7}),
            ],
        );
        assert!(outcome.is_success());

        let reopened =
            Storage::open(StudyPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(reopened.count(CollectionName::AnswerHistory).unwrap(), 3);
        let repo = reopened.repository(CollectionName::AnswerHistory).unwrap();
        assert!(repo.find("1712345678901.123").unwrap().is_some());
        assert!(repo.find("18446744073709551615").unwrap().is_some());
    }
}
