//! Snapshot writer
//!
//! Serializes snapshots to `<prefix>_<YYYYMMDD>_<HHmmss>.json` artifacts and
//! maintains the export marker. The marker is stamped when a write is
//! triggered, before the artifact is on disk, and is not rolled back if the
//! write then fails. It records an attempt, not a durable backup.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::paths::StudyPaths;
use crate::config::settings::Settings;
use crate::error::{StudyError, StudyResult};
use crate::models::Snapshot;
use crate::storage::{write_bytes_atomic, ExportStateRepository};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A written export artifact
#[derive(Debug, Clone, Serialize)]
pub struct ExportArtifact {
    /// Artifact filename
    pub filename: String,
    /// Full path to the artifact
    pub path: PathBuf,
    /// Size in bytes
    pub size_bytes: u64,
    /// Records contained in the snapshot
    pub records: usize,
    /// Value written to the export marker
    pub marked_at: DateTime<Utc>,
}

/// Metadata about an artifact found in the export directory
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    /// Artifact filename
    pub filename: String,
    /// Full path to the artifact
    pub path: PathBuf,
    /// Local time encoded in the filename
    pub created_at: NaiveDateTime,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Writes snapshots to export artifacts
pub struct SnapshotWriter {
    export_dir: PathBuf,
    prefix: String,
    pretty: bool,
    export_state: ExportStateRepository,
}

impl SnapshotWriter {
    /// Create a writer for `export_dir`
    pub fn new(
        export_dir: PathBuf,
        prefix: impl Into<String>,
        export_state: ExportStateRepository,
    ) -> Self {
        Self {
            export_dir,
            prefix: prefix.into(),
            pretty: true,
            export_state,
        }
    }

    /// Create a writer using the configured prefix and the default export dir
    pub fn from_settings(paths: &StudyPaths, settings: &Settings) -> Self {
        Self::new(
            paths.export_dir(),
            settings.export_prefix.clone(),
            ExportStateRepository::new(paths.export_state_file()),
        )
        .pretty(settings.pretty_export)
    }

    /// Toggle pretty-printed output
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Write artifacts to a different directory
    pub fn with_export_dir(mut self, export_dir: PathBuf) -> Self {
        self.export_dir = export_dir;
        self
    }

    /// Directory artifacts are written to
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Artifact filename for a given local time
    pub fn artifact_name(&self, at: DateTime<Local>) -> String {
        format!("{}_{}.json", self.prefix, at.format(TIMESTAMP_FORMAT))
    }

    /// Serialize `snapshot` into a new artifact in the export directory
    ///
    /// If an artifact with the same name already exists (two exports within
    /// one second) a `_<n>` suffix is appended rather than overwriting it.
    pub fn write(&self, snapshot: &Snapshot) -> StudyResult<ExportArtifact> {
        let bytes = self.serialize(snapshot)?;

        let filename = self.unique_name(snapshot.export_date.with_timezone(&Local));
        let path = self.export_dir.join(&filename);

        let marked_at = self.mark_exported();

        fs::create_dir_all(&self.export_dir).map_err(|e| {
            StudyError::Io(format!("Failed to create export directory: {}", e))
        })?;
        write_bytes_atomic(&path, &bytes)
            .map_err(|e| StudyError::Io(format!("Failed to write export artifact: {}", e)))?;

        info!(path = %path.display(), bytes = bytes.len(), "export artifact written");

        Ok(ExportArtifact {
            filename,
            path,
            size_bytes: bytes.len() as u64,
            records: snapshot.total_records(),
            marked_at,
        })
    }

    /// Serialize `snapshot` onto any writer, returning the bytes written
    pub fn write_to<W: Write>(&self, snapshot: &Snapshot, writer: &mut W) -> StudyResult<usize> {
        let bytes = self.serialize(snapshot)?;
        self.mark_exported();

        writer
            .write_all(&bytes)
            .and_then(|_| writer.flush())
            .map_err(|e| StudyError::Io(format!("Failed to write snapshot: {}", e)))?;

        Ok(bytes.len())
    }

    fn serialize(&self, snapshot: &Snapshot) -> StudyResult<Vec<u8>> {
        let result = if self.pretty {
            serde_json::to_vec_pretty(snapshot)
        } else {
            serde_json::to_vec(snapshot)
        };
        result.map_err(|e| StudyError::Json(format!("Failed to serialize snapshot: {}", e)))
    }

    /// Stamp the export marker; failures are logged and swallowed
    fn mark_exported(&self) -> DateTime<Utc> {
        let now = Utc::now();
        if let Err(e) = self.export_state.record(now) {
            warn!(error = %e, "failed to record last export date");
        }
        now
    }

    fn unique_name(&self, at: DateTime<Local>) -> String {
        let base = self.artifact_name(at);
        if !self.export_dir.join(&base).exists() {
            return base;
        }

        let stem = base.trim_end_matches(".json");
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}.json", stem, n);
            if !self.export_dir.join(&candidate).exists() {
                return candidate;
            }
            n += 1;
        }
    }

    /// List artifacts in the export directory, newest first
    pub fn list_artifacts(&self) -> StudyResult<Vec<ArtifactInfo>> {
        if !self.export_dir.exists() {
            return Ok(Vec::new());
        }

        let mut artifacts = Vec::new();

        for entry in fs::read_dir(&self.export_dir)
            .map_err(|e| StudyError::Io(format!("Failed to read export directory: {}", e)))?
        {
            let entry = entry
                .map_err(|e| StudyError::Io(format!("Failed to read directory entry: {}", e)))?;

            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                if let Some(info) = self.parse_artifact_info(&path) {
                    artifacts.push(info);
                }
            }
        }

        artifacts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });

        Ok(artifacts)
    }

    /// The most recent artifact, if any
    pub fn latest_artifact(&self) -> StudyResult<Option<ArtifactInfo>> {
        Ok(self.list_artifacts()?.into_iter().next())
    }

    fn parse_artifact_info(&self, path: &Path) -> Option<ArtifactInfo> {
        let filename = path.file_name()?.to_string_lossy().to_string();
        let created_at = parse_artifact_timestamp(&self.prefix, &filename)?;
        let size_bytes = fs::metadata(path).ok()?.len();

        Some(ArtifactInfo {
            filename,
            path: path.to_path_buf(),
            created_at,
            size_bytes,
        })
    }
}

/// Parse the local timestamp out of `<prefix>_<YYYYMMDD>_<HHmmss>[_n].json`
fn parse_artifact_timestamp(prefix: &str, filename: &str) -> Option<NaiveDateTime> {
    let rest = filename
        .strip_prefix(prefix)?
        .strip_prefix('_')?
        .strip_suffix(".json")?;

    // YYYYMMDD_HHmmss is 15 characters; anything after must be a `_n` suffix
    let stamp = rest.get(..15)?;
    let suffix = &rest[15..];
    if !suffix.is_empty() {
        let n = suffix.strip_prefix('_')?;
        if n.is_empty() || !n.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::builder::build_full_snapshot;
    use crate::models::CollectionName;
    use crate::storage::accessor::test_support::MemoryStore;
    use crate::storage::CollectionStore;
    use chrono::{Datelike, TimeZone, Timelike};
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_writer() -> (SnapshotWriter, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(
            temp_dir.path().join("exports"),
            "study_scheduler_backup",
            ExportStateRepository::new(temp_dir.path().join("export_state.json")),
        );
        (writer, temp_dir)
    }

    #[test]
    fn test_artifact_name() {
        let (writer, _temp) = create_test_writer();
        let at = Local.with_ymd_and_hms(2026, 1, 5, 7, 8, 9).unwrap();
        assert_eq!(
            writer.artifact_name(at),
            "study_scheduler_backup_20260105_070809.json"
        );
    }

    #[test]
    fn test_write_creates_artifact_and_marker() {
        let (writer, temp) = create_test_writer();
        let store = MemoryStore::default();
        store.replace_all(CollectionName::Subjects, vec![json!({"id": "s1"})]);
        let snapshot = build_full_snapshot(&store).unwrap();

        let artifact = writer.write(&snapshot).unwrap();

        assert!(artifact.path.exists());
        assert!(artifact.filename.starts_with("study_scheduler_backup_"));
        assert_eq!(artifact.records, 1);

        let contents: serde_json::Value =
            serde_json::from_slice(&fs::read(&artifact.path).unwrap()).unwrap();
        assert_eq!(contents["subjects"], json!([{"id": "s1"}]));
        assert_eq!(contents["answerHistory"], json!([]));
        assert!(contents["exportDate"].is_string());

        let marker = ExportStateRepository::new(temp.path().join("export_state.json"));
        assert_eq!(
            marker.get_last_export_date().unwrap(),
            Some(artifact.marked_at)
        );
    }

    #[test]
    fn test_marker_stamped_even_when_write_fails() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the export directory should be
        let blocked = temp_dir.path().join("exports");
        fs::write(&blocked, "not a directory").unwrap();

        let marker = ExportStateRepository::new(temp_dir.path().join("export_state.json"));
        let writer = SnapshotWriter::new(blocked, "backup", marker.clone());
        let snapshot = build_full_snapshot(&MemoryStore::default()).unwrap();

        let err = writer.write(&snapshot).unwrap_err();
        assert_eq!(err.kind().code(), "IO_ERROR");
        assert!(marker.get_last_export_date().unwrap().is_some());
    }

    #[test]
    fn test_same_second_exports_do_not_overwrite() {
        let (writer, _temp) = create_test_writer();
        let snapshot = build_full_snapshot(&MemoryStore::default()).unwrap();

        let first = writer.write(&snapshot).unwrap();
        let second = writer.write(&snapshot).unwrap();

        assert_ne!(first.path, second.path);
        assert_eq!(writer.list_artifacts().unwrap().len(), 2);
    }

    #[test]
    fn test_write_to_stream() {
        let (writer, _temp) = create_test_writer();
        let snapshot = build_full_snapshot(&MemoryStore::default()).unwrap();

        let mut buffer = Vec::new();
        let written = writer.pretty(false).write_to(&snapshot, &mut buffer).unwrap();

        assert_eq!(written, buffer.len());
        assert!(!buffer.contains(&b'\n'));
    }

    #[test]
    fn test_list_artifacts_newest_first() {
        let (writer, _temp) = create_test_writer();
        fs::create_dir_all(writer.export_dir()).unwrap();
        for name in [
            "study_scheduler_backup_20250101_120000.json",
            "study_scheduler_backup_20250301_080000.json",
            "study_scheduler_backup_20250201_235959.json",
            "unrelated.json",
            "study_scheduler_backup_garbage.json",
        ] {
            fs::write(writer.export_dir().join(name), "{}").unwrap();
        }

        let artifacts = writer.list_artifacts().unwrap();
        assert_eq!(artifacts.len(), 3);
        assert_eq!(
            artifacts[0].filename,
            "study_scheduler_backup_20250301_080000.json"
        );
        assert_eq!(
            writer.latest_artifact().unwrap().unwrap().filename,
            artifacts[0].filename
        );
    }

    #[test]
    fn test_parse_artifact_timestamp() {
        let ts = parse_artifact_timestamp("backup", "backup_20251127_143022.json").unwrap();
        assert_eq!(ts.year(), 2025);
        assert_eq!(ts.month(), 11);
        assert_eq!(ts.hour(), 14);

        assert!(parse_artifact_timestamp("backup", "backup_20251127_143022_2.json").is_some());
        assert!(parse_artifact_timestamp("backup", "backup_20251127_143022x.json").is_none());
        assert!(parse_artifact_timestamp("backup", "other_20251127_143022.json").is_none());
        assert!(parse_artifact_timestamp("backup", "backup_2025.json").is_none());
    }
}
