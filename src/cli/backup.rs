//! Export, import and inspection commands

use std::io::Write;
use std::path::PathBuf;

use clap::Subcommand;
use tracing::debug;

use crate::activity::ActivityLogger;
use crate::backup::{BackupEngine, SnapshotWriter};
use crate::config::settings::Settings;
use crate::display::{
    format_artifact_list, format_history, format_restore_report, format_size, format_stats,
};
use crate::error::{StudyError, StudyResult};
use crate::events::EventBus;
use crate::storage::Storage;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Export every collection to a new snapshot artifact
    Export {
        /// Write the snapshot to stdout instead of a file
        #[arg(long, conflicts_with = "out_dir")]
        stdout: bool,

        /// Directory to write the artifact to
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Replace collections with the contents of a snapshot
    Import {
        /// Snapshot path, artifact filename, or 'latest'
        file: String,

        /// Confirm overwriting the current data
        #[arg(short, long)]
        force: bool,
    },

    /// Check a snapshot without importing it
    Validate {
        /// Snapshot path, artifact filename, or 'latest'
        file: String,
    },

    /// Show record counts per collection
    Stats,

    /// Show store location and last export
    Status,

    /// List export artifacts
    Exports,

    /// Show recent exports, validations and restores
    History {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

/// Handle a backup command
pub fn handle_backup_command(
    storage: &Storage,
    settings: &Settings,
    cmd: BackupCommands,
) -> StudyResult<()> {
    let paths = storage.paths();
    let events = EventBus::new();
    let subscriber = events.subscribe();
    let activity = ActivityLogger::new(paths.activity_log());
    let engine =
        BackupEngine::from_settings(storage, paths, settings, &events).with_activity(&activity);

    match cmd {
        BackupCommands::Export { stdout: true, .. } => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            engine.on_backup_to(&mut handle)?;
            writeln!(handle)?;
        }

        BackupCommands::Export { out_dir, .. } => {
            let engine = match out_dir {
                Some(dir) => engine.with_export_dir(dir),
                None => engine,
            };
            let report = engine.on_backup()?;

            println!("Export created: {}", report.artifact.filename);
            println!("Location: {}", report.artifact.path.display());
            println!(
                "Size: {} ({} records)",
                format_size(report.artifact.size_bytes),
                report.artifact.records
            );
            println!();
            println!("{}", format_stats(&report.stats));
        }

        BackupCommands::Import { file, force } => {
            let path = resolve_snapshot_path(engine.writer(), &file)?;
            let snapshot = engine.validate_file(&path)?;

            println!("Snapshot Information");
            println!("====================");
            println!("File: {}", path.display());
            println!(
                "Exported: {}",
                snapshot.export_date.as_deref().unwrap_or("unknown")
            );
            println!("Contents: {}", snapshot.summary());
            if !snapshot.ignored_keys.is_empty() {
                println!("Ignored keys: {}", snapshot.ignored_keys.join(", "));
            }
            println!();

            if !force {
                println!("WARNING: This will overwrite every collection in the snapshot!");
                println!("To proceed, run again with --force flag:");
                println!("  study-scheduler import {} --force", file);
                return Ok(());
            }

            let report = engine.restore(snapshot)?;

            if let Some(artifact) = &report.safety_artifact {
                println!("Pre-import export saved: {}", artifact.filename);
                println!();
            }

            println!("{}", format_restore_report(&report.result));
            println!();
            println!("{}", report.result.summary());
            println!();
            println!("{}", format_stats(&report.stats));

            for event in subscriber.drain() {
                debug!(event = event.label(), "engine event");
            }

            let emptied = report.result.emptied_collections();
            if !emptied.is_empty() {
                let names: Vec<&str> = emptied.iter().map(|n| n.as_str()).collect();
                println!();
                println!(
                    "WARNING: {} failed after being cleared and are now empty.",
                    names.join(", ")
                );
                if let Some(artifact) = &report.safety_artifact {
                    println!("Their previous contents are in {}", artifact.path.display());
                }
            }

            if let Some(err) = report.result.errors().into_iter().next() {
                return Err(err);
            }
        }

        BackupCommands::Validate { file } => {
            let path = resolve_snapshot_path(engine.writer(), &file)?;
            let snapshot = engine.validate_file(&path)?;

            println!("Snapshot is valid: {}", path.display());
            println!("{}", snapshot.summary());
            if let Some(date) = &snapshot.export_date {
                println!("Exported: {}", date);
            }
            if !snapshot.ignored_keys.is_empty() {
                println!("Ignored keys: {}", snapshot.ignored_keys.join(", "));
            }
        }

        BackupCommands::Stats => {
            let stats = engine.refresh_stats()?;
            println!("{}", format_stats(&stats));
        }

        BackupCommands::Status => {
            let export_state = storage.export_state().load()?;
            let stats = engine.refresh_stats()?;

            println!("Study Scheduler Store");
            println!("=====================");
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Export directory: {}", engine.writer().export_dir().display());
            println!("Records:          {}", stats.total());
            println!("Last export:      {}", export_state.describe());
            if let Some(latest) = engine.writer().latest_artifact()? {
                println!("Latest artifact:  {}", latest.filename);
            }
        }

        BackupCommands::Exports => {
            let artifacts = engine.writer().list_artifacts()?;
            println!("{}", format_artifact_list(&artifacts));
            if artifacts.is_empty() {
                println!("Create one with: study-scheduler export");
            }
        }

        BackupCommands::History { limit } => {
            let entries = activity.read_recent(limit)?;
            println!("{}", format_history(&entries));
        }
    }

    Ok(())
}

/// Resolve a snapshot identifier to a path
fn resolve_snapshot_path(writer: &SnapshotWriter, file: &str) -> StudyResult<PathBuf> {
    if file.eq_ignore_ascii_case("latest") {
        return writer
            .latest_artifact()?
            .map(|a| a.path)
            .ok_or_else(|| StudyError::NotFound {
                entity_type: "Export artifact",
                identifier: "latest".to_string(),
            });
    }

    let path = PathBuf::from(file);
    if path.exists() {
        return Ok(path);
    }

    let in_export_dir = writer.export_dir().join(file);
    if in_export_dir.exists() {
        return Ok(in_export_dir);
    }

    let with_ext = writer.export_dir().join(format!("{}.json", file));
    if with_ext.exists() {
        return Ok(with_ext);
    }

    Err(StudyError::NotFound {
        entity_type: "Export artifact",
        identifier: file.to_string(),
    })
}
