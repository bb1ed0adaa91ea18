//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup engine and the store.

pub mod backup;
pub mod record;

pub use backup::{handle_backup_command, BackupCommands};
pub use record::{handle_record_command, RecordCommands};
