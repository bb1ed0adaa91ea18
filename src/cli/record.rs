//! Record maintenance commands
//!
//! Direct edits to one collection, outside of any restore.

use clap::Subcommand;
use serde_json::Value;

use crate::activity::{ActivityEntry, ActivityLogger, Operation, Outcome};
use crate::display::{format_record_list, format_stats};
use crate::error::{StudyError, StudyResult};
use crate::models::{CollectionName, Record};
use crate::storage::{CollectionStore, Storage};

/// Record subcommands
#[derive(Subcommand)]
pub enum RecordCommands {
    /// List the records of a collection
    #[command(alias = "ls")]
    List {
        /// Collection name (subjects, studyItems, answerHistory, flashcards, settings)
        collection: CollectionName,
    },

    /// Add a record given as a JSON object
    Add {
        collection: CollectionName,

        /// Record JSON, e.g. '{"id": "s1", "name": "Kanji"}'
        json: String,
    },

    /// Remove a record by id
    #[command(alias = "rm")]
    Remove { collection: CollectionName, id: String },

    /// Count records in one collection, or all of them
    Count { collection: Option<CollectionName> },
}

/// Handle a record command
pub fn handle_record_command(storage: &Storage, cmd: RecordCommands) -> StudyResult<()> {
    let activity = ActivityLogger::new(storage.paths().activity_log());

    match cmd {
        RecordCommands::List { collection } => {
            let records = storage.list_all(collection)?;
            println!("{}", format_record_list(collection, &records));
        }

        RecordCommands::Add { collection, json } => {
            let value: Value = serde_json::from_str(&json)
                .map_err(|e| StudyError::InvalidRecord(format!("not valid JSON: {}", e)))?;
            let record = Record::decode(collection, value)?;
            let id = record.id().to_string();

            storage.insert(collection, record)?;
            storage.commit(collection)?;

            activity.record(&ActivityEntry::new(
                Operation::RecordAdd,
                Outcome::Success,
                format!("Added {} to {}", id, collection),
            ));
            println!("Added record {} to {}", id, collection);
        }

        RecordCommands::Remove { collection, id } => {
            let repo = storage.repository(collection)?;
            let record = repo
                .find(&id)?
                .ok_or_else(|| StudyError::record_not_found(&id))?;

            repo.delete(record.id())?;
            storage.commit(collection)?;

            activity.record(&ActivityEntry::new(
                Operation::RecordRemove,
                Outcome::Success,
                format!("Removed {} from {}", id, collection),
            ));
            println!("Removed record {} from {}", id, collection);
        }

        RecordCommands::Count {
            collection: Some(collection),
        } => {
            println!("{}", storage.count(collection)?);
        }

        RecordCommands::Count { collection: None } => {
            let stats = crate::backup::compute_stats(storage)?;
            println!("{}", format_stats(&stats));
        }
    }

    Ok(())
}
