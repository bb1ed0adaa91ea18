//! Artifact, activity and record listings

use chrono::Local;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::activity::ActivityEntry;
use crate::backup::ArtifactInfo;
use crate::models::{CollectionName, Record};

use super::format::{format_age, format_size, truncate};

#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "File")]
    filename: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Size")]
    size: String,
}

/// Format export artifacts, newest first
pub fn format_artifact_list(artifacts: &[ArtifactInfo]) -> String {
    if artifacts.is_empty() {
        return "No export artifacts found.".to_string();
    }

    let now = Local::now().naive_local();
    let rows = artifacts.iter().enumerate().map(|(i, artifact)| ArtifactRow {
        index: i + 1,
        filename: artifact.filename.clone(),
        created: artifact.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        age: format_age(now.signed_duration_since(artifact.created_at)),
        size: format_size(artifact.size_bytes),
    });

    format!(
        "{}\nTotal: {} artifact(s)",
        Table::new(rows).with(Style::sharp()),
        artifacts.len()
    )
}

#[derive(Tabled)]
struct ActivityRow {
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Operation")]
    operation: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

/// Format activity entries, newest first
pub fn format_history(entries: &[ActivityEntry]) -> String {
    if entries.is_empty() {
        return "No activity recorded yet.".to_string();
    }

    let rows = entries.iter().rev().map(|entry| ActivityRow {
        when: entry
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        operation: entry.operation.to_string(),
        outcome: match entry.error_kind {
            Some(kind) => format!("{} ({})", entry.outcome, kind),
            None => entry.outcome.to_string(),
        },
        summary: truncate(&entry.summary, 72),
    });

    Table::new(rows).with(Style::sharp()).to_string()
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Fields")]
    fields: String,
}

/// Format the records of one collection
pub fn format_record_list(collection: CollectionName, records: &[Record]) -> String {
    if records.is_empty() {
        return format!("No records in {}.", collection);
    }

    let key = collection.key_path();
    let rows = records.iter().map(|record| {
        let rest: serde_json::Map<String, serde_json::Value> = record
            .fields()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        RecordRow {
            id: record.id().to_string(),
            fields: truncate(&serde_json::Value::Object(rest).to_string(), 60),
        }
    });

    format!(
        "{}\n{} record(s) in {}",
        Table::new(rows).with(Style::sharp()),
        records.len(),
        collection
    )
}
