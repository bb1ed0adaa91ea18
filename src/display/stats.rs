//! Collection count and restore report views

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::backup::{CollectionOutcome, CollectionStats, RestoreResult};

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Collection")]
    collection: String,
    #[tabled(rename = "Records")]
    records: usize,
}

/// Format record counts per collection as a table with a total row
pub fn format_stats(stats: &CollectionStats) -> String {
    let mut rows: Vec<CountRow> = stats
        .iter()
        .map(|(name, count)| CountRow {
            collection: name.to_string(),
            records: count,
        })
        .collect();
    rows.push(CountRow {
        collection: "TOTAL".to_string(),
        records: stats.total(),
    });

    Table::new(rows).with(Style::sharp()).to_string()
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Collection")]
    collection: String,
    #[tabled(rename = "Expected")]
    expected: usize,
    #[tabled(rename = "Restored")]
    restored: usize,
    #[tabled(rename = "Failed")]
    failed: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Format a restore result as one row per collection
pub fn format_restore_report(result: &RestoreResult) -> String {
    if result.reports.is_empty() {
        return "No collections were restored.".to_string();
    }

    let rows: Vec<ReportRow> = result
        .reports
        .iter()
        .map(|report| {
            let (restored, failed, status) = match &report.outcome {
                CollectionOutcome::Success { inserted } => {
                    (*inserted, "0".to_string(), "DONE".to_string())
                }
                CollectionOutcome::PartialFailure {
                    inserted,
                    failed_count,
                    ..
                } => (
                    *inserted,
                    failed_count.to_string(),
                    "FAILED (PARTIAL_INSERT_ERROR)".to_string(),
                ),
                CollectionOutcome::HardFailure { kind, cleared, .. } => {
                    let status = if *cleared {
                        format!("FAILED ({}), now empty", kind)
                    } else {
                        format!("FAILED ({})", kind)
                    };
                    (0, "-".to_string(), status)
                }
            };
            ReportRow {
                collection: report.collection.to_string(),
                expected: report.expected,
                restored,
                failed,
                status,
            }
        })
        .collect();

    let mut output = Table::new(rows).with(Style::sharp()).to_string();

    let details: Vec<String> = result
        .reports
        .iter()
        .flat_map(|report| match &report.outcome {
            CollectionOutcome::Success { .. } => Vec::new(),
            CollectionOutcome::PartialFailure { failures, .. } => failures
                .iter()
                .map(|f| {
                    format!(
                        "  {}[{}] {}: {}",
                        report.collection,
                        f.index,
                        f.id.as_deref().unwrap_or("<no id>"),
                        f.reason
                    )
                })
                .collect(),
            CollectionOutcome::HardFailure { reason, .. } => {
                vec![format!("  {}: {}", report.collection, reason)]
            }
        })
        .collect();

    if !details.is_empty() {
        output.push_str("\n\nFailures:\n");
        output.push_str(&details.join("\n"));
    }

    if !result.ignored_keys.is_empty() {
        output.push_str(&format!(
            "\n\nIgnored keys: {}",
            result.ignored_keys.join(", ")
        ));
    }

    output
}
