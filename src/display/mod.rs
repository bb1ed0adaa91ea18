//! Display formatting for terminal output
//!
//! Renders counts, restore reports and listings as tables.

pub mod format;
pub mod listing;
pub mod stats;

pub use format::{format_age, format_size, truncate};
pub use listing::{format_artifact_list, format_history, format_record_list};
pub use stats::{format_restore_report, format_stats};
