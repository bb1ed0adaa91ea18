//! Activity log
//!
//! Every export, validation, restore and manual record change is appended to
//! a line-delimited JSON log (`activity.log`) so the operator can review what
//! happened to the store, including partial restores.

pub mod entry;
pub mod logger;

pub use entry::{ActivityEntry, Operation, Outcome};
pub use logger::ActivityLogger;
