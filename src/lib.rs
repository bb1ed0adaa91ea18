//! Study Scheduler Store - backup, export and restore engine
//!
//! This library snapshots the study scheduler's local collection store to a
//! versioned JSON document and restores such snapshots collection by
//! collection, reporting exactly which collections succeeded.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types and the reporting taxonomy
//! - `models`: Collections, records, snapshots and the export marker
//! - `storage`: JSON file storage and the collection store accessor
//! - `backup`: Snapshot builder, writer, validator, restore executor and stats
//! - `events`: Channel-based event bus for progress notifications
//! - `activity`: Append-only log of exports and restores
//! - `display`: Terminal tables
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use study_scheduler::config::{paths::StudyPaths, settings::Settings};
//! use study_scheduler::storage::Storage;
//!
//! let paths = StudyPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let storage = Storage::open(paths)?;
//! ```

pub mod activity;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod models;
pub mod storage;

pub use error::StudyError;
