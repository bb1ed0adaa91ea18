//! Configuration module for the study scheduler store
//!
//! This module provides configuration management including:
//! - Platform-aware path resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::StudyPaths;
pub use settings::Settings;
