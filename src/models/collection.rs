//! Registered collection names
//!
//! The set of collections is fixed at compile time. Declaration order is the
//! order in which snapshots are built, restored and reported.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StudyError;

/// A registered collection in the store
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum CollectionName {
    /// Subjects being studied
    Subjects,
    /// Individual study items scheduled for review
    StudyItems,
    /// Answer history used by the scheduler
    AnswerHistory,
    /// Flashcards
    Flashcards,
    /// Key/value application settings
    Settings,
}

impl CollectionName {
    /// All registered collections, in declaration order
    pub const ALL: [CollectionName; 5] = [
        CollectionName::Subjects,
        CollectionName::StudyItems,
        CollectionName::AnswerHistory,
        CollectionName::Flashcards,
        CollectionName::Settings,
    ];

    /// The collection whose presence marks an input as a snapshot
    pub const SENTINEL: CollectionName = CollectionName::Subjects;

    /// Name as it appears in snapshots and on disk
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Subjects => "subjects",
            CollectionName::StudyItems => "studyItems",
            CollectionName::AnswerHistory => "answerHistory",
            CollectionName::Flashcards => "flashcards",
            CollectionName::Settings => "settings",
        }
    }

    /// Field holding each record's identifier
    pub fn key_path(&self) -> &'static str {
        match self {
            CollectionName::Settings => "key",
            _ => "id",
        }
    }

    /// Look up a registered collection by its snapshot key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|name| name.as_str() == key)
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionName {
    type Err = StudyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s)
            .or_else(|| {
                // Accept snake_case and any casing from the command line
                let folded: String = s.chars().filter(|c| *c != '_' && *c != '-').collect();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|name| name.as_str().eq_ignore_ascii_case(&folded))
            })
            .ok_or_else(|| StudyError::collection_not_found(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order() {
        let mut sorted = CollectionName::ALL;
        sorted.sort();
        assert_eq!(sorted, CollectionName::ALL);
        assert_eq!(CollectionName::ALL[0], CollectionName::SENTINEL);
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for name in CollectionName::ALL {
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "answerHistory".parse::<CollectionName>().unwrap(),
            CollectionName::AnswerHistory
        );
        assert_eq!(
            "answer_history".parse::<CollectionName>().unwrap(),
            CollectionName::AnswerHistory
        );
        assert_eq!(
            "FLASHCARDS".parse::<CollectionName>().unwrap(),
            CollectionName::Flashcards
        );
        assert!("exportDate".parse::<CollectionName>().is_err());
    }

    #[test]
    fn test_key_path() {
        assert_eq!(CollectionName::Settings.key_path(), "key");
        assert_eq!(CollectionName::Subjects.key_path(), "id");
    }
}
