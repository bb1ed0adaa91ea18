//! Per-collection record counts
//!
//! Always derived from the store at the moment of the call. Nothing here is
//! cached, so counts stay correct after mutations made elsewhere.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::StudyResult;
use crate::models::{CollectionName, ImportedSnapshot};
use crate::storage::CollectionStore;

/// Record count per registered collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CollectionStats {
    counts: BTreeMap<CollectionName, usize>,
}

impl CollectionStats {
    /// Count for one collection (zero if absent)
    pub fn get(&self, name: CollectionName) -> usize {
        self.counts.get(&name).copied().unwrap_or(0)
    }

    /// Total records across all collections
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Iterate counts in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (CollectionName, usize)> + '_ {
        self.counts.iter().map(|(name, count)| (*name, *count))
    }

    /// Collections whose count differs from what the snapshot carried
    ///
    /// Only collections present in the snapshot are compared. Each mismatch
    /// is `(name, expected, actual)`.
    pub fn mismatches(&self, snapshot: &ImportedSnapshot) -> Vec<(CollectionName, usize, usize)> {
        snapshot
            .expected_counts()
            .into_iter()
            .filter_map(|(name, expected)| {
                let actual = self.get(name);
                (actual != expected).then_some((name, expected, actual))
            })
            .collect()
    }
}

impl FromIterator<(CollectionName, usize)> for CollectionStats {
    fn from_iter<I: IntoIterator<Item = (CollectionName, usize)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

/// Count the records of every registered collection
pub fn compute_stats<S: CollectionStore + ?Sized>(store: &S) -> StudyResult<CollectionStats> {
    CollectionName::ALL
        .iter()
        .map(|name| Ok((*name, store.count(*name)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InboundCollection;
    use crate::storage::accessor::test_support::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_empty_store() {
        let store = MemoryStore::default();
        let stats = compute_stats(&store).unwrap();

        assert_eq!(stats.iter().count(), CollectionName::ALL.len());
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_counts_follow_store() {
        let store = MemoryStore::default();
        store.replace_all(
            CollectionName::Subjects,
            vec![json!({"id": "s1"}), json!({"id": "s2"})],
        );

        let before = compute_stats(&store).unwrap();
        assert_eq!(before.get(CollectionName::Subjects), 2);

        store.replace_all(CollectionName::Subjects, vec![]);
        let after = compute_stats(&store).unwrap();
        assert_eq!(after.get(CollectionName::Subjects), 0);
    }

    #[test]
    fn test_serializes_as_map() {
        let stats: CollectionStats = [(CollectionName::Subjects, 1), (CollectionName::AnswerHistory, 0)]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            json!({"subjects": 1, "answerHistory": 0})
        );
    }

    #[test]
    fn test_mismatches() {
        let stats: CollectionStats = [(CollectionName::Subjects, 1), (CollectionName::Flashcards, 3)]
            .into_iter()
            .collect();
        let snapshot = ImportedSnapshot {
            export_date: None,
            schema_version: None,
            collections: vec![
                (CollectionName::Subjects, InboundCollection::Records(vec![json!({"id": 1})])),
                (CollectionName::Flashcards, InboundCollection::Records(vec![])),
            ],
            ignored_keys: vec![],
        };

        assert_eq!(
            stats.mismatches(&snapshot),
            vec![(CollectionName::Flashcards, 0, 3)]
        );
    }
}
