//! Opaque collection records
//!
//! A record is any JSON object carrying an identifier at its collection's key
//! path. Everything else about its shape belongs to the application.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{StudyError, StudyResult};

use super::collection::CollectionName;

/// Identifier of a record, unique within its collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordId {
    Integer(i64),
    /// Any other JSON number, keyed by its canonical text
    Number(String),
    Text(String),
}

impl RecordId {
    /// Extract an identifier from a JSON value (non-empty strings and numbers)
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(RecordId::Text(s.clone())),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => RecordId::Integer(i),
                None => RecordId::Number(n.to_string()),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Integer(n) => write!(f, "{}", n),
            RecordId::Number(s) | RecordId::Text(s) => f.write_str(s),
        }
    }
}

/// A decoded record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    fields: Map<String, Value>,
}

impl Record {
    /// Decode an inbound JSON value into a record of the given collection
    pub fn decode(collection: CollectionName, value: Value) -> StudyResult<Self> {
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(StudyError::InvalidRecord(format!(
                    "expected an object in '{}', found {}",
                    collection,
                    json_type_name(&other)
                )))
            }
        };

        let key_path = collection.key_path();
        let id = fields
            .get(key_path)
            .and_then(RecordId::from_value)
            .ok_or_else(|| {
                StudyError::InvalidRecord(format!(
                    "record in '{}' has no string or number '{}'",
                    collection, key_path
                ))
            })?;

        Ok(Self { id, fields })
    }

    /// The record's identifier
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// The record's fields, identifier included
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Convert back into a plain JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Short human name for a JSON value's type
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_text_id() {
        let record =
            Record::decode(CollectionName::Subjects, json!({"id": "s1", "name": "Kanji"})).unwrap();
        assert_eq!(record.id(), &RecordId::Text("s1".into()));
        assert_eq!(record.fields()["name"], "Kanji");
    }

    #[test]
    fn test_decode_integer_id() {
        let record = Record::decode(CollectionName::AnswerHistory, json!({"id": 42})).unwrap();
        assert_eq!(record.id(), &RecordId::Integer(42));
        assert_eq!(record.id().to_string(), "42");
    }

    #[test]
    fn test_decode_non_integer_number_ids() {
        let fractional =
            Record::decode(CollectionName::AnswerHistory, json!({"id": 1712345678901.123})).unwrap();
        assert_eq!(
            fractional.id(),
            &RecordId::Number("1712345678901.123".into())
        );

        let big = Record::decode(
            CollectionName::AnswerHistory,
            json!({"id": 18446744073709551615u64}),
        )
        .unwrap();
        assert_eq!(big.id().to_string(), "18446744073709551615");
    }

    #[test]
    fn test_settings_use_key() {
        let record =
            Record::decode(CollectionName::Settings, json!({"key": "theme", "value": "dark"}))
                .unwrap();
        assert_eq!(record.id().to_string(), "theme");

        assert!(Record::decode(CollectionName::Settings, json!({"id": "theme"})).is_err());
    }

    #[test]
    fn test_rejects_non_objects_and_missing_ids() {
        assert!(Record::decode(CollectionName::Subjects, json!("s1")).is_err());
        assert!(Record::decode(CollectionName::Subjects, json!({"name": "x"})).is_err());
        assert!(Record::decode(CollectionName::Subjects, json!({"id": ""})).is_err());
        assert!(Record::decode(CollectionName::Subjects, json!({"id": true})).is_err());
        assert!(Record::decode(CollectionName::Subjects, json!({"id": null})).is_err());
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let record = Record::decode(CollectionName::Flashcards, json!({"id": "f1", "front": "a"}))
            .unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"id": "f1", "front": "a"}));
    }
}
