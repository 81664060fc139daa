// * Record model
// * Every gatherer emits `Record`s: an archive path plus either a JSON value
// * or raw bytes. The packager picks the file extension from the item kind.

pub mod anonymize;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::cluster::errors::GatherError;

pub use anonymize::{anonymize_pod, obfuscate, sensitive_env_vars};

/// Payload of a record
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Emitted as canonical JSON
    Structured(Value),
    /// Emitted verbatim
    Raw(Vec<u8>),
}

impl Item {
    pub fn marshal(&self) -> Result<Vec<u8>, GatherError> {
        match self {
            Item::Structured(value) => Ok(serde_json::to_vec(value)?),
            Item::Raw(bytes) => Ok(bytes.clone()),
        }
    }

    /// File extension the packager should append, if any
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Item::Structured(_) => Some("json"),
            Item::Raw(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Item::Structured(value) => Some(value),
            Item::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            Item::Structured(_) => None,
            Item::Raw(bytes) => Some(bytes),
        }
    }
}

/// One archive entry
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Forward-slash path, without extension
    pub name: String,
    pub item: Item,
}

impl Record {
    /// Builds a structured record from any serializable value
    pub fn json<T>(name: impl Into<String>, value: &T) -> Result<Self, GatherError>
    where
        T: Serialize + ?Sized,
    {
        Ok(Self {
            name: name.into(),
            item: Item::Structured(serde_json::to_value(value)?),
        })
    }

    pub fn raw(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            item: Item::Raw(bytes.into()),
        }
    }

    pub fn marshal(&self) -> Result<Vec<u8>, GatherError> {
        self.item.marshal()
    }

    /// Archive file name: the record name plus the item's extension
    pub fn file_name(&self) -> String {
        match self.item.extension() {
            Some(extension) => format!("{}.{}", self.name, extension),
            None => self.name.clone(),
        }
    }

    /// Reads a structured record back as a typed value
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        self.item
            .as_json()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

/// Records and errors returned by one gather task.
///
/// Partial success is normal: neither field implies anything about the other.
#[derive(Debug, Default)]
pub struct GatherOutcome {
    pub records: Vec<Record>,
    pub errors: Vec<GatherError>,
}

impl GatherOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            records,
            errors: Vec::new(),
        }
    }

    pub fn with_error(records: Vec<Record>, error: GatherError) -> Self {
        Self {
            records,
            errors: vec![error],
        }
    }

    pub fn push_record(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn push_error(&mut self, error: GatherError) {
        self.errors.push(error);
    }

    pub fn merge(&mut self, other: GatherOutcome) {
        self.records.extend(other.records);
        self.errors.extend(other.errors);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn was_cancelled(&self) -> bool {
        self.errors.iter().any(GatherError::is_cancelled)
    }

    /// Error messages, sorted and de-duplicated
    pub fn error_messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        messages.sort();
        messages.dedup();
        messages
    }

    pub fn record_names(&self) -> Vec<&str> {
        self.records.iter().map(|record| record.name.as_str()).collect()
    }

    pub fn find(&self, name: &str) -> Option<&Record> {
        self.records.iter().find(|record| record.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_structured_round_trip() {
        let mut value = BTreeMap::new();
        value.insert("key".to_string(), "value".to_string());
        let record = Record::json("config/test", &value).unwrap();

        let bytes = record.marshal().unwrap();
        let decoded: BTreeMap<String, String> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(record.file_name(), "config/test.json");
    }

    #[test]
    fn test_raw_is_written_verbatim() {
        let record = Record::raw("config/pod/ns/p/logs/p/c_current.log", "line 1\nline 2");
        assert_eq!(record.marshal().unwrap(), b"line 1\nline 2".to_vec());
        assert_eq!(record.file_name(), "config/pod/ns/p/logs/p/c_current.log");
        assert!(record.item.as_json().is_none());
    }

    #[test]
    fn test_decode() {
        let record = Record::json("x", &json!({"a": 1})).unwrap();
        let value: Value = record.decode().unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_error_messages_sorted_unique() {
        let mut outcome = GatherOutcome::new();
        outcome.push_error(GatherError::Upstream("b".into()));
        outcome.push_error(GatherError::Upstream("a".into()));
        outcome.push_error(GatherError::Upstream("b".into()));
        assert_eq!(
            outcome.error_messages(),
            vec!["Upstream failure: a", "Upstream failure: b"]
        );
    }

    #[test]
    fn test_merge() {
        let mut left = GatherOutcome::from_records(vec![Record::raw("a", "1")]);
        let right = GatherOutcome::with_error(vec![Record::raw("b", "2")], GatherError::Cancelled);
        left.merge(right);
        assert_eq!(left.record_names(), vec!["a", "b"]);
        assert!(left.was_cancelled());
    }
}
