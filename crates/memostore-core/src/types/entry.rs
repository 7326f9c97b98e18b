//! The persisted record for one key and the context handed to generators.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Extra field under which the file backend reports the base path (without
/// extension) reserved for an identity.
pub const STORAGE_PATH: &str = "storagePath";

/// Durable record for one key.
///
/// Timestamps are stored as milliseconds since the Unix epoch. Any
/// backend-supplied extra metadata is flattened into the top level of the
/// serialized object. `was_cached` is computed per read and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// The original key, kept so enumeration can recover it.
    #[serde(default)]
    pub key: Value,
    /// The generated value.
    #[serde(default)]
    pub value: Arc<Value>,
    /// When the generating task started.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub create_started: DateTime<Utc>,
    /// When the generator finished.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub create_ended: DateTime<Utc>,
    /// Last successful read.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_retrieved: DateTime<Utc>,
    /// Whether this read was served from an entry the backend already held.
    #[serde(skip)]
    pub was_cached: bool,
    /// Backend-chosen metadata attached on the miss that created the entry.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entry {
    /// Base storage path reserved by the backend, if it supplied one.
    pub fn storage_path(&self) -> Option<&str> {
        self.extra.get(STORAGE_PATH).and_then(Value::as_str)
    }
}

/// Information passed to a generator on a miss.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationContext {
    /// The original key.
    pub key: Value,
    /// Start time of the task that turned into this generation.
    pub create_started: DateTime<Utc>,
    /// Whatever the backend attached to the miss.
    pub extra: Map<String, Value>,
}

impl GenerationContext {
    /// Base storage path reserved by the backend, if any. Generators may
    /// write sibling artifacts next to it.
    pub fn storage_path(&self) -> Option<&str> {
        self.extra.get(STORAGE_PATH).and_then(Value::as_str)
    }

    /// Complete the context into an entry once the generator has produced
    /// `value` at `create_ended`.
    pub fn into_entry(self, value: Value, create_ended: DateTime<Utc>) -> Entry {
        Entry {
            key: self.key,
            value: Arc::new(value),
            create_started: self.create_started,
            create_ended,
            last_retrieved: create_ended,
            was_cached: false,
            extra: self.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn context() -> GenerationContext {
        let mut extra = Map::new();
        extra.insert(STORAGE_PATH.into(), json!("/tmp/store/89/a5/89a5"));
        GenerationContext {
            key: json!({"prop1": "value1"}),
            create_started: Utc.timestamp_millis_opt(1_000).unwrap(),
            extra,
        }
    }

    #[test]
    fn test_into_entry_stamps_times() {
        let ended = Utc.timestamp_millis_opt(1_300).unwrap();
        let entry = context().into_entry(json!("v"), ended);
        assert_eq!(entry.create_ended, ended);
        assert_eq!(entry.last_retrieved, ended);
        assert_eq!(*entry.value, json!("v"));
        assert!(!entry.was_cached);
        assert_eq!(entry.storage_path(), Some("/tmp/store/89/a5/89a5"));
    }

    #[test]
    fn test_serialized_layout() {
        let ended = Utc.timestamp_millis_opt(1_300).unwrap();
        let mut entry = context().into_entry(json!({"a": 1}), ended);
        entry.was_cached = true;

        let encoded = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            encoded,
            json!({
                "key": {"prop1": "value1"},
                "value": {"a": 1},
                "createStarted": 1000,
                "createEnded": 1300,
                "lastRetrieved": 1300,
                "storagePath": "/tmp/store/89/a5/89a5"
            })
        );

        let decoded: Entry = serde_json::from_value(encoded).unwrap();
        assert!(!decoded.was_cached);
        assert_eq!(decoded.storage_path(), entry.storage_path());
    }

    #[test]
    fn test_null_value_survives() {
        let raw = json!({
            "key": null,
            "value": null,
            "createStarted": 1,
            "createEnded": 2,
            "lastRetrieved": 2
        });
        let decoded: Entry = serde_json::from_value(raw).unwrap();
        assert_eq!(decoded.key, Value::Null);
        assert_eq!(*decoded.value, Value::Null);
        assert!(decoded.extra.is_empty());
    }
}
