//! Collection codec
//!
//! Converts a [`Collection`] to and from its persisted list-of-pairs form:
//!
//! ```json
//! [["doc-1", {"id": "doc-1", "title": "Checkout"}], ["doc-2", {...}]]
//! ```
//!
//! Both directions are total. [`decode`] turns anything it cannot read into
//! an empty collection and [`encode`] falls back to an empty list, logging a
//! warning in either case. [`try_decode`] and [`try_encode`] are the strict
//! variants for callers that want to report the failure themselves.
//!
//! A record only encodes if its encoded value decodes back into the record.
//! serde_json writes non-finite floats as `null`, which would otherwise make
//! the whole persisted collection unreadable on the next load.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::record::json_type_name;
use super::{Collection, Record};

/// Reasons a persisted value cannot be read back as a collection
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("expected a list of pairs, found {found}")]
    NotAList { found: &'static str },

    #[error("entry {index} is not a [key, value] pair")]
    InvalidPair { index: usize },

    #[error("entry {index} has a non-string key")]
    InvalidKey { index: usize },

    #[error("entry {index} ({key}) has an invalid value: {source}")]
    InvalidRecord {
        index: usize,
        key: String,
        source: serde_json::Error,
    },

    #[error("entry {index} is stored under {key} but the record's key is {record_key}")]
    KeyMismatch {
        index: usize,
        key: String,
        record_key: String,
    },

    #[error("duplicate key {key}")]
    DuplicateKey { key: String },
}

/// Reasons a collection cannot be written in its persisted form
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("record {key} cannot be serialized: {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },

    #[error("record {key} would not read back: {source}")]
    NotReadable {
        key: String,
        source: serde_json::Error,
    },
}

/// Encode a collection as a JSON list of `[key, value]` pairs
///
/// Falls back to an empty list, with a warning, when a record cannot be
/// encoded.
pub fn encode<R: Record>(collection: &Collection<R>) -> Value {
    match try_encode(collection) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Failed to encode collection; using an empty list");
            Value::Array(Vec::new())
        }
    }
}

/// Encode a collection, reporting the first record that cannot be encoded
pub fn try_encode<R: Record>(collection: &Collection<R>) -> Result<Value, EncodeError> {
    let mut pairs = Vec::with_capacity(collection.len());
    for (key, record) in collection {
        let value = serde_json::to_value(record).map_err(|source| EncodeError::Serialize {
            key: key.to_string(),
            source,
        })?;
        R::deserialize(&value).map_err(|source| EncodeError::NotReadable {
            key: key.to_string(),
            source,
        })?;
        pairs.push(Value::Array(vec![Value::String(key.to_string()), value]));
    }
    trace!(entries = pairs.len(), "Encoded collection");
    Ok(Value::Array(pairs))
}

/// Decode a list of pairs, falling back to an empty collection
pub fn decode<R: Record>(raw: &Value) -> Collection<R> {
    if raw.is_null() {
        debug!("No persisted collection; starting empty");
        return Collection::new();
    }

    match try_decode(raw) {
        Ok(collection) => {
            trace!(entries = collection.len(), "Decoded collection");
            collection
        }
        Err(e) => {
            warn!(error = %e, "Discarding malformed persisted collection");
            Collection::new()
        }
    }
}

/// Decode a list of pairs, reporting the first problem found
///
/// `null` decodes to an empty collection.
pub fn try_decode<R: Record>(raw: &Value) -> Result<Collection<R>, DecodeError> {
    let entries = match raw {
        Value::Null => return Ok(Collection::new()),
        Value::Array(entries) => entries,
        other => {
            return Err(DecodeError::NotAList {
                found: json_type_name(other),
            })
        }
    };

    let mut collection = Collection::new();
    for (index, entry) in entries.iter().enumerate() {
        let (key, value) = match entry.as_array().map(Vec::as_slice) {
            Some([key, value]) => (key, value),
            _ => return Err(DecodeError::InvalidPair { index }),
        };
        let key = key.as_str().ok_or(DecodeError::InvalidKey { index })?;
        let record = R::deserialize(value).map_err(|source| DecodeError::InvalidRecord {
            index,
            key: key.to_string(),
            source,
        })?;
        if record.key() != key {
            return Err(DecodeError::KeyMismatch {
                index,
                key: key.to_string(),
                record_key: record.key().to_string(),
            });
        }
        collection
            .insert_new(key.to_string(), record)
            .map_err(|_| DecodeError::DuplicateKey {
                key: key.to_string(),
            })?;
    }
    Ok(collection)
}

/// Serde adapter for collection fields of a store state
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize, Default)]
/// struct ChartState {
///     #[serde(with = "codec::pairs", default)]
///     charts: Collection<Chart>,
/// }
/// ```
///
/// Deserialization never fails: whatever the field holds is buffered and
/// passed through [`decode`]. Serialization fails on an [`EncodeError`], so
/// a store keeps its previous snapshot instead of writing an unreadable one.
pub mod pairs {
    use super::*;
    use serde::ser::Error as _;

    pub fn serialize<R, S>(collection: &Collection<R>, serializer: S) -> Result<S::Ok, S::Error>
    where
        R: Record,
        S: Serializer,
    {
        try_encode(collection)
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, R, D>(deserializer: D) -> Result<Collection<R>, D::Error>
    where
        R: Record,
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(decode(&raw))
    }
}
