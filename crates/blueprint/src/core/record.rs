//! Record and patch traits
//!
//! A record is any keyed domain entity a store holds. Patches describe a
//! shallow merge: provided fields overwrite, omitted fields are kept.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::StoreError;

/// Core trait for keyed domain entities
///
/// The key is the record's identity inside its collection and must not
/// change once the record is stored.
pub trait Record: Clone + Serialize + DeserializeOwned {
    /// Unique key of this record within its collection
    fn key(&self) -> &str;
}

/// A partial update for records of type `R`
pub trait Patch<R> {
    /// Merge this patch into `record`
    ///
    /// On error the record is left exactly as it was.
    fn apply(self, record: &mut R) -> Result<(), StoreError>;
}

/// Untyped patch: a JSON object whose top-level fields replace the record's
///
/// Used where the record type is only known at runtime (CLI, WASM). The
/// merged value has to decode back into the record type and keep the same
/// key; otherwise the record is left untouched and `apply` fails with
/// [`StoreError::InvalidPatch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonPatch {
    fields: Map<String, Value>,
}

impl JsonPatch {
    /// Create a patch from a JSON object
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Create a patch from an arbitrary JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(StoreError::invalid_patch(format!(
                "patch must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Parse a patch from JSON text
    pub fn parse(input: &str) -> Result<Self, StoreError> {
        Self::from_value(serde_json::from_str(input)?)
    }

    /// Names of the fields this patch overwrites
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Whether the patch overwrites nothing
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<R: Record> Patch<R> for JsonPatch {
    fn apply(self, record: &mut R) -> Result<(), StoreError> {
        let mut merged = match serde_json::to_value(&*record)? {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::invalid_patch(format!(
                    "record {} serializes to {}, not an object",
                    record.key(),
                    json_type_name(&other)
                )))
            }
        };

        for (field, value) in self.fields {
            merged.insert(field, value);
        }

        let updated = serde_json::from_value::<R>(Value::Object(merged)).map_err(|e| {
            StoreError::invalid_patch(format!("patched record {} is invalid: {}", record.key(), e))
        })?;
        if updated.key() != record.key() {
            return Err(StoreError::invalid_patch(format!(
                "patch would change key {} to {}",
                record.key(),
                updated.key()
            )));
        }
        *record = updated;
        Ok(())
    }
}

/// Short name of a JSON value's type, for diagnostics
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
