//! Schema-agnostic record type.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;
use crate::Result;
use crate::error::InvalidInputError;
use crate::types::{RecordId, Timestamp};

/// A record as returned by the backend.
///
/// The system fields are typed; everything else is kept verbatim in
/// `fields`, so a record survives a round trip through this type unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique id within the collection.
    pub id: RecordId,

    /// Id of the owning collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,

    /// Name of the owning collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,

    /// Creation time.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::timestamp"
    )]
    pub created: Option<Timestamp>,

    /// Last update time.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::timestamp"
    )]
    pub updated: Option<Timestamp>,

    /// Collection-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// A record with only an id, for building fixtures and tombstones.
    pub fn with_id(id: RecordId) -> Self {
        Self {
            id,
            collection_id: None,
            collection_name: None,
            created: None,
            updated: None,
            fields: Map::new(),
        }
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns a string field, if present and a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Returns the `name` field.
    pub fn name(&self) -> Option<&str> {
        self.get_str("name").filter(|s| !s.is_empty())
    }

    /// A human readable label: `name`, then `username`, then `email`, then the id.
    pub fn label(&self) -> &str {
        self.name()
            .or_else(|| self.get_str("username").filter(|s| !s.is_empty()))
            .or_else(|| self.get_str("email").filter(|s| !s.is_empty()))
            .unwrap_or(self.id.as_str())
    }

    /// Returns a relation field as a list of ids.
    ///
    /// Accepts both a single id string and an array of ids; empty strings
    /// and invalid ids are skipped.
    pub fn get_ids(&self, field: &str) -> Vec<RecordId> {
        match self.fields.get(field) {
            Some(Value::String(s)) => RecordId::new(s.as_str()).into_iter().collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|s| RecordId::new(s).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Converts this record into a typed record.
    pub fn into_typed<T: FromRecord>(self) -> Result<T> {
        T::from_record(self)
    }
}

/// Conversion from a generic [`Record`] into a typed record.
pub trait FromRecord: Sized {
    /// Conversion from the generic record.
    fn from_record(record: Record) -> Result<Self>;
}

impl FromRecord for Record {
    fn from_record(record: Record) -> Result<Self> {
        Ok(record)
    }
}

/// Decode a record into any deserializable shape, naming `kind` in errors.
pub(crate) fn decode<T: DeserializeOwned>(kind: &'static str, record: Record) -> Result<T> {
    let value = serde_json::to_value(record)?;
    serde_json::from_value(value).map_err(|e| {
        InvalidInputError::Record {
            kind,
            reason: e.to_string(),
        }
        .into()
    })
}
