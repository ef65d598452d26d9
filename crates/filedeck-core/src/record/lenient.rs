//! Lenient deserializers for backend field encodings.
//!
//! The backend encodes "no value" as an empty string for dates and single
//! relations, and a relation may be a single id or a list of ids depending
//! on how the field is configured.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::types::{RecordId, Timestamp};

pub(crate) fn timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => Timestamp::parse(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

pub(crate) fn optional_id<'de, D>(deserializer: D) -> Result<Option<RecordId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => RecordId::new(s).map(Some).map_err(serde::de::Error::custom),
        Value::Array(items) => match items.into_iter().find_map(non_empty_string) {
            Some(s) => RecordId::new(s).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        },
        other => Err(serde::de::Error::custom(format!(
            "expected a record id, found {}",
            other
        ))),
    }
}

pub(crate) fn id_list<'de, D>(deserializer: D) -> Result<Vec<RecordId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<String> = match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s],
        Value::Array(items) => items.into_iter().filter_map(non_empty_string).collect(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected a list of record ids, found {}",
                other
            )));
        }
    };

    raw.into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| RecordId::new(s).map_err(serde::de::Error::custom))
        .collect()
}

fn non_empty_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}
