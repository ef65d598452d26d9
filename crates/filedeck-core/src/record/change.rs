//! Realtime change events.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::generic::{FromRecord, Record};
use crate::Result;
use crate::types::RecordId;

/// The kind of change carried by a realtime message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A change as delivered by a backend, before typing.
///
/// The wire shape is `{"action": "create", "record": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChange {
    pub action: ChangeAction,
    pub record: Record,
}

impl RawChange {
    pub fn new(action: ChangeAction, record: Record) -> Self {
        Self { action, record }
    }

    /// Returns the changed record's id.
    pub fn id(&self) -> &RecordId {
        &self.record.id
    }

    /// Name of the collection the record belongs to, if the backend sent it.
    pub fn collection(&self) -> Option<&str> {
        self.record
            .collection_name
            .as_deref()
            .or(self.record.collection_id.as_deref())
    }

    /// Types the change.
    ///
    /// A delete only needs the id, so its payload is never decoded and a
    /// partial tombstone record is accepted.
    pub fn into_event<T: FromRecord>(self) -> Result<ChangeEvent<T>> {
        Ok(match self.action {
            ChangeAction::Create => ChangeEvent::Created(T::from_record(self.record)?),
            ChangeAction::Update => ChangeEvent::Updated(T::from_record(self.record)?),
            ChangeAction::Delete => ChangeEvent::Deleted(self.record.id),
        })
    }
}

/// A typed change to one record of a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T> {
    /// A record was created.
    Created(T),
    /// A record was updated; carries the full new value.
    Updated(T),
    /// A record was deleted.
    Deleted(RecordId),
}

impl<T> ChangeEvent<T> {
    /// Returns the action of this event.
    pub fn action(&self) -> ChangeAction {
        match self {
            ChangeEvent::Created(_) => ChangeAction::Create,
            ChangeEvent::Updated(_) => ChangeAction::Update,
            ChangeEvent::Deleted(_) => ChangeAction::Delete,
        }
    }

    /// Converts the payload, keeping the action.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ChangeEvent<U> {
        match self {
            ChangeEvent::Created(t) => ChangeEvent::Created(f(t)),
            ChangeEvent::Updated(t) => ChangeEvent::Updated(f(t)),
            ChangeEvent::Deleted(id) => ChangeEvent::Deleted(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FileRecord;
    use serde_json::json;

    #[test]
    fn decodes_wire_shape() {
        let raw: RawChange = serde_json::from_value(json!({
            "action": "update",
            "record": { "id": "f1", "collectionName": "files", "name": "a.txt" }
        }))
        .unwrap();

        assert_eq!(raw.action, ChangeAction::Update);
        assert_eq!(raw.collection(), Some("files"));

        match raw.into_event::<FileRecord>().unwrap() {
            ChangeEvent::Updated(file) => assert_eq!(file.name, "a.txt"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn delete_skips_payload_decoding() {
        let raw: RawChange = serde_json::from_value(json!({
            "action": "delete",
            "record": { "id": "f1", "shared": 17 }
        }))
        .unwrap();

        let event = raw.into_event::<FileRecord>().unwrap();
        assert_eq!(event, ChangeEvent::Deleted(RecordId::new("f1").unwrap()));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let raw = serde_json::from_value::<RawChange>(json!({
            "action": "truncate",
            "record": { "id": "f1" }
        }));
        assert!(raw.is_err());
    }
}
