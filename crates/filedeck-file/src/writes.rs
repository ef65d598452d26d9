//! Record creation and update against the file store.
//!
//! Mirrors what a hosted backend does on write: system fields are assigned,
//! attachments are stored and replaced by their stored names, and passwords
//! are hashed into the credential store instead of the record.

use bcrypt::{DEFAULT_COST, hash, verify};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use filedeck_core::error::{Error, ProtocolError};
use filedeck_core::ops::MIN_PASSWORD_LEN;
use filedeck_core::types::{CollectionName, RecordId, Timestamp};
use filedeck_core::{ChangeAction, Record, RecordFields, Result};

use crate::store::{AuthEntry, FileStore};

const HASH_COST: u32 = if cfg!(test) { 4 } else { DEFAULT_COST };

/// Fields owned by the store; values sent for them are ignored.
const SYSTEM_FIELDS: &[&str] = &["id", "collectionId", "collectionName", "created", "updated"];

/// Fields of auth collections that must be unique.
const UNIQUE_FIELDS: &[&str] = &["username", "email"];

/// Password fields split off the submitted values.
struct Passwords {
    password: Option<String>,
    confirm: Option<String>,
    old: Option<String>,
}

impl Passwords {
    fn take(values: &mut Map<String, Value>) -> Self {
        let mut take = |field: &str| match values.remove(field) {
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
            None => None,
        };
        Self {
            password: take("password"),
            confirm: take("passwordConfirm"),
            old: take("oldPassword"),
        }
    }

    /// Validates a new password and returns its hash, if one was sent.
    fn new_hash(&self, failure: &str) -> Result<Option<String>> {
        let Some(password) = &self.password else {
            return Ok(None);
        };
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(validation(
                failure,
                "password",
                "validation_length_out_of_range",
                &format!("Must be at least {} characters.", MIN_PASSWORD_LEN),
            ));
        }
        if self.confirm.as_deref() != Some(password.as_str()) {
            return Err(validation(
                failure,
                "passwordConfirm",
                "validation_values_mismatch",
                "Values don't match.",
            ));
        }
        hash(password, HASH_COST)
            .map(Some)
            .map_err(|e| filedeck_core::InvalidInputError::other(e.to_string()).into())
    }
}

/// A 400 with per-field details, as a hosted backend reports it.
fn validation(failure: &str, field: &str, code: &str, message: &str) -> Error {
    ProtocolError::new(400, Some(failure.to_string()))
        .with_data(json!({ field: { "code": code, "message": message } }))
        .into()
}

#[instrument(skip(store, fields), fields(%collection))]
pub(crate) fn create(
    store: &FileStore,
    collection: &CollectionName,
    fields: &RecordFields,
) -> Result<Record> {
    const FAILURE: &str = "Failed to create record.";

    let mut values = fields.values().clone();
    let passwords = Passwords::take(&mut values);

    let id = match values.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => RecordId::new(id)
            .map_err(|_| validation(FAILURE, "id", "validation_invalid_format", "Invalid id."))?,
        _ => FileStore::generate_id()?,
    };
    if store.exists(collection, &id) {
        return Err(validation(
            FAILURE,
            "id",
            "validation_not_unique",
            "Value must be unique.",
        ));
    }

    let password_hash = passwords.new_hash(FAILURE)?;
    let is_auth = password_hash.is_some() || store.is_auth_collection(collection);
    if is_auth {
        check_unique(store, collection, None, &values, FAILURE)?;
    }

    let now = Timestamp::now();
    let mut record = Record::with_id(id);
    record.collection_id = Some(collection.to_string());
    record.collection_name = Some(collection.to_string());
    record.created = Some(now);
    record.updated = Some(now);
    record.fields = user_fields(values);

    store_files(store, collection, &mut record, fields)?;

    if let Some(password_hash) = password_hash {
        store.set_auth_entry(collection, &record.id, &AuthEntry { password_hash })?;
    }

    store.put(collection, &record, ChangeAction::Create)?;
    debug!(id = %record.id, "Created record");
    Ok(record)
}

#[instrument(skip(store, fields), fields(%collection, %id))]
pub(crate) fn update(
    store: &FileStore,
    collection: &CollectionName,
    id: &RecordId,
    fields: &RecordFields,
) -> Result<Record> {
    const FAILURE: &str = "Failed to update record.";

    let mut record = store.get(collection, id)?;

    let mut values = fields.values().clone();
    let passwords = Passwords::take(&mut values);

    let password_hash = passwords.new_hash(FAILURE)?;
    if password_hash.is_some()
        && let Some(current) = store.auth_entry(collection, id)?
    {
        let old = passwords.old.as_deref().unwrap_or_default();
        if !verify(old, &current.password_hash).unwrap_or(false) {
            return Err(validation(
                FAILURE,
                "oldPassword",
                "validation_invalid_old_password",
                "Missing or invalid old password.",
            ));
        }
    }

    if password_hash.is_some() || store.is_auth_collection(collection) {
        check_unique(store, collection, Some(id), &values, FAILURE)?;
    }

    record.fields.extend(user_fields(values));
    for (field, _) in fields.files() {
        for stored in stored_names(&record, field) {
            store.remove_file(collection, id, &stored);
        }
        record.fields.remove(field);
    }
    store_files(store, collection, &mut record, fields)?;
    record.updated = Some(Timestamp::now());

    if let Some(password_hash) = password_hash {
        store.set_auth_entry(collection, id, &AuthEntry { password_hash })?;
    }

    store.put(collection, &record, ChangeAction::Update)?;
    debug!("Updated record");
    Ok(record)
}

fn user_fields(mut values: Map<String, Value>) -> Map<String, Value> {
    for field in SYSTEM_FIELDS {
        values.remove(*field);
    }
    values
}

/// Writes attachments and records their stored names; several files under
/// one field become a list.
fn store_files(
    store: &FileStore,
    collection: &CollectionName,
    record: &mut Record,
    fields: &RecordFields,
) -> Result<()> {
    for (field, attachment) in fields.files() {
        let stored = store.write_file(collection, &record.id, &attachment.filename, &attachment.bytes)?;
        let value = match record.fields.remove(field) {
            None | Some(Value::Null) => Value::String(stored),
            Some(Value::String(s)) if s.is_empty() => Value::String(stored),
            Some(Value::Array(mut items)) => {
                items.push(Value::String(stored));
                Value::Array(items)
            }
            Some(previous) => Value::Array(vec![previous, Value::String(stored)]),
        };
        record.fields.insert(field.clone(), value);
    }
    Ok(())
}

fn check_unique(
    store: &FileStore,
    collection: &CollectionName,
    id: Option<&RecordId>,
    values: &Map<String, Value>,
    failure: &str,
) -> Result<()> {
    let wanted: Vec<(&str, &str)> = UNIQUE_FIELDS
        .iter()
        .filter_map(|field| {
            values
                .get(*field)
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(|v| (*field, v))
        })
        .collect();
    if wanted.is_empty() {
        return Ok(());
    }

    for existing in store.list(collection)? {
        if Some(&existing.id) == id {
            continue;
        }
        for (field, value) in &wanted {
            if existing.get_str(field) == Some(*value) {
                return Err(validation(
                    failure,
                    field,
                    "validation_not_unique",
                    "Value must be unique.",
                ));
            }
        }
    }
    Ok(())
}

/// Stored file names held by a file field.
fn stored_names(record: &Record, field: &str) -> Vec<String> {
    match record.get(field) {
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
