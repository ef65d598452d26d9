//! Domain operations written against [`Session`](crate::Session).
//!
//! Each function is one user-facing action of the file manager: uploading,
//! sharing, folder membership, user and role administration, and profile
//! updates. They hold no state of their own, except the live screens in
//! [`live`], which own their views until deactivated.

pub mod files;
pub mod folders;
pub mod live;
pub mod profile;
pub mod roles;
pub mod users;

use serde_json::Value;

use crate::Result;
use crate::error::InvalidInputError;
use crate::record::{FromRecord, Record};
use crate::types::RecordId;

/// Minimum length of a new password.
pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn typed<T: FromRecord>(records: Vec<Record>) -> Result<Vec<T>> {
    records.into_iter().map(T::from_record).collect()
}

pub(crate) fn id_list(ids: &[RecordId]) -> Value {
    Value::Array(ids.iter().map(|id| Value::from(id.as_str())).collect())
}

/// Checks a new password against its confirmation.
pub fn check_password(password: &str, confirm: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(InvalidInputError::other(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        ))
        .into());
    }
    if password != confirm {
        return Err(InvalidInputError::other("passwords do not match").into());
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory session for exercising operations.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use url::Url;

    use crate::query::ListQuery;
    use crate::record::{Record, RecordFields};
    use crate::subscription::{ChangeSubscription, SubscriptionRegistry};
    use crate::traits::Session;
    use crate::types::{BackendUrl, CollectionName, RecordId, Topic};
    use crate::{AuthToken, ProtocolError, Result};

    pub struct MemorySession {
        url: BackendUrl,
        auth: CollectionName,
        user: Mutex<Record>,
        records: Mutex<HashMap<String, Vec<Record>>>,
        next_id: Mutex<u32>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MemorySession {
        pub fn new(user_id: &str) -> Self {
            let user: Record = serde_json::from_value(json!({
                "id": user_id,
                "collectionName": "users",
                "username": user_id,
            }))
            .unwrap();

            let session = Self {
                url: BackendUrl::new("http://localhost:8090").unwrap(),
                auth: CollectionName::users(),
                user: Mutex::new(user.clone()),
                records: Mutex::new(HashMap::new()),
                next_id: Mutex::new(0),
                requests: Mutex::new(Vec::new()),
            };
            session.insert("users", user);
            session
        }

        pub fn insert(&self, collection: &str, record: Record) {
            self.records
                .lock()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .push(record);
        }

        pub fn seed(&self, collection: &str, value: Value) {
            let mut record: Record = serde_json::from_value(value).unwrap();
            record.collection_name = Some(collection.to_string());
            self.insert(collection, record);
        }

        pub fn all(&self, collection: &str) -> Vec<Record> {
            self.records
                .lock()
                .unwrap()
                .get(collection)
                .cloned()
                .unwrap_or_default()
        }

        fn log(&self, entry: String) {
            self.requests.lock().unwrap().push(entry);
        }

        fn apply_fields(record: &mut Record, fields: &RecordFields) {
            for (k, v) in fields.values() {
                if k == "password" || k == "passwordConfirm" || k == "oldPassword" {
                    continue;
                }
                record.fields.insert(k.clone(), v.clone());
            }
            for (field, attachment) in fields.files() {
                record
                    .fields
                    .insert(field.clone(), Value::from(attachment.filename.clone()));
            }
        }
    }

    #[async_trait]
    impl Session for MemorySession {
        type Subscription = ChangeSubscription;

        fn backend_url(&self) -> &BackendUrl {
            &self.url
        }

        fn auth_collection(&self) -> &CollectionName {
            &self.auth
        }

        fn user(&self) -> Record {
            self.user.lock().unwrap().clone()
        }

        fn token(&self) -> AuthToken {
            AuthToken::new("memory-token")
        }

        async fn get_full_list(
            &self,
            collection: &CollectionName,
            query: &ListQuery,
        ) -> Result<Vec<Record>> {
            self.log(format!(
                "list {} sort={} filter={}",
                collection,
                query.sort.as_deref().unwrap_or(""),
                query.filter.as_deref().unwrap_or("")
            ));
            Ok(self.all(collection.as_str()))
        }

        async fn get_one(&self, collection: &CollectionName, id: &RecordId) -> Result<Record> {
            self.all(collection.as_str())
                .into_iter()
                .find(|r| &r.id == id)
                .ok_or_else(|| ProtocolError::not_found(id).into())
        }

        async fn get_first_matching(
            &self,
            collection: &CollectionName,
            filter: &str,
        ) -> Result<Record> {
            self.log(format!("first {} {}", collection, filter));
            // Only `name = "x"` is needed by the operations under test.
            let wanted = filter
                .strip_prefix("name = \"")
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or_default();
            self.all(collection.as_str())
                .into_iter()
                .find(|r| r.get_str("name") == Some(wanted))
                .ok_or_else(|| ProtocolError::not_found(filter).into())
        }

        async fn create(&self, collection: &CollectionName, fields: &RecordFields) -> Result<Record> {
            let id = {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                format!("new{}", next)
            };
            let mut record = Record::with_id(RecordId::new(id).unwrap());
            record.collection_id = Some(format!("pbc_{}", collection));
            record.collection_name = Some(collection.to_string());
            Self::apply_fields(&mut record, fields);
            self.insert(collection.as_str(), record.clone());
            Ok(record)
        }

        async fn update(
            &self,
            collection: &CollectionName,
            id: &RecordId,
            fields: &RecordFields,
        ) -> Result<Record> {
            self.log(format!("update {} {}", collection, id));
            let mut records = self.records.lock().unwrap();
            let record = records
                .get_mut(collection.as_str())
                .and_then(|list| list.iter_mut().find(|r| &r.id == id))
                .ok_or_else(|| ProtocolError::not_found(id))?;
            Self::apply_fields(record, fields);
            let updated = record.clone();
            if collection == &self.auth && id == &self.user.lock().unwrap().id {
                *self.user.lock().unwrap() = updated.clone();
            }
            Ok(updated)
        }

        async fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<()> {
            let mut records = self.records.lock().unwrap();
            let list = records.entry(collection.to_string()).or_default();
            let before = list.len();
            list.retain(|r| &r.id != id);
            if list.len() == before {
                return Err(ProtocolError::not_found(id).into());
            }
            Ok(())
        }

        async fn subscribe(&self, topic: &Topic) -> Result<ChangeSubscription> {
            let registry = SubscriptionRegistry::new();
            Ok(registry.open(topic.clone(), |_tx| std::future::pending::<()>()))
        }

        async fn unsubscribe(&self, _topic: &Topic) -> Result<()> {
            Ok(())
        }

        fn file_url_for(&self, collection_id: &str, id: &RecordId, filename: &str) -> Result<Url> {
            let mut url = Url::parse(
                &self
                    .url
                    .api_url(&format!("files/{}/{}/{}", collection_id, id, filename)),
            )
            .unwrap();
            url.query_pairs_mut().append_pair("token", "memory-token");
            Ok(url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_rules() {
        assert!(check_password("short", "short").is_err());
        assert!(check_password("longenough", "different").is_err());
        assert!(check_password("longenough", "longenough").is_ok());
    }
}
