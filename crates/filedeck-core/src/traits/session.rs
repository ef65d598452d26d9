//! Authenticated session trait.

use async_trait::async_trait;
use url::Url;

use crate::error::{InvalidInputError, ProtocolError};
use crate::query::{ListQuery, eq};
use crate::record::{Record, RecordFields};
use crate::types::{BackendUrl, CollectionName, RecordId, Topic};
use crate::{AuthToken, Result};

use super::ChangeStream;

/// An authenticated session for record operations.
#[async_trait]
pub trait Session: Send + Sync {
    /// Change stream type for this session's subscriptions.
    type Subscription: ChangeStream + Unpin + 'static;

    /// Returns the backend URL associated with this session.
    fn backend_url(&self) -> &BackendUrl;

    /// Returns the auth collection the session was created against.
    fn auth_collection(&self) -> &CollectionName;

    /// Returns the authenticated user record.
    ///
    /// Updating that record through [`Session::update`] refreshes it.
    fn user(&self) -> Record;

    /// Returns the auth token for this session.
    fn token(&self) -> AuthToken;

    /// Fetch every record matching `query`, page by page.
    async fn get_full_list(
        &self,
        collection: &CollectionName,
        query: &ListQuery,
    ) -> Result<Vec<Record>>;

    /// Fetch one record by id.
    async fn get_one(&self, collection: &CollectionName, id: &RecordId) -> Result<Record>;

    /// Fetch the first record matching `filter`; a 404 protocol error if none does.
    async fn get_first_matching(&self, collection: &CollectionName, filter: &str)
    -> Result<Record>;

    /// Create a record.
    async fn create(&self, collection: &CollectionName, fields: &RecordFields) -> Result<Record>;

    /// Update a record, returning its new value.
    async fn update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        fields: &RecordFields,
    ) -> Result<Record>;

    /// Delete a record.
    async fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<()>;

    /// Open a change stream for `topic`.
    async fn subscribe(&self, topic: &Topic) -> Result<Self::Subscription>;

    /// Close every change stream opened for `topic`.
    async fn unsubscribe(&self, topic: &Topic) -> Result<()>;

    /// URL of a stored file, authorized with the session token.
    fn file_url_for(&self, collection_id: &str, id: &RecordId, filename: &str) -> Result<Url>;

    /// URL of a file attached to `record`.
    fn file_url(&self, record: &Record, filename: &str) -> Result<Url> {
        let collection = record
            .collection_id
            .as_deref()
            .or(record.collection_name.as_deref())
            .ok_or_else(|| {
                InvalidInputError::other(format!("record {} has no collection", record.id))
            })?;
        self.file_url_for(collection, &record.id, filename)
    }

    /// Fetch the first record whose `field` equals `value`.
    async fn find_by(
        &self,
        collection: &CollectionName,
        field: &str,
        value: &str,
    ) -> Result<Record> {
        self.get_first_matching(collection, &eq(field, value))
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ProtocolError::not_found(format!("{} with {} {}", collection, field, value))
                        .into()
                } else {
                    e
                }
            })
    }
}
