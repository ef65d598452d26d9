//! Backend trait.

use async_trait::async_trait;

use crate::record::{Record, RecordFields};
use crate::types::{BackendUrl, CollectionName};
use crate::{AuthToken, Credentials, Result};

use super::Session;

/// A backend implementation.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Session type for this backend.
    type Session: Session;

    /// Returns the backend URL for this instance.
    fn url(&self) -> &BackendUrl;

    /// Authenticate against an auth collection and create a new session.
    async fn authenticate(
        &self,
        collection: &CollectionName,
        credentials: Credentials,
    ) -> Result<Self::Session>;

    /// Rebuild a session from a persisted token and user record.
    async fn restore(
        &self,
        collection: &CollectionName,
        token: AuthToken,
        user: Record,
    ) -> Result<Self::Session>;

    /// Create a record without a session, for sign-up.
    async fn register(&self, collection: &CollectionName, fields: &RecordFields) -> Result<Record>;
}
