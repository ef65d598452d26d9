//! File-backed backend implementation.

use std::path::Path;

use async_trait::async_trait;
use bcrypt::verify;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use filedeck_core::error::{AuthError, Error, InvalidInputError};
use filedeck_core::traits::Backend;
use filedeck_core::types::{BackendUrl, CollectionName, RecordId};
use filedeck_core::{AuthToken, Credentials, Record, RecordFields, Result};

use crate::session::FileSession;
use crate::store::FileStore;
use crate::writes;

const AUTH_FAILURE: &str = "Failed to authenticate.";

/// Claims carried by a file backend token.
///
/// `key` is the password hash at login time, so changing the password
/// invalidates every token issued before.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    collection: String,
    id: String,
    key: String,
}

/// A backend storing records under a local directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    url: BackendUrl,
    store: FileStore,
}

impl FileBackend {
    /// Create a backend for a `file://` URL.
    pub fn new(url: BackendUrl) -> Result<Self> {
        let root = url
            .to_file_path()
            .filter(|_| url.is_local())
            .ok_or_else(|| InvalidInputError::BackendUrl {
                value: url.to_string(),
                reason: "the file backend needs a file:// URL".to_string(),
            })?;
        Ok(Self {
            store: FileStore::new(root),
            url,
        })
    }

    /// Create a backend rooted at a directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let url = Url::from_directory_path(root).map_err(|()| InvalidInputError::BackendUrl {
            value: root.display().to_string(),
            reason: "not an absolute path".to_string(),
        })?;
        Self::new(BackendUrl::new(url.as_str())?)
    }

    /// Access the underlying file store.
    pub fn store(&self) -> &FileStore {
        &self.store
    }

    fn make_token(collection: &CollectionName, id: &RecordId, key: &str) -> Result<AuthToken> {
        let claims = TokenClaims {
            collection: collection.to_string(),
            id: id.to_string(),
            key: key.to_string(),
        };
        Ok(AuthToken::new(serde_json::to_string(&claims)?))
    }

    /// Checks a token against the current credentials and returns the user.
    pub(crate) fn validate_token(
        &self,
        collection: &CollectionName,
        token: &AuthToken,
    ) -> Result<Record> {
        let claims: TokenClaims =
            serde_json::from_str(token.as_str()).map_err(|_| AuthError::SessionExpired)?;
        if claims.collection != collection.as_str() {
            return Err(AuthError::SessionExpired.into());
        }
        let id = RecordId::new(&claims.id).map_err(|_| AuthError::SessionExpired)?;

        let entry = self
            .store
            .auth_entry(collection, &id)?
            .ok_or(AuthError::SessionExpired)?;
        if entry.password_hash != claims.key {
            debug!(user = %id, "Token predates a password change");
            return Err(AuthError::SessionExpired.into());
        }

        self.store.get(collection, &id).map_err(|e| {
            if e.is_not_found() {
                AuthError::SessionExpired.into()
            } else {
                e
            }
        })
    }

    fn find_identity(&self, collection: &CollectionName, identity: &str) -> Result<Option<Record>> {
        let identity = identity.trim();
        Ok(self.store.list(collection)?.into_iter().find(|record| {
            record.get_str("username") == Some(identity)
                || record
                    .get_str("email")
                    .is_some_and(|email| email.eq_ignore_ascii_case(identity))
        }))
    }
}

#[async_trait]
impl Backend for FileBackend {
    type Session = FileSession;

    fn url(&self) -> &BackendUrl {
        &self.url
    }

    #[instrument(skip(self, credentials), fields(backend = %self.url))]
    async fn authenticate(
        &self,
        collection: &CollectionName,
        credentials: Credentials,
    ) -> Result<FileSession> {
        debug!(identity = credentials.identity(), "Authenticating");

        let invalid = || -> Error { AuthError::InvalidCredentials(AUTH_FAILURE.to_string()).into() };

        let user = self
            .find_identity(collection, credentials.identity())?
            .ok_or_else(invalid)?;
        let entry = self
            .store
            .auth_entry(collection, &user.id)?
            .ok_or_else(invalid)?;

        let ok = verify(credentials.password(), &entry.password_hash)
            .map_err(|e| InvalidInputError::other(e.to_string()))?;
        if !ok {
            return Err(invalid());
        }

        let token = Self::make_token(collection, &user.id, &entry.password_hash)?;
        info!(user = %user.id, "Session created");

        Ok(FileSession::new(self.clone(), collection.clone(), token, user))
    }

    async fn restore(
        &self,
        collection: &CollectionName,
        token: AuthToken,
        user: Record,
    ) -> Result<FileSession> {
        debug!(user = %user.id, "Restoring session");
        let current = self.validate_token(collection, &token)?;
        if current.id != user.id {
            return Err(AuthError::SessionExpired.into());
        }
        Ok(FileSession::new(self.clone(), collection.clone(), token, current))
    }

    #[instrument(skip(self, fields), fields(backend = %self.url))]
    async fn register(&self, collection: &CollectionName, fields: &RecordFields) -> Result<Record> {
        let record = writes::create(&self.store, collection, fields)?;
        info!(id = %record.id, "Account registered");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn signup(username: &str) -> RecordFields {
        RecordFields::new()
            .set("username", username)
            .set("email", format!("{}@example.com", username))
            .set("password", "hunter22")
            .set("passwordConfirm", "hunter22")
    }

    #[test]
    fn open_builds_a_file_url() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        assert!(backend.url().is_local());
        assert_eq!(backend.store().root(), dir.path());
    }

    #[test]
    fn rejects_network_urls() {
        let url = BackendUrl::new("https://files.example.com").unwrap();
        assert!(FileBackend::new(url).is_err());
    }

    #[tokio::test]
    async fn login_by_username_or_email() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let users = CollectionName::users();
        backend.register(&users, &signup("alice")).await.unwrap();

        for identity in ["alice", "Alice@Example.com"] {
            let session = backend
                .authenticate(&users, Credentials::new(identity, "hunter22"))
                .await
                .unwrap();
            assert_eq!(
                filedeck_core::Session::user(&session).get_str("username"),
                Some("alice")
            );
        }
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let users = CollectionName::users();
        backend.register(&users, &signup("alice")).await.unwrap();

        let err = backend
            .authenticate(&users, Credentials::new("alice", "wrong-password"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials(_))));

        let err = backend
            .authenticate(&users, Credentials::new("bob", "hunter22"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn restore_rejects_forged_tokens() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let users = CollectionName::users();
        let user = backend.register(&users, &signup("alice")).await.unwrap();

        let forged = FileBackend::make_token(&users, &user.id, "not-the-hash").unwrap();
        let err = backend.restore(&users, forged, user.clone()).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::SessionExpired)));

        let err = backend
            .restore(&users, AuthToken::new("garbage"), user)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::SessionExpired)));
    }
}
