//! Backend and session wrappers for CLI use.
//!
//! The scheme of the backend URL picks the implementation: `file://` for
//! the local store, `http(s)://` for a hosted backend.

use async_trait::async_trait;
use url::Url;

use filedeck_core::traits::{Backend, Session};
use filedeck_core::types::{BackendUrl, CollectionName, RecordId, Topic};
use filedeck_core::{
    AuthToken, ChangeSubscription, Credentials, ListQuery, Record, RecordFields, Result,
};
use filedeck_file::{FileBackend, FileSession};
use filedeck_http::{HttpBackend, HttpSession};

/// Backend wrapper for CLI use.
#[derive(Debug, Clone)]
pub enum CliBackend {
    File(FileBackend),
    Http(HttpBackend),
}

impl CliBackend {
    pub fn new(url: BackendUrl) -> Result<Self> {
        if url.is_local() {
            Ok(CliBackend::File(FileBackend::new(url)?))
        } else {
            Ok(CliBackend::Http(HttpBackend::new(url)?))
        }
    }
}

#[async_trait]
impl Backend for CliBackend {
    type Session = CliSession;

    fn url(&self) -> &BackendUrl {
        match self {
            CliBackend::File(backend) => backend.url(),
            CliBackend::Http(backend) => backend.url(),
        }
    }

    async fn authenticate(
        &self,
        collection: &CollectionName,
        credentials: Credentials,
    ) -> Result<CliSession> {
        Ok(match self {
            CliBackend::File(backend) => {
                CliSession::File(backend.authenticate(collection, credentials).await?)
            }
            CliBackend::Http(backend) => {
                CliSession::Http(backend.authenticate(collection, credentials).await?)
            }
        })
    }

    async fn restore(
        &self,
        collection: &CollectionName,
        token: AuthToken,
        user: Record,
    ) -> Result<CliSession> {
        Ok(match self {
            CliBackend::File(backend) => {
                CliSession::File(backend.restore(collection, token, user).await?)
            }
            CliBackend::Http(backend) => {
                CliSession::Http(backend.restore(collection, token, user).await?)
            }
        })
    }

    async fn register(&self, collection: &CollectionName, fields: &RecordFields) -> Result<Record> {
        match self {
            CliBackend::File(backend) => backend.register(collection, fields).await,
            CliBackend::Http(backend) => backend.register(collection, fields).await,
        }
    }
}

/// Session wrapper for CLI use.
#[derive(Debug, Clone)]
pub enum CliSession {
    File(FileSession),
    Http(HttpSession),
}

#[async_trait]
impl Session for CliSession {
    type Subscription = ChangeSubscription;

    fn backend_url(&self) -> &BackendUrl {
        match self {
            CliSession::File(session) => session.backend_url(),
            CliSession::Http(session) => session.backend_url(),
        }
    }

    fn auth_collection(&self) -> &CollectionName {
        match self {
            CliSession::File(session) => session.auth_collection(),
            CliSession::Http(session) => session.auth_collection(),
        }
    }

    fn user(&self) -> Record {
        match self {
            CliSession::File(session) => session.user(),
            CliSession::Http(session) => session.user(),
        }
    }

    fn token(&self) -> AuthToken {
        match self {
            CliSession::File(session) => session.token(),
            CliSession::Http(session) => session.token(),
        }
    }

    async fn get_full_list(
        &self,
        collection: &CollectionName,
        query: &ListQuery,
    ) -> Result<Vec<Record>> {
        match self {
            CliSession::File(session) => session.get_full_list(collection, query).await,
            CliSession::Http(session) => session.get_full_list(collection, query).await,
        }
    }

    async fn get_one(&self, collection: &CollectionName, id: &RecordId) -> Result<Record> {
        match self {
            CliSession::File(session) => session.get_one(collection, id).await,
            CliSession::Http(session) => session.get_one(collection, id).await,
        }
    }

    async fn get_first_matching(
        &self,
        collection: &CollectionName,
        filter: &str,
    ) -> Result<Record> {
        match self {
            CliSession::File(session) => session.get_first_matching(collection, filter).await,
            CliSession::Http(session) => session.get_first_matching(collection, filter).await,
        }
    }

    async fn create(&self, collection: &CollectionName, fields: &RecordFields) -> Result<Record> {
        match self {
            CliSession::File(session) => session.create(collection, fields).await,
            CliSession::Http(session) => session.create(collection, fields).await,
        }
    }

    async fn update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        fields: &RecordFields,
    ) -> Result<Record> {
        match self {
            CliSession::File(session) => session.update(collection, id, fields).await,
            CliSession::Http(session) => session.update(collection, id, fields).await,
        }
    }

    async fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<()> {
        match self {
            CliSession::File(session) => session.delete(collection, id).await,
            CliSession::Http(session) => session.delete(collection, id).await,
        }
    }

    async fn subscribe(&self, topic: &Topic) -> Result<ChangeSubscription> {
        match self {
            CliSession::File(session) => session.subscribe(topic).await,
            CliSession::Http(session) => session.subscribe(topic).await,
        }
    }

    async fn unsubscribe(&self, topic: &Topic) -> Result<()> {
        match self {
            CliSession::File(session) => session.unsubscribe(topic).await,
            CliSession::Http(session) => session.unsubscribe(topic).await,
        }
    }

    fn file_url_for(&self, collection_id: &str, id: &RecordId, filename: &str) -> Result<Url> {
        match self {
            CliSession::File(session) => session.file_url_for(collection_id, id, filename),
            CliSession::Http(session) => session.file_url_for(collection_id, id, filename),
        }
    }
}
