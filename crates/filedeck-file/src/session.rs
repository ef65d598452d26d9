//! File-backed session implementation.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{debug, instrument};
use url::Url;

use filedeck_core::error::{InvalidInputError, ProtocolError};
use filedeck_core::traits::Session as SessionTrait;
use filedeck_core::types::{BackendUrl, CollectionName, RecordId, Topic};
use filedeck_core::{
    AuthToken, ChangeSubscription, ListQuery, Record, RecordFields, Result, SubscriptionRegistry,
};

use crate::backend::FileBackend;
use crate::filter::{Filter, sort_records};
use crate::tail::tail;
use crate::writes;

/// Order of list results when the query has no sort.
const DEFAULT_SORT: &str = "created";

/// Session for a file-backed backend.
///
/// The token is checked against the stored credentials on every call, so a
/// password change ends sessions opened before it.
#[derive(Clone)]
pub struct FileSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    backend: FileBackend,
    collection: CollectionName,
    token: AuthToken,
    user: RwLock<Record>,
    realtime: Arc<SubscriptionRegistry>,
}

impl FileSession {
    pub(crate) fn new(
        backend: FileBackend,
        collection: CollectionName,
        token: AuthToken,
        user: Record,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                backend,
                collection,
                token,
                user: RwLock::new(user),
                realtime: SubscriptionRegistry::new(),
            }),
        }
    }

    /// Open change streams, by topic.
    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.inner.realtime
    }

    fn authorize(&self) -> Result<()> {
        self.inner
            .backend
            .validate_token(&self.inner.collection, &self.inner.token)
            .map(|_| ())
    }

    fn refresh_user(&self, collection: &CollectionName, record: &Record) {
        if collection != &self.inner.collection {
            return;
        }
        let mut user = self.inner.user.write().unwrap_or_else(PoisonError::into_inner);
        if user.id == record.id {
            debug!(user = %record.id, "Refreshing session user");
            *user = record.clone();
        }
    }
}

#[async_trait]
impl SessionTrait for FileSession {
    type Subscription = ChangeSubscription;

    fn backend_url(&self) -> &BackendUrl {
        filedeck_core::Backend::url(&self.inner.backend)
    }

    fn auth_collection(&self) -> &CollectionName {
        &self.inner.collection
    }

    fn user(&self) -> Record {
        self.inner
            .user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn token(&self) -> AuthToken {
        self.inner.token.clone()
    }

    #[instrument(skip(self), fields(%collection))]
    async fn get_full_list(
        &self,
        collection: &CollectionName,
        query: &ListQuery,
    ) -> Result<Vec<Record>> {
        self.authorize()?;
        let filter = Filter::parse(query.filter.as_deref().unwrap_or_default())?;

        let mut records: Vec<Record> = self
            .inner
            .backend
            .store()
            .list(collection)?
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect();

        sort_records(&mut records, "id");
        sort_records(&mut records, query.sort.as_deref().unwrap_or(DEFAULT_SORT));

        debug!(count = records.len(), "Listed records");
        Ok(records)
    }

    #[instrument(skip(self), fields(%collection, %id))]
    async fn get_one(&self, collection: &CollectionName, id: &RecordId) -> Result<Record> {
        self.authorize()?;
        self.inner.backend.store().get(collection, id)
    }

    #[instrument(skip(self), fields(%collection))]
    async fn get_first_matching(
        &self,
        collection: &CollectionName,
        filter: &str,
    ) -> Result<Record> {
        let query = ListQuery::new().filter(filter);
        self.get_full_list(collection, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ProtocolError::not_found(format!("{} record matching {}", collection, filter))
                    .into()
            })
    }

    #[instrument(skip(self, fields), fields(%collection))]
    async fn create(&self, collection: &CollectionName, fields: &RecordFields) -> Result<Record> {
        self.authorize()?;
        writes::create(self.inner.backend.store(), collection, fields)
    }

    #[instrument(skip(self, fields), fields(%collection, %id))]
    async fn update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        fields: &RecordFields,
    ) -> Result<Record> {
        self.authorize()?;
        let record = writes::update(self.inner.backend.store(), collection, id, fields)?;
        self.refresh_user(collection, &record);
        Ok(record)
    }

    #[instrument(skip(self), fields(%collection, %id))]
    async fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<()> {
        self.authorize()?;
        self.inner.backend.store().remove(collection, id)?;
        Ok(())
    }

    async fn subscribe(&self, topic: &Topic) -> Result<ChangeSubscription> {
        self.authorize()?;
        let store = self.inner.backend.store();
        let path = store.changes_path();
        let start = store.changes_len();
        let tailed = topic.clone();

        Ok(self
            .inner
            .realtime
            .open(topic.clone(), move |tx| tail(path, start, tailed, tx)))
    }

    async fn unsubscribe(&self, topic: &Topic) -> Result<()> {
        self.inner.realtime.release(topic);
        Ok(())
    }

    /// Files are read in place, so the URL is a plain `file://` URL.
    fn file_url_for(&self, collection_id: &str, id: &RecordId, filename: &str) -> Result<Url> {
        let path = self
            .inner
            .backend
            .store()
            .storage_dir(collection_id, id)
            .join(filename);
        Url::from_file_path(&path).map_err(|()| {
            InvalidInputError::other(format!("{} is not an absolute path", path.display())).into()
        })
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.realtime.release_all();
    }
}

impl std::fmt::Debug for FileSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSession")
            .field("backend", &self.backend_url().as_str())
            .field("user", &self.user().id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filedeck_core::Backend;
    use tempfile::TempDir;

    async fn session(dir: &TempDir) -> FileSession {
        let backend = FileBackend::open(dir.path()).unwrap();
        let users = CollectionName::users();
        let fields = RecordFields::new()
            .set("username", "alice")
            .set("password", "hunter22")
            .set("passwordConfirm", "hunter22");
        backend.register(&users, &fields).await.unwrap();
        backend
            .authenticate(&users, filedeck_core::Credentials::new("alice", "hunter22"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn file_urls_point_into_storage() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir).await;
        let url = session
            .file_url_for("files", &RecordId::new("abc").unwrap(), "my report.pdf")
            .unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.as_str().ends_with("/storage/files/abc/my%20report.pdf"));
        assert!(url.query().is_none());
    }

    #[tokio::test]
    async fn debug_redacts_token() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir).await;
        let debug = format!("{:?}", session);
        assert!(!debug.contains(session.token().as_str()));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn lists_default_to_creation_order() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir).await;
        let files = CollectionName::files();
        for name in ["b", "a", "c"] {
            session
                .create(&files, &RecordFields::new().set("name", name))
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let names = |records: Vec<Record>| -> Vec<String> {
            records
                .iter()
                .map(|r| r.get_str("name").unwrap().to_string())
                .collect()
        };

        let records = session.get_full_list(&files, &ListQuery::new()).await.unwrap();
        assert_eq!(names(records), ["b", "a", "c"]);

        let query = ListQuery::new().sort("-name");
        let records = session.get_full_list(&files, &query).await.unwrap();
        assert_eq!(names(records), ["c", "b", "a"]);
    }

    #[tokio::test]
    async fn password_change_ends_the_session() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir).await;
        let users = CollectionName::users();
        let me = session.user().id;

        let fields = RecordFields::new()
            .set("oldPassword", "hunter22")
            .set("password", "correct horse")
            .set("passwordConfirm", "correct horse");
        session.update(&users, &me, &fields).await.unwrap();

        let err = session.get_one(&users, &me).await.unwrap_err();
        assert!(matches!(
            err,
            filedeck_core::Error::Auth(filedeck_core::AuthError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn invalid_filters_are_rejected() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir).await;
        let query = ListQuery::new().filter("name >");
        let err = session
            .get_full_list(&CollectionName::files(), &query)
            .await
            .unwrap_err();
        assert!(matches!(err, filedeck_core::Error::InvalidInput(_)));
    }
}
