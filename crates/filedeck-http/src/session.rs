//! HTTP-backed session implementation.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, instrument};
use url::Url;

use filedeck_core::error::{InvalidInputError, ProtocolError};
use filedeck_core::traits::Session as SessionTrait;
use filedeck_core::types::{BackendUrl, CollectionName, RecordId, Topic};
use filedeck_core::{
    AuthToken, ChangeSubscription, ListQuery, Record, RecordFields, Result, SubscriptionRegistry,
};

use crate::backend::HttpBackend;
use crate::endpoints::{self, ListParams, ListResponse, PER_PAGE};
use crate::realtime;

/// Session for an HTTP backend.
#[derive(Clone)]
pub struct HttpSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    backend: HttpBackend,
    collection: CollectionName,
    token: AuthToken,
    user: RwLock<Record>,
    realtime: Arc<SubscriptionRegistry>,
}

impl HttpSession {
    pub(crate) fn new(
        backend: HttpBackend,
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

    /// Open realtime streams, by topic.
    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.inner.realtime
    }

    fn token_ref(&self) -> Option<&AuthToken> {
        Some(&self.inner.token)
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
impl SessionTrait for HttpSession {
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
        let client = self.inner.backend.client();
        let path = endpoints::records(collection);
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let params = ListParams {
                page,
                per_page: PER_PAGE,
                sort: query.sort.as_deref(),
                filter: query.filter.as_deref(),
            };
            let response: ListResponse = client.get(&path, &params, self.token_ref()).await?;
            let count = response.items.len();
            records.extend(response.items);

            debug!(page, count, total = response.total_items, "Fetched page");

            if count < PER_PAGE as usize || i64::from(page) >= response.total_pages {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    #[instrument(skip(self), fields(%collection, %id))]
    async fn get_one(&self, collection: &CollectionName, id: &RecordId) -> Result<Record> {
        debug!("Getting record");
        self.inner
            .backend
            .client()
            .get(&endpoints::record(collection, id), &(), self.token_ref())
            .await
    }

    #[instrument(skip(self), fields(%collection))]
    async fn get_first_matching(
        &self,
        collection: &CollectionName,
        filter: &str,
    ) -> Result<Record> {
        let params = ListParams {
            page: 1,
            per_page: 1,
            sort: None,
            filter: Some(filter),
        };
        let response: ListResponse = self
            .inner
            .backend
            .client()
            .get(&endpoints::records(collection), &params, self.token_ref())
            .await?;

        response.items.into_iter().next().ok_or_else(|| {
            ProtocolError::not_found(format!("{} record matching {}", collection, filter)).into()
        })
    }

    #[instrument(skip(self, fields), fields(%collection))]
    async fn create(&self, collection: &CollectionName, fields: &RecordFields) -> Result<Record> {
        debug!("Creating record");
        self.inner
            .backend
            .client()
            .send_fields(
                Method::POST,
                &endpoints::records(collection),
                fields,
                self.token_ref(),
            )
            .await
    }

    #[instrument(skip(self, fields), fields(%collection, %id))]
    async fn update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        fields: &RecordFields,
    ) -> Result<Record> {
        debug!("Updating record");
        let record: Record = self
            .inner
            .backend
            .client()
            .send_fields(
                Method::PATCH,
                &endpoints::record(collection, id),
                fields,
                self.token_ref(),
            )
            .await?;
        self.refresh_user(collection, &record);
        Ok(record)
    }

    #[instrument(skip(self), fields(%collection, %id))]
    async fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<()> {
        debug!("Deleting record");
        self.inner
            .backend
            .client()
            .delete(&endpoints::record(collection, id), self.token_ref())
            .await
    }

    async fn subscribe(&self, topic: &Topic) -> Result<ChangeSubscription> {
        realtime::subscribe(
            self.inner.backend.client(),
            &self.inner.token,
            &self.inner.realtime,
            topic,
        )
        .await
    }

    async fn unsubscribe(&self, topic: &Topic) -> Result<()> {
        self.inner.realtime.release(topic);
        Ok(())
    }

    fn file_url_for(&self, collection_id: &str, id: &RecordId, filename: &str) -> Result<Url> {
        let base = self.backend_url().api_url("files");
        let mut url = Url::parse(&base).map_err(|e| InvalidInputError::BackendUrl {
            value: base.clone(),
            reason: e.to_string(),
        })?;
        url.path_segments_mut()
            .map_err(|_| InvalidInputError::other(format!("{} cannot hold a file path", base)))?
            .extend([collection_id, id.as_str(), filename]);
        url.query_pairs_mut()
            .append_pair("token", self.inner.token.as_str());
        Ok(url)
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.realtime.release_all();
    }
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("backend", &self.backend_url().as_str())
            .field("user", &self.user().id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
