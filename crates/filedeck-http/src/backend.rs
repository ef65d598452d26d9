//! HTTP-backed backend implementation.

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, info, instrument};

use filedeck_core::error::{AuthError, Error, InvalidInputError};
use filedeck_core::traits::Backend;
use filedeck_core::types::{BackendUrl, CollectionName};
use filedeck_core::{AuthToken, Credentials, Record, RecordFields, Result};

use crate::client::ApiClient;
use crate::endpoints::{self, AuthResponse, AuthWithPasswordRequest};
use crate::session::HttpSession;

/// A network backend speaking the REST and realtime API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    url: BackendUrl,
    client: ApiClient,
}

impl HttpBackend {
    /// Create a backend for an `http(s)://` URL.
    pub fn new(url: BackendUrl) -> Result<Self> {
        if !url.is_network() {
            return Err(InvalidInputError::BackendUrl {
                value: url.to_string(),
                reason: "the HTTP backend needs an http:// or https:// URL".to_string(),
            }
            .into());
        }
        let client = ApiClient::new(url.clone())?;
        Ok(Self { url, client })
    }

    pub(crate) fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait]
impl Backend for HttpBackend {
    type Session = HttpSession;

    fn url(&self) -> &BackendUrl {
        &self.url
    }

    #[instrument(skip(self, credentials), fields(backend = %self.url))]
    async fn authenticate(
        &self,
        collection: &CollectionName,
        credentials: Credentials,
    ) -> Result<HttpSession> {
        debug!(identity = credentials.identity(), "Authenticating");

        let request = AuthWithPasswordRequest {
            identity: credentials.identity(),
            password: credentials.password(),
        };

        let response: AuthResponse = self
            .client
            .send_json(
                Method::POST,
                &endpoints::auth_with_password(collection),
                &request,
                None,
            )
            .await
            .map_err(|e| match e {
                Error::Protocol(p) if p.status == 400 || p.is_auth_error() => {
                    AuthError::InvalidCredentials(p.to_string()).into()
                }
                other => other,
            })?;

        info!(user = %response.record.id, "Session created");

        Ok(HttpSession::new(
            self.clone(),
            collection.clone(),
            AuthToken::new(response.token),
            response.record,
        ))
    }

    async fn restore(
        &self,
        collection: &CollectionName,
        token: AuthToken,
        user: Record,
    ) -> Result<HttpSession> {
        debug!(user = %user.id, "Restoring session");
        Ok(HttpSession::new(self.clone(), collection.clone(), token, user))
    }

    #[instrument(skip(self, fields), fields(backend = %self.url))]
    async fn register(&self, collection: &CollectionName, fields: &RecordFields) -> Result<Record> {
        let record: Record = self
            .client
            .send_fields(Method::POST, &endpoints::records(collection), fields, None)
            .await?;
        info!(id = %record.id, "Account registered");
        Ok(record)
    }
}
