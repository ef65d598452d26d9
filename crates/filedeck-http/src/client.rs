//! HTTP client for the REST API.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, instrument, trace};

use filedeck_core::error::{Error, InvalidInputError, ProtocolError, TransportError};
use filedeck_core::record::Attachment;
use filedeck_core::{AuthToken, BackendUrl, RecordFields, Result};

use crate::endpoints::ApiErrorResponse;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client bound to one backend.
#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    client: reqwest::Client,
    base: BackendUrl,
}

impl ApiClient {
    /// Create a new client for the given backend.
    pub fn new(base: BackendUrl) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("filedeck/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(transport_error)?;

        Ok(Self { client, base })
    }

    /// Make a GET request with query parameters.
    #[instrument(skip(self, token), fields(backend = %self.base))]
    pub async fn get<Q, R>(&self, path: &str, params: &Q, token: Option<&AuthToken>) -> Result<R>
    where
        Q: Serialize + std::fmt::Debug,
        R: DeserializeOwned,
    {
        debug!(path, "GET");
        trace!(?params, "query parameters");

        let response = self
            .request(Method::GET, path, token)
            .query(params)
            .send()
            .await
            .map_err(transport_error)?;

        self.handle_response(response).await
    }

    /// Send a JSON body.
    #[instrument(skip(self, body, token), fields(backend = %self.base))]
    pub async fn send_json<B, R>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        token: Option<&AuthToken>,
    ) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        debug!(%method, path, "JSON request");

        let response = self
            .request(method, path, token)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        self.handle_response(response).await
    }

    /// Send a JSON body to an endpoint that answers with no content.
    #[instrument(skip(self, body, token), fields(backend = %self.base))]
    pub async fn send_json_no_response<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        token: Option<&AuthToken>,
    ) -> Result<()> {
        debug!(%method, path, "JSON request (no response)");

        let response = self
            .request(method, path, token)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        self.expect_success(response).await
    }

    /// Send record fields: JSON, or multipart when files are attached.
    #[instrument(skip(self, fields, token), fields(backend = %self.base))]
    pub async fn send_fields<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        fields: &RecordFields,
        token: Option<&AuthToken>,
    ) -> Result<R> {
        let request = self.request(method.clone(), path, token);
        let request = if fields.has_files() {
            debug!(%method, path, files = fields.files().len(), "Multipart request");
            request.multipart(multipart_form(fields)?)
        } else {
            debug!(%method, path, "JSON request");
            request.json(fields.values())
        };

        let response = request.send().await.map_err(transport_error)?;
        self.handle_response(response).await
    }

    /// Make a DELETE request.
    #[instrument(skip(self, token), fields(backend = %self.base))]
    pub async fn delete(&self, path: &str, token: Option<&AuthToken>) -> Result<()> {
        debug!(path, "DELETE");

        let response = self
            .request(Method::DELETE, path, token)
            .send()
            .await
            .map_err(transport_error)?;

        self.expect_success(response).await
    }

    /// Open a long-lived GET request and return the response once the
    /// status line is in.
    #[instrument(skip(self), fields(backend = %self.base))]
    pub async fn open_stream(&self, path: &str) -> Result<reqwest::Response> {
        debug!(path, "Opening event stream");

        let response = self
            .request(Method::GET, path, None)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Error::Protocol(self.parse_error_response(response).await))
        }
    }

    fn request(&self, method: Method, path: &str, token: Option<&AuthToken>) -> RequestBuilder {
        let request = self.client.request(method, self.base.api_url(path));
        match token {
            Some(token) => request.header(AUTHORIZATION, token.as_str()),
            None => request,
        }
    }

    /// Handle a response, parsing the body or error.
    async fn handle_response<R: DeserializeOwned>(&self, response: reqwest::Response) -> Result<R> {
        let status = response.status();
        trace!(status = %status, "HTTP response");

        if status.is_success() {
            let body = response.bytes().await.map_err(transport_error)?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            Err(Error::Protocol(self.parse_error_response(response).await))
        }
    }

    async fn expect_success(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();
        trace!(status = %status, "HTTP response");

        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Protocol(self.parse_error_response(response).await))
        }
    }

    /// Parse a `{code, message, data}` error body.
    async fn parse_error_response(&self, response: reqwest::Response) -> ProtocolError {
        let status = response.status().as_u16();

        match response.json::<ApiErrorResponse>().await {
            Ok(body) => {
                let error = ProtocolError::new(status, body.message);
                match body.data {
                    Some(data) if data.as_object().is_some_and(|d| !d.is_empty()) => {
                        error.with_data(data)
                    }
                    _ => error,
                }
            }
            Err(_) => ProtocolError::new(status, None),
        }
    }
}

/// Maps a reqwest failure onto the transport taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    let error = if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(error)
}

/// Builds a multipart form. Arrays become repeated fields; an empty array
/// is sent as one empty value so the relation is cleared.
fn multipart_form(fields: &RecordFields) -> Result<Form> {
    let mut form = Form::new();

    for (name, value) in fields.values() {
        match value {
            Value::Array(items) if items.is_empty() => {
                form = form.text(name.clone(), "");
            }
            Value::Array(items) => {
                for item in items {
                    form = form.text(name.clone(), form_text(item));
                }
            }
            other => {
                form = form.text(name.clone(), form_text(other));
            }
        }
    }

    for (name, attachment) in fields.files() {
        form = form.part(name.clone(), file_part(attachment)?);
    }

    Ok(form)
}

fn form_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn file_part(attachment: &Attachment) -> Result<Part> {
    let part = Part::bytes(attachment.bytes.clone()).file_name(attachment.filename.clone());
    match &attachment.content_type {
        Some(mime) => part.mime_str(mime).map_err(|e| {
            InvalidInputError::other(format!("invalid content type '{}': {}", mime, e)).into()
        }),
        None => Ok(part),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_creation() {
        let base = BackendUrl::new("https://files.example.com").unwrap();
        let client = ApiClient::new(base).unwrap();
        assert_eq!(client.base.base(), "https://files.example.com");
    }

    #[test]
    fn form_text_flattens_scalars() {
        assert_eq!(form_text(&json!("abc")), "abc");
        assert_eq!(form_text(&json!(true)), "true");
        assert_eq!(form_text(&json!(3)), "3");
        assert_eq!(form_text(&Value::Null), "");
    }

    #[test]
    fn bad_content_type_is_rejected() {
        let attachment = Attachment::new("a.txt", b"hi".to_vec()).with_content_type("not a mime");
        assert!(file_part(&attachment).is_err());
    }
}
