//! Error types for filedeck.
//!
//! One error enum covers every backend, with explicit variants for
//! transport, authentication, protocol, input validation and realtime
//! subscription failures.

use std::fmt;
use thiserror::Error;

/// The unified error type for filedeck operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network or filesystem transport errors.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (invalid credentials, missing session).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Errors reported by the backend (non-success responses).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors (ids, collection names, URLs, filters).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Realtime subscription errors.
    #[error("subscription error: {0}")]
    Subscription(#[from] SubscriptionError),
}

impl Error {
    /// Returns true if the backend reported that the record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Protocol(p) if p.status == 404)
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// Local filesystem error.
    #[error("IO error: {message}")]
    Io { message: String },
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid credentials or token.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The backend rejected the stored token.
    #[error("session expired")]
    SessionExpired,
}

/// An error reported by the backend.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code (or the equivalent for local backends).
    pub status: u16,
    /// Error message from the backend.
    pub message: Option<String>,
    /// Per-field validation details, if any.
    pub data: Option<serde_json::Value>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        if let Some(fields) = self.data.as_ref().and_then(|d| d.as_object())
            && !fields.is_empty()
        {
            let names: Vec<&str> = fields.keys().map(|k| k.as_str()).collect();
            write!(f, " (fields: {})", names.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, message: Option<String>) -> Self {
        Self {
            status,
            message,
            data: None,
        }
    }

    /// Attach per-field validation details.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// A 404 for the given resource description.
    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::new(404, Some(format!("{} not found", what)))
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid record id.
    #[error("invalid record id '{value}': {reason}")]
    RecordId { value: String, reason: String },

    /// Invalid collection name.
    #[error("invalid collection name '{value}': {reason}")]
    Collection { value: String, reason: String },

    /// Invalid backend URL.
    #[error("invalid backend URL '{value}': {reason}")]
    BackendUrl { value: String, reason: String },

    /// Invalid timestamp.
    #[error("invalid timestamp '{value}': {reason}")]
    Timestamp { value: String, reason: String },

    /// Invalid subscription topic.
    #[error("invalid topic '{value}': {reason}")]
    Topic { value: String, reason: String },

    /// Invalid filter expression.
    #[error("invalid filter '{value}': {reason}")]
    Filter { value: String, reason: String },

    /// A record did not have the expected shape.
    #[error("malformed {kind} record: {reason}")]
    Record { kind: &'static str, reason: String },

    /// Generic invalid input.
    #[error("{message}")]
    Other { message: String },
}

impl InvalidInputError {
    /// Shorthand for [`InvalidInputError::Other`].
    pub fn other(message: impl Into<String>) -> Self {
        InvalidInputError::Other {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(InvalidInputError::other(format!("JSON error: {}", err)))
    }
}

/// Realtime subscription errors.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The realtime handshake did not complete.
    #[error("handshake failed: {message}")]
    Handshake { message: String },

    /// The event stream broke.
    #[error("stream interrupted: {message}")]
    Stream { message: String },

    /// An event could not be decoded.
    #[error("malformed event '{event}': {reason}")]
    MalformedEvent { event: String, reason: String },
}
