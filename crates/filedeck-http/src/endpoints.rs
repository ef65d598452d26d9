//! REST endpoint paths and request/response types.

use serde::{Deserialize, Serialize};

use filedeck_core::Record;
use filedeck_core::types::{CollectionName, RecordId};

/// Largest page the list endpoint serves.
pub const PER_PAGE: u32 = 500;

/// Realtime SSE endpoint.
pub const REALTIME: &str = "realtime";

/// Name of the first event on a realtime connection.
pub const CONNECT_EVENT: &str = "PB_CONNECT";

pub fn auth_with_password(collection: &CollectionName) -> String {
    format!("collections/{}/auth-with-password", collection)
}

pub fn records(collection: &CollectionName) -> String {
    format!("collections/{}/records", collection)
}

pub fn record(collection: &CollectionName, id: &RecordId) -> String {
    format!("collections/{}/records/{}", collection, id)
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for auth-with-password.
#[derive(Debug, Serialize)]
pub struct AuthWithPasswordRequest<'a> {
    pub identity: &'a str,
    pub password: &'a str,
}

/// Response from auth-with-password.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub record: Record,
}

/// Query parameters for the list endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams<'a> {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<&'a str>,
}

/// One page of records.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    #[allow(dead_code)]
    pub page: u32,
    #[allow(dead_code)]
    pub per_page: u32,
    #[serde(default)]
    pub total_items: i64,
    #[serde(default)]
    pub total_pages: i64,
    pub items: Vec<Record>,
}

/// Payload of the realtime connect event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectEvent {
    pub client_id: String,
}

/// Request body setting a realtime client's topics.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSubscriptionsRequest<'a> {
    pub client_id: &'a str,
    pub subscriptions: Vec<String>,
}

/// Error response format.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[allow(dead_code)]
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}
