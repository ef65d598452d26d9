//! Mock backend tests for filedeck-http.
//!
//! These tests use wiremock to simulate the REST and realtime API and test
//! the backend's behavior without network access or a real server.

use std::sync::Arc;
use std::time::Duration;

use filedeck_core::{
    Attachment, Backend, BackendUrl, ChangeAction, CollectionName, Credentials, Error, FileRecord,
    ListQuery, LiveView, RecordFields, RecordId, Session, Topic, ViewOptions,
};
use filedeck_http::{HttpBackend, HttpSession};
use futures_util::StreamExt;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a backend URL from a mock server.
fn mock_url(server: &MockServer) -> BackendUrl {
    BackendUrl::new(format!("http://127.0.0.1:{}", server.address().port())).unwrap()
}

fn user_record() -> Value {
    json!({
        "id": "u1",
        "collectionId": "_pb_users_auth_",
        "collectionName": "users",
        "username": "ana",
        "email": "ana@example.com",
        "name": "Ana",
        "created": "2024-05-01 10:00:00.000Z",
        "updated": "2024-05-01 10:00:00.000Z"
    })
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/collections/users/auth-with-password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "test-token",
            "record": user_record()
        })))
        .mount(server)
        .await;
}

async fn login(server: &MockServer) -> HttpSession {
    mount_login(server).await;
    let backend = HttpBackend::new(mock_url(server)).unwrap();
    backend
        .authenticate(&CollectionName::users(), Credentials::new("ana", "secret123"))
        .await
        .unwrap()
}

fn file(id: &str) -> Value {
    json!({
        "id": id,
        "collectionId": "pbc_files",
        "collectionName": "files",
        "name": format!("{}.pdf", id),
        "field": format!("{}_x.pdf", id),
        "owner": "u1",
        "shared": ["u1"],
        "created": "2024-05-01 10:00:00.000Z",
        "updated": "2024-05-01 10:00:00.000Z"
    })
}

fn page(items: Vec<Value>, page: u32, total_pages: u32, total_items: usize) -> Value {
    json!({
        "page": page,
        "perPage": 500,
        "totalItems": total_items,
        "totalPages": total_pages,
        "items": items
    })
}

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
async fn test_login_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/collections/users/auth-with-password"))
        .and(body_json(json!({
            "identity": "ana",
            "password": "secret123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "test-token",
            "record": user_record()
        })))
        .mount(&server)
        .await;

    let backend = HttpBackend::new(mock_url(&server)).unwrap();
    let session = backend
        .authenticate(&CollectionName::users(), Credentials::new("ana", "secret123"))
        .await
        .unwrap();

    assert_eq!(session.user().id.as_str(), "u1");
    assert_eq!(session.user().get_str("username"), Some("ana"));
    assert_eq!(session.token().as_str(), "test-token");
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/collections/users/auth-with-password"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400,
            "message": "Failed to authenticate.",
            "data": {}
        })))
        .mount(&server)
        .await;

    let backend = HttpBackend::new(mock_url(&server)).unwrap();
    let result = backend
        .authenticate(&CollectionName::users(), Credentials::new("ana", "wrong"))
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
    assert!(err.to_string().contains("Failed to authenticate."));
}

#[tokio::test]
async fn test_restore_uses_persisted_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/collections/roles/records/r1"))
        .and(header("authorization", "persisted-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "r1",
            "name": "Admin",
            "description": ""
        })))
        .mount(&server)
        .await;

    let backend = HttpBackend::new(mock_url(&server)).unwrap();
    let user = serde_json::from_value(user_record()).unwrap();
    let session = backend
        .restore(
            &CollectionName::users(),
            filedeck_core::AuthToken::new("persisted-token"),
            user,
        )
        .await
        .unwrap();

    let role = session
        .get_one(&CollectionName::roles(), &RecordId::new("r1").unwrap())
        .await
        .unwrap();
    assert_eq!(role.name(), Some("Admin"));
}

// ============================================================================
// Record Tests
// ============================================================================

#[tokio::test]
async fn test_full_list_fetches_every_page() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    let first: Vec<Value> = (0..500).map(|i| file(&format!("f{}", i))).collect();
    let second: Vec<Value> = (500..503).map(|i| file(&format!("f{}", i))).collect();

    Mock::given(method("GET"))
        .and(path("/api/collections/files/records"))
        .and(query_param("page", "1"))
        .and(query_param("perPage", "500"))
        .and(query_param("sort", "-created"))
        .and(header("authorization", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(first, 1, 2, 503)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/collections/files/records"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(second, 2, 2, 503)))
        .expect(1)
        .mount(&server)
        .await;

    let records = session
        .get_full_list(&CollectionName::files(), &ListQuery::new().sort("-created"))
        .await
        .unwrap();

    assert_eq!(records.len(), 503);
    assert_eq!(records[502].id.as_str(), "f502");
}

#[tokio::test]
async fn test_short_page_stops_paging() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/collections/files/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![file("a")], 1, 1, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let records = session
        .get_full_list(&CollectionName::files(), &ListQuery::new())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_first_matching_none_is_not_found() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/collections/folders/records"))
        .and(query_param("perPage", "1"))
        .and(query_param("filter", "name = \"Docs\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "perPage": 1,
            "totalItems": 0,
            "totalPages": 0,
            "items": []
        })))
        .mount(&server)
        .await;

    let err = session
        .find_by(&CollectionName::folders(), "name", "Docs")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("Docs"));
}

#[tokio::test]
async fn test_validation_error_lists_fields() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/collections/roles/records"))
        .and(body_json(json!({ "name": "" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400,
            "message": "Failed to create record.",
            "data": { "name": { "code": "validation_required", "message": "Missing required value." } }
        })))
        .mount(&server)
        .await;

    let fields = RecordFields::new().set("name", "");
    let err = session
        .create(&CollectionName::roles(), &fields)
        .await
        .unwrap_err();

    match err {
        Error::Protocol(p) => {
            assert_eq!(p.status, 400);
            assert!(p.to_string().contains("fields: name"));
        }
        other => panic!("expected protocol error, got {other}"),
    }
}

#[tokio::test]
async fn test_create_with_attachment_is_multipart() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/collections/files/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file("new1")))
        .mount(&server)
        .await;

    let fields = RecordFields::new()
        .set("name", "report")
        .set("owner", "u1")
        .set("shared", json!(["u1", "u2"]))
        .attach(
            "field",
            Attachment::new("report.pdf", b"%PDF-1.4".to_vec()).with_content_type("application/pdf"),
        );

    let record = session
        .create(&CollectionName::files(), &fields)
        .await
        .unwrap();
    assert_eq!(record.id.as_str(), "new1");

    let requests = server.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.url.path() == "/api/collections/files/records")
        .unwrap();
    let content_type = upload.headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data"));

    let body = String::from_utf8_lossy(&upload.body);
    assert!(body.contains("filename=\"report.pdf\""));
    assert!(body.contains("%PDF-1.4"));
    assert_eq!(body.matches("name=\"shared\"").count(), 2);
}

#[tokio::test]
async fn test_update_of_self_refreshes_user() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    let mut updated = user_record();
    updated["name"] = json!("Ana María");

    Mock::given(method("PATCH"))
        .and(path("/api/collections/users/records/u1"))
        .and(body_json(json!({ "name": "Ana María" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .mount(&server)
        .await;

    session
        .update(
            &CollectionName::users(),
            &RecordId::new("u1").unwrap(),
            &RecordFields::new().set("name", "Ana María"),
        )
        .await
        .unwrap();

    assert_eq!(session.user().get_str("name"), Some("Ana María"));
}

#[tokio::test]
async fn test_delete_missing_record() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/api/collections/files/records/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": 404,
            "message": "The requested resource wasn't found.",
            "data": {}
        })))
        .mount(&server)
        .await;

    let err = session
        .delete(&CollectionName::files(), &RecordId::new("gone").unwrap())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_file_url_carries_token() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    let record = serde_json::from_value(file("f1")).unwrap();
    let url = session.file_url(&record, "f1_x.pdf").unwrap();

    assert_eq!(url.path(), "/api/files/pbc_files/f1/f1_x.pdf");
    assert_eq!(url.query(), Some("token=test-token"));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let url = BackendUrl::new("http://127.0.0.1:9").unwrap();
    let backend = HttpBackend::new(url).unwrap();
    let err = backend
        .authenticate(&CollectionName::users(), Credentials::new("a", "b"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}

// ============================================================================
// Realtime Tests
// ============================================================================

fn sse_body(events: &[(&str, Value)]) -> String {
    events
        .iter()
        .map(|(name, data)| format!("event:{}\ndata:{}\n\n", name, data))
        .collect()
}

async fn mount_realtime(server: &MockServer, topic: &str, events: Vec<(&str, Value)>) {
    let mut all = vec![("PB_CONNECT", json!({ "clientId": "client-1" }))];
    all.extend(events);

    Mock::given(method("GET"))
        .and(path("/api/realtime"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(&all), "text/event-stream"),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/realtime"))
        .and(header("authorization", "test-token"))
        .and(body_json(json!({
            "clientId": "client-1",
            "subscriptions": [topic]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_subscribe_yields_topic_events() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    mount_realtime(
        &server,
        "files/*",
        vec![
            ("folders/*", json!({ "action": "create", "record": { "id": "d1" } })),
            ("files/*", json!({ "action": "create", "record": file("f1") })),
            ("files/*", json!({ "action": "delete", "record": { "id": "f0" } })),
        ],
    )
    .await;

    let topic: Topic = "files/*".parse().unwrap();
    let mut stream = session.subscribe(&topic).await.unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.action, ChangeAction::Create);
    assert_eq!(first.id().as_str(), "f1");

    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(second.action, ChangeAction::Delete);
    assert_eq!(second.id().as_str(), "f0");

    // The mock closes the body after the last event.
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_malformed_event_is_reported() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    mount_realtime(
        &server,
        "files/*",
        vec![("files/*", json!({ "action": "rename", "record": { "id": "f1" } }))],
    )
    .await;

    let topic: Topic = "files/*".parse().unwrap();
    let mut stream = session.subscribe(&topic).await.unwrap();

    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Subscription(_)));
}

#[tokio::test]
async fn test_handshake_requires_connect_event() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/realtime"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[("files/*", json!({}))]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let err = session
        .subscribe(&"files/*".parse().unwrap())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("handshake"));
}

#[tokio::test]
async fn test_unsubscribe_releases_topic() {
    let server = MockServer::start().await;
    let session = login(&server).await;
    mount_realtime(&server, "files/*", vec![]).await;

    let topic: Topic = "files/*".parse().unwrap();
    let _stream = session.subscribe(&topic).await.unwrap();

    session.unsubscribe(&topic).await.unwrap();
    assert_eq!(session.subscriptions().active(&topic), 0);
}

#[tokio::test]
async fn test_live_view_applies_realtime_changes() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/collections/files/records"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![file("f0")], 1, 1, 1)),
        )
        .mount(&server)
        .await;

    mount_realtime(
        &server,
        "files/*",
        vec![("files/*", json!({ "action": "create", "record": file("f1") }))],
    )
    .await;

    let mut view: LiveView<FileRecord> =
        LiveView::activate(Arc::new(session), CollectionName::files(), ViewOptions::new());

    let snapshot = tokio::time::timeout(
        Duration::from_secs(5),
        view.wait_for(|s| s.items.len() == 2),
    )
    .await
    .unwrap()
    .unwrap();

    let ids: Vec<&str> = snapshot.items.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, ["f1", "f0"]);

    view.deactivate().await;
}
