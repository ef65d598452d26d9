//! CLI integration tests against a hosted backend.
//!
//! These tests are opt-in and require environment variables to be set:
//! - FILEDECK_TEST_URL: Backend URL
//! - FILEDECK_TEST_IDENTITY: Test account username or email
//! - FILEDECK_TEST_PASSWORD: Test account password
//!
//! Tests are skipped if these variables are not set. Anything they create
//! is deleted again before the test returns.

mod common;

use common::{Sandbox, json_lines, live_settings};

fn live_sandbox() -> Option<Sandbox> {
    let (url, identity, password) = live_settings()?;
    let mut sandbox = Sandbox::new();
    sandbox.url = url;
    sandbox.run_ok(&["login", "--identity", &identity, "--password", &password]);
    Some(sandbox)
}

#[test]
fn test_login_and_whoami() {
    let Some(sandbox) = live_sandbox() else {
        eprintln!("Skipping test_login_and_whoami: FILEDECK_TEST_* not set");
        return;
    };

    let stdout = sandbox.run_ok(&["whoami"]);
    assert!(stdout.contains("Id:"), "got: {}", stdout);
    assert!(stdout.contains("Backend:"));
}

#[test]
fn test_files_list() {
    let Some(sandbox) = live_sandbox() else {
        eprintln!("Skipping test_files_list: credentials not set");
        return;
    };

    let stdout = sandbox.run_ok(&["files", "list", "--json"]);
    for entry in json_lines(&stdout) {
        assert!(entry["id"].is_string());
    }
}

#[test]
fn test_upload_and_delete() {
    let Some(sandbox) = live_sandbox() else {
        eprintln!("Skipping test_upload_and_delete: credentials not set");
        return;
    };

    let upload = sandbox.path().join("filedeck-test.txt");
    std::fs::write(&upload, "integration test upload").unwrap();

    let stdout = sandbox.run_ok(&["files", "upload", upload.to_str().unwrap()]);
    let id = Sandbox::printed_id(&stdout);

    let stdout = sandbox.run_ok(&["files", "link", &id]);
    assert!(stdout.trim().starts_with("http"), "got: {}", stdout);

    sandbox.run_ok(&["files", "delete", &id]);
    sandbox.run_err(&["files", "get", &id]);
}

#[test]
fn test_logout() {
    let Some(sandbox) = live_sandbox() else {
        eprintln!("Skipping test_logout: credentials not set");
        return;
    };

    sandbox.run_ok(&["logout"]);
    let stderr = sandbox.run_err(&["whoami"]);
    assert!(stderr.contains("No active session"));
}
