#![allow(clippy::unwrap_used)]
// Integration tests for `SwitchClient` using wiremock.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use topofuse_api::{
    Credential, CredentialSecret, Error, MemorySessionStore, SessionManager, SwitchAuth,
    SwitchClient, Vendor,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn client(server: &MockServer, secret: CredentialSecret) -> SwitchClient<MemorySessionStore> {
    let credential = Credential::new(
        Vendor::DirectSwitch,
        Url::parse(&server.uri()).unwrap(),
        "admin",
        secret,
    );
    let sessions = SessionManager::with_client(
        reqwest::Client::new(),
        Duration::from_secs(5),
        SwitchAuth,
        Arc::new(MemorySessionStore::new()),
    );
    SwitchClient::new(Arc::new(sessions), credential)
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_static_token_is_sent_without_login() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/login"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/system"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hostname": "idf-sw-2",
            "serial_number": "SG12345678",
            "firmware_version": "16.11.0010"
        })))
        .mount(&server)
        .await;

    let client = client(&server, CredentialSecret::Token("tok-123".to_string().into()));
    let system = client.system().await.unwrap();
    assert_eq!(
        system.first_str(&["serial_number"]).as_deref(),
        Some("SG12345678")
    );
}

#[tokio::test]
async fn test_password_login_uses_basic_auth_and_issues_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/login"))
        .and(header_exists("authorization"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "token": "sess-9", "expires_in": 600 })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/lldp/neighbors"))
        .and(header("authorization", "Bearer sess-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "neighbors": [
                { "local_port": "1/1/48", "chassis_id": "00:09:0f:aa:bb:cc", "system_name": "store-042-fw" }
            ]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server, CredentialSecret::Password("pw".to_string().into()));
    let first = client.lldp_neighbors().await.unwrap();
    let second = client.lldp_neighbors().await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_bad_password_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid credentials" })),
        )
        .mount(&server)
        .await;

    let client = client(&server, CredentialSecret::Password("nope".to_string().into()));
    let result = client.interfaces().await;
    assert!(
        matches!(result, Err(Error::Authentication { ref message }) if message.contains("invalid credentials")),
        "expected Authentication error, got: {result:?}"
    );
}

// ── Errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_json_error_body_becomes_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/interfaces"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "message": "stack member rebooting" })),
        )
        .mount(&server)
        .await;

    let client = client(&server, CredentialSecret::Token("t".to_string().into()));
    match client.interfaces().await {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "stack member rebooting");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}
