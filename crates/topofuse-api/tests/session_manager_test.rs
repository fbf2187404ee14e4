#![allow(clippy::unwrap_used)]
// Integration tests for `SessionManager` using wiremock and the firewall handshake.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use topofuse_api::{
    Credential, CredentialSecret, Error, FileSessionStore, FirewallAuth, FirewallClient,
    MemorySessionStore, Session, SessionManager, SessionState, SessionStore, SessionTuple, Vendor,
};

// ── Helpers ─────────────────────────────────────────────────────────

const COOKIE: &str = "APSCOOKIE_3310=store-session";

fn credential(server: &MockServer) -> Credential {
    Credential::new(
        Vendor::FirewallController,
        Url::parse(&server.uri()).unwrap(),
        "api-admin",
        CredentialSecret::Password("hunter2".to_string().into()),
    )
}

fn manager<S: SessionStore>(store: Arc<S>) -> SessionManager<FirewallAuth, S> {
    SessionManager::with_client(
        reqwest::Client::new(),
        Duration::from_secs(5),
        FirewallAuth::new(),
        store,
    )
}

fn login_ok() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("set-cookie", format!("{COOKIE}; Path=/; HttpOnly").as_str())
        .set_body_string("1")
}

async fn mount_login(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/logincheck"))
        .respond_with(login_ok())
        .expect(expected)
        .named("login")
        .mount(server)
        .await;
}

fn status_body() -> serde_json::Value {
    json!({
        "http_method": "GET",
        "status": "success",
        "http_status": 200,
        "serial": "FGT60F0000000001",
        "version": "v7.4.3",
        "results": { "hostname": "store-042-fw", "model_name": "FortiGate" }
    })
}

/// Store whose backend is unreachable.
struct UnreachableStore;

impl SessionStore for UnreachableStore {
    async fn load(&self, _tuple: &SessionTuple) -> Result<Option<Session>, Error> {
        Err(Error::SessionStore("connection refused".into()))
    }

    async fn put(&self, _session: Session) -> Result<(), Error> {
        Err(Error::SessionStore("connection refused".into()))
    }

    async fn put_if_absent_or_expired(
        &self,
        _session: Session,
        _now: DateTime<Utc>,
    ) -> Result<Session, Error> {
        Err(Error::SessionStore("connection refused".into()))
    }

    async fn delete(&self, _tuple: &SessionTuple) -> Result<(), Error> {
        Err(Error::SessionStore("connection refused".into()))
    }

    async fn delete_if_key(&self, _tuple: &SessionTuple, _key: &str) -> Result<bool, Error> {
        Err(Error::SessionStore("connection refused".into()))
    }
}

// ── Key acquisition ─────────────────────────────────────────────────

#[tokio::test]
async fn test_second_acquire_hits_cache() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    let mgr = manager(Arc::new(MemorySessionStore::new()));
    let cred = credential(&server);

    let first = mgr.acquire_session_key(&cred).await.unwrap();
    let second = mgr.acquire_session_key(&cred).await.unwrap();

    assert_eq!(first, COOKIE);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_expired_session_triggers_one_new_login() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;

    let mgr = manager(Arc::new(MemorySessionStore::new())).with_ttl(Duration::from_millis(50));
    let cred = credential(&server);

    mgr.acquire_session_key(&cred).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(mgr.session_state(&cred).await, SessionState::Expired);

    mgr.acquire_session_key(&cred).await.unwrap();
    mgr.acquire_session_key(&cred).await.unwrap();
    assert_eq!(mgr.session_state(&cred).await, SessionState::Live);
}

#[tokio::test]
async fn test_concurrent_acquires_share_one_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logincheck"))
        .respond_with(login_ok().set_delay(Duration::from_millis(150)))
        .expect(1)
        .mount(&server)
        .await;

    let mgr = Arc::new(manager(Arc::new(MemorySessionStore::new())));
    let cred = credential(&server);

    let keys = join_all((0..8).map(|_| {
        let mgr = Arc::clone(&mgr);
        let cred = cred.clone();
        tokio::spawn(async move { mgr.acquire_session_key(&cred).await })
    }))
    .await;

    for key in keys {
        assert_eq!(key.unwrap().unwrap(), COOKIE);
    }
}

#[tokio::test]
async fn test_rejected_login_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logincheck"))
        .respond_with(ResponseTemplate::new(200).set_body_string("0"))
        .mount(&server)
        .await;

    let mgr = manager(Arc::new(MemorySessionStore::new()));
    let result = mgr.acquire_session_key(&credential(&server)).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_token_credential_is_refused_by_firewall() {
    let server = MockServer::start().await;
    let mut cred = credential(&server);
    cred.secret = CredentialSecret::Token("static".to_string().into());

    let mgr = manager(Arc::new(MemorySessionStore::new()));
    let result = mgr.acquire_session_key(&cred).await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

// ── Re-authentication ───────────────────────────────────────────────

#[tokio::test]
async fn test_401_reauthenticates_once_and_succeeds() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/api/v2/monitor/system/status"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .named("stale session")
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/monitor/system/status"))
        .and(header("cookie", COOKIE))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body()))
        .expect(1)
        .named("fresh session")
        .mount(&server)
        .await;

    let mgr = Arc::new(manager(Arc::new(MemorySessionStore::new())));
    let client = FirewallClient::new(Arc::clone(&mgr), credential(&server));

    let status = client.system_status().await.unwrap();
    assert_eq!(
        status.first_str(&["hostname"]).as_deref(),
        Some("store-042-fw")
    );
    assert_eq!(mgr.session_state(client.credential()).await, SessionState::Live);
}

#[tokio::test]
async fn test_second_401_is_terminal_after_two_logins() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/api/v2/monitor/system/status"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let mgr = Arc::new(manager(Arc::new(MemorySessionStore::new())));
    let client = FirewallClient::new(Arc::clone(&mgr), credential(&server));

    let result = client.system_status().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert_eq!(
        mgr.session_state(client.credential()).await,
        SessionState::Invalidated
    );
}

// ── Store behaviour ─────────────────────────────────────────────────

#[tokio::test]
async fn test_unreachable_store_fails_closed() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;

    let mgr = manager(Arc::new(UnreachableStore));
    let cred = credential(&server);

    // No cached session can be trusted, so every acquisition logs in.
    assert_eq!(mgr.acquire_session_key(&cred).await.unwrap(), COOKIE);
    assert_eq!(mgr.acquire_session_key(&cred).await.unwrap(), COOKIE);
}

#[tokio::test]
async fn test_instances_sharing_a_file_store_reuse_the_session() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let first = manager(Arc::new(FileSessionStore::open(dir.path()).unwrap()));
    let second = manager(Arc::new(FileSessionStore::open(dir.path()).unwrap()));
    let cred = credential(&server);

    let a = first.acquire_session_key(&cred).await.unwrap();
    let b = second.acquire_session_key(&cred).await.unwrap();
    assert_eq!(a, b);
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_state_transitions_through_logout() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .and(header("cookie", COOKIE))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let mgr = manager(Arc::clone(&store));
    let cred = credential(&server);

    assert_eq!(mgr.session_state(&cred).await, SessionState::Absent);
    mgr.acquire_session_key(&cred).await.unwrap();
    assert_eq!(mgr.session_state(&cred).await, SessionState::Live);
    assert_eq!(store.len(), 1);

    mgr.logout(&cred).await.unwrap();
    assert_eq!(mgr.session_state(&cred).await, SessionState::Absent);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_invalidate_marks_tuple() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    let mgr = manager(Arc::new(MemorySessionStore::new()));
    let cred = credential(&server);

    mgr.acquire_session_key(&cred).await.unwrap();
    mgr.invalidate(&cred).await;
    assert_eq!(mgr.session_state(&cred).await, SessionState::Invalidated);
}
