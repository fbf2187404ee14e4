// Vendor session manager
//
// Owns login, key caching, expiry, and the bounded re-authentication path
// for one vendor. The vendor-specific handshake lives behind
// `Authenticator`; everything else is shared.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::{DashMap, DashSet};
use reqwest::{RequestBuilder, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::store::{SessionBackend, SessionStore};
use super::{DEFAULT_SESSION_TTL, Session, SessionState};
use crate::auth::{Credential, SessionTuple, Vendor};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Result of a successful vendor login.
#[derive(Clone)]
pub struct LoginGrant {
    /// Opaque key attached to later requests.
    pub key: String,
    /// Lifetime reported by the vendor, if any. Overrides the configured TTL.
    pub ttl: Option<Duration>,
}

impl LoginGrant {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ttl: None,
        }
    }
}

impl std::fmt::Debug for LoginGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginGrant")
            .field("key", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Vendor-specific half of session handling.
pub trait Authenticator: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// Perform the login handshake and extract the session key.
    ///
    /// `timeout` is the client's request timeout, reported when a send times out.
    fn login(
        &self,
        http: &reqwest::Client,
        timeout: Duration,
        credential: &Credential,
    ) -> impl Future<Output = Result<LoginGrant, Error>> + Send;

    /// Attach `key` the way the vendor expects (cookie or bearer header).
    fn attach(&self, request: RequestBuilder, key: &str) -> RequestBuilder;

    /// End the session on the vendor side.
    fn logout(
        &self,
        http: &reqwest::Client,
        timeout: Duration,
        credential: &Credential,
        key: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Where a call stands in its re-authentication budget.
///
/// A 401 moves `Initial` to `Reauthenticated`; a 401 in `Reauthenticated`
/// has no successor, so the retry-once rule lives in the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAttempt {
    Initial,
    Reauthenticated,
}

impl AuthAttempt {
    /// Transition taken after a 401. `None` means the budget is spent.
    pub fn after_unauthorized(self) -> Option<Self> {
        match self {
            Self::Initial => Some(Self::Reauthenticated),
            Self::Reauthenticated => None,
        }
    }
}

/// Session lifecycle for one vendor.
///
/// Construct once per process and share via `Arc`. Concurrent callers for
/// the same `(vendor, host, user)` tuple coalesce onto a single login.
pub struct SessionManager<A, S = SessionBackend> {
    http: reqwest::Client,
    timeout: Duration,
    authenticator: A,
    store: Arc<S>,
    ttl: Duration,
    /// One async mutex per tuple, held across the `Absent → Authenticating` transition.
    login_locks: DashMap<SessionTuple, Arc<Mutex<()>>>,
    /// Tuples whose last session was rejected with a 401 and not yet replaced.
    invalidated: DashSet<SessionTuple>,
}

impl<A: Authenticator, S: SessionStore> SessionManager<A, S> {
    /// Build a manager with its own HTTP client.
    pub fn new(authenticator: A, store: Arc<S>, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, transport.timeout, authenticator, store))
    }

    /// Build a manager around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        timeout: Duration,
        authenticator: A,
        store: Arc<S>,
    ) -> Self {
        Self {
            http,
            timeout,
            authenticator,
            store,
            ttl: DEFAULT_SESSION_TTL,
            login_locks: DashMap::new(),
            invalidated: DashSet::new(),
        }
    }

    /// Override the session lifetime used when the vendor reports none.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn vendor(&self) -> Vendor {
        self.authenticator.vendor()
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // ── Key acquisition ──────────────────────────────────────────────

    /// Return a live session key, logging in only if none is cached.
    pub async fn acquire_session_key(&self, credential: &Credential) -> Result<String, Error> {
        let tuple = credential.session_tuple();

        if let Some(session) = self.cached(&tuple).await {
            debug!(tuple = %tuple, "session cache hit");
            return Ok(session.key);
        }

        let lock = self.login_lock(&tuple);
        let _guard = lock.lock().await;

        // Another caller may have finished logging in while we waited.
        if let Some(session) = self.cached(&tuple).await {
            debug!(tuple = %tuple, "session established by concurrent caller");
            return Ok(session.key);
        }

        info!(vendor = %tuple.vendor, host = %tuple.host, user = %tuple.username, "logging in");
        let grant = self.authenticator.login(&self.http, self.timeout, credential).await?;

        let now = Utc::now();
        let session = Session::issue(&tuple, grant.key, now, grant.ttl.unwrap_or(self.ttl));
        let winner = match self
            .store
            .put_if_absent_or_expired(session.clone(), now)
            .await
        {
            Ok(winner) => {
                if winner.key != session.key {
                    debug!(tuple = %tuple, "another instance stored a live session first, adopting it");
                }
                winner
            }
            Err(e) => {
                warn!(tuple = %tuple, error = %e, "session store write failed, using unpersisted session");
                session
            }
        };

        self.invalidated.remove(&tuple);
        Ok(winner.key)
    }

    /// Drop whatever session is cached for `credential`.
    pub async fn invalidate(&self, credential: &Credential) {
        let tuple = credential.session_tuple();
        if let Err(e) = self.store.delete(&tuple).await {
            warn!(tuple = %tuple, error = %e, "failed to delete session");
        }
        self.invalidated.insert(tuple);
    }

    async fn invalidate_key(&self, tuple: &SessionTuple, key: &str) {
        match self.store.delete_if_key(tuple, key).await {
            Ok(removed) => debug!(tuple = %tuple, removed, "invalidated rejected session"),
            Err(e) => warn!(tuple = %tuple, error = %e, "failed to invalidate session"),
        }
        self.invalidated.insert(tuple.clone());
    }

    // ── Authenticated calls ──────────────────────────────────────────

    /// Send one request with a session key, re-authenticating once on 401.
    ///
    /// `build` is invoked for each attempt so the request can be re-issued.
    /// Transport failures are returned as-is and never retried here.
    pub async fn execute_authenticated<F>(
        &self,
        credential: &Credential,
        build: F,
    ) -> Result<reqwest::Response, Error>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder + Send + Sync,
    {
        let tuple = credential.session_tuple();
        let mut attempt = AuthAttempt::Initial;

        loop {
            let key = self.acquire_session_key(credential).await?;
            let request = self.authenticator.attach(build(&self.http), &key);
            let resp = request
                .send()
                .await
                .map_err(|e| Error::from_send(e, self.timeout))?;

            if resp.status() != StatusCode::UNAUTHORIZED {
                return Ok(resp);
            }

            self.invalidate_key(&tuple, &key).await;

            match attempt.after_unauthorized() {
                Some(next) => {
                    info!(tuple = %tuple, "session rejected, re-authenticating");
                    attempt = next;
                }
                None => {
                    return Err(Error::Authentication {
                        message: format!(
                            "{} rejected the session again after re-authentication",
                            tuple.host
                        ),
                    });
                }
            }
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// End the vendor session (best effort) and forget it locally.
    pub async fn logout(&self, credential: &Credential) -> Result<(), Error> {
        let tuple = credential.session_tuple();

        if let Some(session) = self.cached(&tuple).await {
            if let Err(e) = self
                .authenticator
                .logout(&self.http, self.timeout, credential, &session.key)
                .await
            {
                warn!(tuple = %tuple, error = %e, "vendor logout failed");
            }
        }

        self.store.delete(&tuple).await?;
        self.invalidated.remove(&tuple);
        info!(tuple = %tuple, "logged out");
        Ok(())
    }

    /// Current lifecycle state for `credential`'s tuple.
    pub async fn session_state(&self, credential: &Credential) -> SessionState {
        let tuple = credential.session_tuple();

        let in_flight = self
            .login_locks
            .get(&tuple)
            .is_some_and(|lock| lock.try_lock().is_err());
        if in_flight {
            return SessionState::Authenticating;
        }

        match self.store.load(&tuple).await {
            Ok(Some(session)) if session.is_live_at(Utc::now()) => SessionState::Live,
            Ok(Some(_)) => SessionState::Expired,
            Ok(None) if self.invalidated.contains(&tuple) => SessionState::Invalidated,
            Ok(None) => SessionState::Absent,
            Err(e) => {
                warn!(tuple = %tuple, error = %e, "session store unreadable");
                SessionState::Absent
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Live cached session. Store failures fail closed: treated as absent.
    async fn cached(&self, tuple: &SessionTuple) -> Option<Session> {
        match self.store.get(tuple, Utc::now()).await {
            Ok(session) => session,
            Err(e) => {
                warn!(tuple = %tuple, error = %e, "session store unreadable, forcing fresh login");
                None
            }
        }
    }

    fn login_lock(&self, tuple: &SessionTuple) -> Arc<Mutex<()>> {
        self.login_locks
            .entry(tuple.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::AuthAttempt;

    #[test]
    fn retry_budget_allows_exactly_one_reauthentication() {
        let next = AuthAttempt::Initial.after_unauthorized();
        assert_eq!(next, Some(AuthAttempt::Reauthenticated));
        assert_eq!(AuthAttempt::Reauthenticated.after_unauthorized(), None);
    }
}
