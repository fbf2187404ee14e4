// Vendor session lifecycle
//
// A `Session` is created by a successful login, persisted through a
// `SessionStore`, and handed out by a `SessionManager` until it expires,
// is rejected with a 401, or is logged out.

pub mod manager;
pub mod store;

use std::fmt;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{SessionTuple, Vendor};

pub use manager::{AuthAttempt, Authenticator, LoginGrant, SessionManager};
pub use store::{FileSessionStore, MemorySessionStore, SessionBackend, SessionStore};

/// Default session lifetime when the vendor does not report one.
pub const DEFAULT_SESSION_TTL: std::time::Duration = std::time::Duration::from_secs(30 * 60);

/// A live (or once-live) vendor session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub vendor: Vendor,
    pub host: String,
    pub username: String,
    pub key: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session for `tuple` issued at `now` and valid for `ttl`.
    pub fn issue(
        tuple: &SessionTuple,
        key: String,
        now: DateTime<Utc>,
        ttl: std::time::Duration,
    ) -> Self {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX);
        Self {
            vendor: tuple.vendor,
            host: tuple.host.clone(),
            username: tuple.username.clone(),
            key,
            issued_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn tuple(&self) -> SessionTuple {
        SessionTuple::new(self.vendor, self.host.clone(), self.username.clone())
    }

    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("vendor", &self.vendor)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("key", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Observable lifecycle state of one session tuple.
///
/// `Absent → Authenticating → Live → (Expired | Invalidated) → Absent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SessionState {
    Absent,
    Authenticating,
    Live,
    Expired,
    Invalidated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_key() {
        let tuple = SessionTuple::new(Vendor::FirewallController, "https://fw", "api");
        let s = Session::issue(
            &tuple,
            "APSCOOKIE_1=secret".into(),
            Utc::now(),
            DEFAULT_SESSION_TTL,
        );
        let printed = format!("{s:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn liveness_respects_expiry() {
        let tuple = SessionTuple::new(Vendor::DirectSwitch, "https://sw", "admin");
        let now = Utc::now();
        let s = Session::issue(&tuple, "k".into(), now, std::time::Duration::from_secs(60));
        assert!(s.is_live_at(now));
        assert!(!s.is_live_at(now + ChronoDuration::seconds(61)));
    }
}
