use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

/// The three equipment ecosystems topofuse talks to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Vendor {
    /// Site firewall that also manages its access switches.
    FirewallController,
    /// Switch managed over its own REST API.
    DirectSwitch,
    /// Switch fleet managed through the vendor cloud.
    CloudSwitch,
}

impl Vendor {
    /// How this vendor expects a session key on subsequent calls.
    pub fn auth_strategy(self) -> AuthStrategy {
        match self {
            Self::FirewallController => AuthStrategy::Cookie,
            Self::DirectSwitch => AuthStrategy::Bearer,
            Self::CloudSwitch => AuthStrategy::ApiKey,
        }
    }
}

/// Which authentication mechanism a vendor call uses.
///
/// Marker enum (no data) -- the actual secret lives in [`Credential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Session cookie from a form login.
    Cookie,
    /// `Authorization: Bearer` with a session or static token.
    Bearer,
    /// Static API key, no session.
    ApiKey,
}

/// Secret material carried by a [`Credential`].
#[derive(Debug, Clone)]
pub enum CredentialSecret {
    /// Interactive password, exchanged for a session at login.
    Password(SecretString),
    /// Pre-issued token, used directly as the session key.
    Token(SecretString),
}

/// Credential for one vendor endpoint.
///
/// Immutable once loaded. The core never mutates or persists it.
#[derive(Debug, Clone)]
pub struct Credential {
    pub vendor: Vendor,
    pub host: Url,
    pub username: String,
    pub secret: CredentialSecret,
}

impl Credential {
    pub fn new(
        vendor: Vendor,
        host: Url,
        username: impl Into<String>,
        secret: CredentialSecret,
    ) -> Self {
        Self {
            vendor,
            host,
            username: username.into(),
            secret,
        }
    }

    /// The session identity this credential logs in as.
    pub fn session_tuple(&self) -> SessionTuple {
        SessionTuple {
            vendor: self.vendor,
            host: self.host.as_str().trim_end_matches('/').to_owned(),
            username: self.username.clone(),
        }
    }
}

/// `(vendor, host, user)` -- the identity of one vendor session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionTuple {
    pub vendor: Vendor,
    pub host: String,
    pub username: String,
}

impl SessionTuple {
    pub fn new(vendor: Vendor, host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            vendor,
            host: host.into(),
            username: username.into(),
        }
    }

    /// Key used by session stores: `vendor|host|user`.
    pub fn store_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SessionTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.vendor, self.host, self.username)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn vendor_round_trips_through_strum() {
        assert_eq!(Vendor::FirewallController.to_string(), "firewall-controller");
        let parsed: Vendor = "cloud-switch".parse().unwrap();
        assert_eq!(parsed, Vendor::CloudSwitch);
    }

    #[test]
    fn tuple_strips_trailing_slash() {
        let cred = Credential::new(
            Vendor::DirectSwitch,
            Url::parse("https://10.0.0.2/").unwrap(),
            "admin",
            CredentialSecret::Token("t".to_owned().into()),
        );
        assert_eq!(
            cred.session_tuple().store_key(),
            "direct-switch|https://10.0.0.2|admin"
        );
    }
}
