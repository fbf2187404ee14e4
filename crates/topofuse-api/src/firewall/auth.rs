// Firewall controller authentication
//
// Form-encoded login against `/logincheck`. The controller answers with a
// session cookie; subsequent requests replay it in a `Cookie` header.

use std::time::Duration;

use reqwest::RequestBuilder;
use reqwest::header::COOKIE;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::auth::{Credential, CredentialSecret, Vendor};
use crate::error::Error;
use crate::response::preview;
use crate::session::{Authenticator, LoginGrant};

/// Name prefix of the controller's session cookie.
pub const SESSION_COOKIE_PREFIX: &str = "APSCOOKIE_";

const LOGIN_PATH: &str = "/logincheck";
const LOGOUT_PATH: &str = "/logout";

/// Session handshake for the firewall controller.
#[derive(Debug, Clone)]
pub struct FirewallAuth {
    cookie_prefix: String,
}

impl Default for FirewallAuth {
    fn default() -> Self {
        Self {
            cookie_prefix: SESSION_COOKIE_PREFIX.to_owned(),
        }
    }
}

impl FirewallAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match a differently named session cookie (some firmware trains rename it).
    pub fn with_cookie_prefix(prefix: impl Into<String>) -> Self {
        Self {
            cookie_prefix: prefix.into(),
        }
    }
}

impl Authenticator for FirewallAuth {
    fn vendor(&self) -> Vendor {
        Vendor::FirewallController
    }

    async fn login(
        &self,
        http: &reqwest::Client,
        timeout: Duration,
        credential: &Credential,
    ) -> Result<LoginGrant, Error> {
        let CredentialSecret::Password(password) = &credential.secret else {
            return Err(Error::Authentication {
                message: "firewall controller login requires a password credential".into(),
            });
        };

        let url = credential.host.join(LOGIN_PATH)?;
        debug!("logging in at {}", url);

        let resp = http
            .post(url)
            .form(&[
                ("username", credential.username.as_str()),
                ("secretkey", password.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| Error::from_send(e, timeout))?;

        let status = resp.status();
        let cookie = resp
            .cookies()
            .find(|c| c.name().starts_with(&self.cookie_prefix) && !c.value().is_empty())
            .map(|c| format!("{}={}", c.name(), c.value()));
        let body = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {}", preview(&body)),
            });
        }

        let Some(cookie) = cookie else {
            return Err(Error::Authentication {
                message: format!(
                    "login response carried no {}* cookie: {}",
                    self.cookie_prefix,
                    preview(&body)
                ),
            });
        };

        debug!("login successful");
        Ok(LoginGrant::new(cookie))
    }

    fn attach(&self, request: RequestBuilder, key: &str) -> RequestBuilder {
        request.header(COOKIE, key)
    }

    async fn logout(
        &self,
        http: &reqwest::Client,
        timeout: Duration,
        credential: &Credential,
        key: &str,
    ) -> Result<(), Error> {
        let url = credential.host.join(LOGOUT_PATH)?;
        debug!("logging out at {}", url);

        let resp = self
            .attach(http.post(url), key)
            .send()
            .await
            .map_err(|e| Error::from_send(e, timeout))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Error::Api {
                status: resp.status().as_u16(),
                message: "logout rejected".into(),
            })
        }
    }
}
