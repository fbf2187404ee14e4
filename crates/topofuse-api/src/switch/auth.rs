// Direct switch authentication

use std::time::Duration;

use reqwest::RequestBuilder;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use crate::auth::{Credential, CredentialSecret, Vendor};
use crate::error::Error;
use crate::response::read_json;
use crate::session::{Authenticator, LoginGrant};

const LOGIN_PATH: &str = "/rest/v1/login";
const LOGOUT_PATH: &str = "/rest/v1/logout";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Session handshake for a direct switch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchAuth;

impl Authenticator for SwitchAuth {
    fn vendor(&self) -> Vendor {
        Vendor::DirectSwitch
    }

    async fn login(
        &self,
        http: &reqwest::Client,
        timeout: Duration,
        credential: &Credential,
    ) -> Result<LoginGrant, Error> {
        let password = match &credential.secret {
            CredentialSecret::Token(token) => {
                debug!("using static API token");
                return Ok(LoginGrant::new(token.expose_secret()));
            }
            CredentialSecret::Password(password) => password,
        };

        let url = credential.host.join(LOGIN_PATH)?;
        debug!("logging in at {}", url);

        let resp = http
            .post(url)
            .basic_auth(&credential.username, Some(password.expose_secret()))
            .send()
            .await
            .map_err(|e| Error::from_send(e, timeout))?;
        let login: LoginResponse = read_json(resp).await?;

        if login.token.is_empty() {
            return Err(Error::Authentication {
                message: "switch returned an empty token".into(),
            });
        }

        debug!(expires_in = ?login.expires_in, "login successful");
        Ok(LoginGrant {
            key: login.token,
            ttl: login.expires_in.map(Duration::from_secs),
        })
    }

    fn attach(&self, request: RequestBuilder, key: &str) -> RequestBuilder {
        request.bearer_auth(key)
    }

    async fn logout(
        &self,
        http: &reqwest::Client,
        timeout: Duration,
        credential: &Credential,
        key: &str,
    ) -> Result<(), Error> {
        // Static tokens outlive any session; nothing to end remotely.
        if matches!(credential.secret, CredentialSecret::Token(_)) {
            return Ok(());
        }

        let url = credential.host.join(LOGOUT_PATH)?;
        debug!("logging out at {}", url);
        let resp = self
            .attach(http.post(url), key)
            .send()
            .await
            .map_err(|e| Error::from_send(e, timeout))?;
        crate::response::check_status(resp).await.map(drop)
    }
}
