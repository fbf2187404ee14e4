// Cloud switch HTTP client

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::models::{CloudNetwork, CloudOrganization};
use crate::auth::{Credential, CredentialSecret};
use crate::error::Error;
use crate::gate::{GateConfig, RequestGate};
use crate::raw::{RawRecord, records_from_value};
use crate::response::read_json;
use crate::transport::TransportConfig;

/// Client for the cloud switch fleet.
///
/// The API key is injected as a default `Authorization` header, so there
/// is no login step and no session to manage.
pub struct CloudClient {
    http: reqwest::Client,
    base_url: Url,
    gate: Arc<RequestGate>,
    timeout: Duration,
}

impl CloudClient {
    /// Build a client with its own HTTP client and gate.
    pub fn new(
        base_url: Url,
        api_key: &SecretString,
        transport: &TransportConfig,
        gate: GateConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid API key header value: {e}"),
            })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);

        let http = transport.build_client_with_headers(headers)?;
        Ok(Self::with_client(
            http,
            base_url,
            Arc::new(RequestGate::new(gate)),
            transport.timeout,
        ))
    }

    /// Build from a cloud credential; either secret form is used as the key.
    pub fn from_credential(
        credential: &Credential,
        transport: &TransportConfig,
        gate: GateConfig,
    ) -> Result<Self, Error> {
        let key = match &credential.secret {
            CredentialSecret::Token(key) | CredentialSecret::Password(key) => key,
        };
        Self::new(credential.host.clone(), key, transport, gate)
    }

    /// Wrap a pre-built client (which must already carry the auth header).
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        gate: Arc<RequestGate>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url,
            gate,
            timeout,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn gate(&self) -> &Arc<RequestGate> {
        &self.gate
    }

    // ── Endpoints ────────────────────────────────────────────────────

    pub async fn organizations(&self) -> Result<Vec<CloudOrganization>, Error> {
        self.get_json(&["organizations"]).await
    }

    pub async fn networks(&self, organization_id: &str) -> Result<Vec<CloudNetwork>, Error> {
        self.get_json(&["organizations", organization_id, "networks"])
            .await
    }

    pub async fn devices(&self, network_id: &str) -> Result<Vec<RawRecord>, Error> {
        let value = self.get_json(&["networks", network_id, "devices"]).await?;
        Ok(records_from_value(value))
    }

    /// Port statuses for one switch, including LLDP/CDP neighbor data.
    pub async fn switch_ports(&self, serial: &str) -> Result<Vec<RawRecord>, Error> {
        let value = self
            .get_json(&["devices", serial, "switch", "ports", "statuses"])
            .await?;
        Ok(records_from_value(value))
    }

    // ── Internals ────────────────────────────────────────────────────

    /// `base_url` with `segments` appended (percent-encoded).
    fn api_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, Error> {
        let url = self.api_url(segments)?;
        self.gate
            .throttled_call(|| {
                let url = url.clone();
                async move {
                    debug!("GET {}", url);
                    let resp = self
                        .http
                        .get(url)
                        .send()
                        .await
                        .map_err(|e| Error::from_send(e, self.timeout))?;
                    read_json(resp).await
                }
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> CloudClient {
        CloudClient::with_client(
            reqwest::Client::new(),
            Url::parse(base).unwrap(),
            Arc::new(RequestGate::default()),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn api_url_keeps_base_path_and_encodes() {
        let c = client("https://cloud.example/api/v1/");
        assert_eq!(
            c.api_url(&["devices", "Q2XX-AB/CD", "switch"])
                .unwrap()
                .as_str(),
            "https://cloud.example/api/v1/devices/Q2XX-AB%2FCD/switch"
        );

        let c = client("https://cloud.example/api/v1");
        assert_eq!(
            c.api_url(&["organizations"]).unwrap().as_str(),
            "https://cloud.example/api/v1/organizations"
        );
    }
}
