// Firewall controller HTTP client
//
// Monitor endpoints wrapped in the `{status, http_status, results}`
// envelope. All requests go through the session manager.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::auth::FirewallAuth;
use crate::auth::Credential;
use crate::error::Error;
use crate::raw::{RawRecord, records_from_value};
use crate::response::read_json;
use crate::session::{SessionBackend, SessionManager, SessionStore};

const SYSTEM_STATUS: &str = "/api/v2/monitor/system/status";
const MANAGED_SWITCHES: &str = "/api/v2/monitor/switch-controller/managed-switch/status";
const DETECTED_DEVICES: &str = "/api/v2/monitor/user/detected-device";
const PORT_STATS: &str = "/api/v2/monitor/switch-controller/managed-switch/port-stats";

/// Response envelope shared by all monitor endpoints.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    http_status: Option<u16>,
    #[serde(default)]
    results: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    serial: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// Client for the firewall controller's monitor API.
pub struct FirewallClient<S = SessionBackend> {
    sessions: Arc<SessionManager<FirewallAuth, S>>,
    credential: Credential,
    vdom: Option<String>,
}

impl<S: SessionStore> FirewallClient<S> {
    pub fn new(sessions: Arc<SessionManager<FirewallAuth, S>>, credential: Credential) -> Self {
        Self {
            sessions,
            credential,
            vdom: None,
        }
    }

    /// Scope every request to one virtual domain.
    pub fn with_vdom(mut self, vdom: impl Into<String>) -> Self {
        self.vdom = Some(vdom.into());
        self
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn sessions(&self) -> &Arc<SessionManager<FirewallAuth, S>> {
        &self.sessions
    }

    /// Firewall identity: hostname, serial, model, firmware.
    pub async fn system_status(&self) -> Result<RawRecord, Error> {
        let envelope = self.get(SYSTEM_STATUS, &[]).await?;
        let results = envelope.results.unwrap_or(Value::Null);
        let mut record = RawRecord::from_value(results).ok_or_else(|| Error::Deserialization {
            message: "system status results is not an object".into(),
            body: String::new(),
        })?;

        // Serial and firmware ride on the envelope, not in `results`.
        for (field, value) in [("serial", envelope.serial), ("version", envelope.version)] {
            if let Some(value) = value {
                if !record.contains_key(field) {
                    record.insert(field, value);
                }
            }
        }
        Ok(record)
    }

    /// Switches adopted by the controller, with their connection state.
    pub async fn managed_switches(&self) -> Result<Vec<RawRecord>, Error> {
        let envelope = self.get(MANAGED_SWITCHES, &[]).await?;
        Ok(records_from_value(required_results(envelope)?))
    }

    /// Detected endpoints enriched with DHCP and endpoint data in one call.
    pub async fn detected_devices(&self) -> Result<Vec<RawRecord>, Error> {
        let envelope = self
            .get(
                DETECTED_DEVICES,
                &[("with_dhcp", "true"), ("with_endpoint", "true")],
            )
            .await?;
        Ok(records_from_value(required_results(envelope)?))
    }

    /// Per-port counters for every managed switch.
    ///
    /// The controller answers either with an array of flat records or with
    /// an object keyed by switch serial. The keyed form is reshaped into
    /// `{serial, ports}` records.
    pub async fn port_stats(&self) -> Result<Vec<RawRecord>, Error> {
        let envelope = self.get(PORT_STATS, &[]).await?;
        Ok(port_stat_records(required_results(envelope)?))
    }

    // ── Internals ────────────────────────────────────────────────────

    fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.credential.host.join(path)?)
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Envelope, Error> {
        let url = self.api_url(path)?;
        let mut query: Vec<(&str, &str)> = params.to_vec();
        if let Some(vdom) = &self.vdom {
            query.push(("vdom", vdom.as_str()));
        }
        debug!("GET {}", url);

        let resp = self
            .sessions
            .execute_authenticated(&self.credential, |http| {
                http.get(url.clone()).query(&query)
            })
            .await?;
        let envelope: Envelope = read_json(resp).await?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope(envelope: Envelope) -> Result<Envelope, Error> {
    if envelope.status.as_deref() == Some("error") {
        let message = envelope
            .error
            .as_ref()
            .map_or_else(|| "controller reported an error".to_owned(), |e| match e {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        return Err(Error::Api {
            status: envelope.http_status.unwrap_or(500),
            message,
        });
    }
    Ok(envelope)
}

fn required_results(envelope: Envelope) -> Result<Value, Error> {
    envelope.results.ok_or_else(|| Error::Deserialization {
        message: "envelope has no results field".into(),
        body: String::new(),
    })
}

fn port_stat_records(results: Value) -> Vec<RawRecord> {
    match results {
        Value::Object(by_serial) => by_serial
            .into_iter()
            .filter(|(_, ports)| ports.is_object())
            .map(|(serial, ports)| {
                let mut record = RawRecord::new();
                record.insert("serial", serial);
                record.insert("ports", ports);
                record
            })
            .collect(),
        other => records_from_value(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn error_envelope_becomes_api_error() {
        let envelope: Envelope = serde_json::from_value(json!({
            "status": "error",
            "http_status": 424,
            "error": "vdom not found"
        }))
        .unwrap();
        match unwrap_envelope(envelope) {
            Err(Error::Api { status, message }) => {
                assert_eq!(status, 424);
                assert_eq!(message, "vdom not found");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn keyed_port_stats_are_reshaped() {
        let records = port_stat_records(json!({
            "S124EP0000000001": { "port1": { "rx-bytes": 10 } },
            "S124EP0000000002": { "port3": { "rx-bytes": 20 } }
        }));
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].first_str(&["serial"]).as_deref(),
            Some("S124EP0000000001")
        );
        assert_eq!(records[1].first_u64(&["ports.port3.rx-bytes"]), Some(20));
    }

    #[test]
    fn flat_port_stats_pass_through() {
        let records = port_stat_records(json!([
            { "switch_id": "S1", "port": "port1", "tx_bytes": 5 }
        ]));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].first_str(&["port"]).as_deref(), Some("port1"));
    }
}
