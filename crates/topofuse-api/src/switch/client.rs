// Direct switch HTTP client

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use url::Url;

use super::auth::SwitchAuth;
use crate::auth::Credential;
use crate::error::Error;
use crate::raw::{RawRecord, records_from_value};
use crate::response::read_json;
use crate::session::{SessionBackend, SessionManager, SessionStore};

const SYSTEM: &str = "/rest/v1/system";
const INTERFACES: &str = "/rest/v1/interfaces";
const LLDP_NEIGHBORS: &str = "/rest/v1/lldp/neighbors";

/// Client for a single directly managed switch.
pub struct SwitchClient<S = SessionBackend> {
    sessions: Arc<SessionManager<SwitchAuth, S>>,
    credential: Credential,
}

impl<S: SessionStore> SwitchClient<S> {
    pub fn new(sessions: Arc<SessionManager<SwitchAuth, S>>, credential: Credential) -> Self {
        Self {
            sessions,
            credential,
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn sessions(&self) -> &Arc<SessionManager<SwitchAuth, S>> {
        &self.sessions
    }

    pub async fn system(&self) -> Result<RawRecord, Error> {
        let value = self.get(SYSTEM).await?;
        RawRecord::from_value(value).ok_or_else(|| Error::Deserialization {
            message: "system response is not an object".into(),
            body: String::new(),
        })
    }

    pub async fn interfaces(&self) -> Result<Vec<RawRecord>, Error> {
        let value = self.get(INTERFACES).await?;
        Ok(list_field(value, "interfaces"))
    }

    pub async fn lldp_neighbors(&self) -> Result<Vec<RawRecord>, Error> {
        let value = self.get(LLDP_NEIGHBORS).await?;
        Ok(list_field(value, "neighbors"))
    }

    fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.credential.host.join(path)?)
    }

    async fn get(&self, path: &str) -> Result<Value, Error> {
        let url = self.api_url(path)?;
        debug!("GET {}", url);
        let resp = self
            .sessions
            .execute_authenticated(&self.credential, |http| http.get(url.clone()))
            .await?;
        read_json(resp).await
    }
}

/// Lists come back bare or wrapped as `{"<field>": [...]}`.
fn list_field(value: Value, field: &str) -> Vec<RawRecord> {
    match value {
        Value::Object(mut map) if map.get(field).is_some_and(Value::is_array) => {
            records_from_value(map.remove(field).unwrap_or(Value::Null))
        }
        other => records_from_value(other),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::list_field;

    #[test]
    fn wrapped_and_bare_lists_are_accepted() {
        let wrapped = list_field(
            json!({ "neighbors": [{ "chassis_id": "aa" }, { "chassis_id": "bb" }] }),
            "neighbors",
        );
        assert_eq!(wrapped.len(), 2);

        let bare = list_field(json!([{ "name": "1/1" }]), "interfaces");
        assert_eq!(bare[0].first_str(&["name"]).as_deref(), Some("1/1"));
    }
}
