// ── Cloud discovery orchestrator ──
//
// organizations → networks → devices → switch ports, all through the
// cloud client's single gate. Only organization enumeration is fatal;
// every later branch failure is recorded and its siblings continue.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures_util::{StreamExt, stream};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use topofuse_api::{CloudClient, CloudNetwork, CloudOrganization, ErrorKind, RawRecord, Vendor};
use tracing::{debug, info, warn};

use crate::error::{ApiResultExt, CoreError, PartialDiscoveryError};
use crate::model::{CanonicalGraph, MacAddress};
use crate::normalize::normalize;

/// Default number of networks/devices queried concurrently.
pub const DEFAULT_CONCURRENCY: usize = 4;

// ── Results ─────────────────────────────────────────────────────────

/// Level of the chain a failed branch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BranchScope {
    Organization,
    Network,
    Device,
    /// A single non-chained feed (managed switches, LLDP, interfaces).
    Resource,
}

/// One branch of a discovery that failed while others succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchFailure {
    pub scope: BranchScope,
    pub id: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl BranchFailure {
    pub fn new(scope: BranchScope, id: impl Into<String>, error: &topofuse_api::Error) -> Self {
        Self {
            scope,
            id: id.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for BranchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]: {}", self.scope, self.id, self.kind, self.message)
    }
}

/// Result data plus the branches that failed producing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discovery<T> {
    pub data: T,
    pub failures: Vec<BranchFailure>,
}

impl<T> Discovery<T> {
    pub fn complete(data: T) -> Self {
        Self {
            data,
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Discovery<U> {
        Discovery {
            data: f(self.data),
            failures: self.failures,
        }
    }
}

impl<T: fmt::Debug> Discovery<T> {
    /// All-or-nothing view: any failed branch turns the result into an error
    /// that still carries the successful subset.
    pub fn into_result(self) -> Result<T, PartialDiscoveryError<T>> {
        if self.failures.is_empty() {
            Ok(self.data)
        } else {
            Err(PartialDiscoveryError {
                data: self.data,
                failures: self.failures,
            })
        }
    }
}

/// Raw output of the cloud chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiscoveredFleet {
    pub organizations: Vec<CloudOrganization>,
    pub networks: Vec<CloudNetwork>,
    /// Sorted by serial.
    pub devices: Vec<RawRecord>,
    /// Neighbor links derived from port LLDP/CDP data.
    pub links: Vec<RawRecord>,
}

// ── Scope ───────────────────────────────────────────────────────────

/// Narrows the discovery chain. Empty lists match everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeFilter {
    /// Organization ids or names.
    pub organizations: Vec<String>,
    /// Network ids or names.
    pub networks: Vec<String>,
    /// Product types (`switch`, `wireless`, `appliance`, ...).
    pub product_types: Vec<String>,
    /// Enumerate switch ports (and so neighbor links).
    pub include_ports: bool,
}

impl Default for ScopeFilter {
    fn default() -> Self {
        Self {
            organizations: Vec::new(),
            networks: Vec::new(),
            product_types: Vec::new(),
            include_ports: true,
        }
    }
}

impl ScopeFilter {
    pub fn organization(mut self, id_or_name: impl Into<String>) -> Self {
        self.organizations.push(id_or_name.into());
        self
    }

    pub fn network(mut self, id_or_name: impl Into<String>) -> Self {
        self.networks.push(id_or_name.into());
        self
    }

    pub fn product_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_types.push(product_type.into());
        self
    }

    pub fn without_ports(mut self) -> Self {
        self.include_ports = false;
        self
    }

    pub fn matches_organization(&self, org: &CloudOrganization) -> bool {
        matches_any(&self.organizations, &org.id, &org.name)
    }

    pub fn matches_network(&self, network: &CloudNetwork) -> bool {
        matches_any(&self.networks, &network.id, &network.name)
            && network.has_any_product(&self.product_types)
    }

    pub fn matches_device(&self, device: &RawRecord) -> bool {
        self.product_types.is_empty()
            || device
                .first_str(&["productType"])
                .is_some_and(|p| self.product_types.iter().any(|t| t.eq_ignore_ascii_case(&p)))
    }
}

fn matches_any(filters: &[String], id: &str, name: &str) -> bool {
    filters.is_empty()
        || filters
            .iter()
            .any(|f| f == id || f.eq_ignore_ascii_case(name))
}

// ── Orchestrator ────────────────────────────────────────────────────

pub struct CloudDiscovery {
    client: Arc<CloudClient>,
    concurrency: usize,
    host: String,
}

impl CloudDiscovery {
    pub fn new(client: Arc<CloudClient>, concurrency: usize) -> Self {
        let host = client
            .base_url()
            .host_str()
            .unwrap_or_default()
            .to_owned();
        Self {
            client,
            concurrency: concurrency.max(1),
            host,
        }
    }

    pub fn client(&self) -> &Arc<CloudClient> {
        &self.client
    }

    /// Run the full chain. Cancellation discards everything gathered so far.
    pub async fn discover_topology(
        &self,
        scope: &ScopeFilter,
        cancel: &CancellationToken,
    ) -> Result<Discovery<DiscoveredFleet>, CoreError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CoreError::cancelled("cloud discovery")),
            result = self.run_chain(scope) => result,
        }
    }

    /// `discover_topology` followed by normalization.
    pub async fn canonical_topology(
        &self,
        scope: &ScopeFilter,
        cancel: &CancellationToken,
    ) -> Result<Discovery<CanonicalGraph>, CoreError> {
        let fleet = self.discover_topology(scope, cancel).await?;
        Ok(fleet.map(|f| normalize(Vendor::CloudSwitch, &f.devices, &f.links)))
    }

    async fn run_chain(&self, scope: &ScopeFilter) -> Result<Discovery<DiscoveredFleet>, CoreError> {
        let mut failures = Vec::new();

        // Step 1: nothing downstream can run without organizations.
        let organizations: Vec<CloudOrganization> = self
            .client
            .organizations()
            .await
            .context(Vendor::CloudSwitch, &self.host, "list organizations")?
            .into_iter()
            .filter(|org| scope.matches_organization(org))
            .collect();
        info!(count = organizations.len(), "organizations in scope");

        // Step 2: networks per organization.
        let network_results: Vec<_> = stream::iter(&organizations)
            .map(|org| async move { (org, self.client.networks(&org.id).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut networks = Vec::new();
        for (org, result) in network_results {
            match result {
                Ok(found) => networks.extend(found.into_iter().filter(|n| scope.matches_network(n))),
                Err(e) => {
                    warn!(org = %org.id, error = %e, "network enumeration failed");
                    failures.push(BranchFailure::new(BranchScope::Organization, &org.id, &e));
                }
            }
        }
        networks.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(count = networks.len(), "networks in scope");

        // Step 3: devices per network.
        let device_results: Vec<_> = stream::iter(&networks)
            .map(|net| async move { (net, self.client.devices(&net.id).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut devices = Vec::new();
        for (net, result) in device_results {
            match result {
                Ok(found) => devices.extend(
                    found
                        .into_iter()
                        .filter(|d| scope.matches_device(d))
                        .map(|d| annotate_network(d, net)),
                ),
                Err(e) => {
                    warn!(network = %net.id, error = %e, "device enumeration failed");
                    failures.push(BranchFailure::new(BranchScope::Network, &net.id, &e));
                }
            }
        }
        devices.sort_by_key(device_serial);

        // Step 4: ports per switch.
        let mut links = Vec::new();
        if scope.include_ports {
            let switches: Vec<String> = devices
                .iter()
                .filter(|d| is_switch(d))
                .filter_map(|d| d.first_str(&["serial"]))
                .collect();

            let port_results: Vec<_> = stream::iter(&switches)
                .map(|serial| async move { (serial, self.client.switch_ports(serial).await) })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            let by_mac = serial_by_mac(&devices);
            for (serial, result) in port_results {
                match result {
                    Ok(ports) => links.extend(ports.iter().filter_map(|p| neighbor_link(serial, p, &by_mac))),
                    Err(e) => {
                        warn!(serial = %serial, error = %e, "port enumeration failed");
                        failures.push(BranchFailure::new(BranchScope::Device, serial, &e));
                    }
                }
            }
            links.sort_by_key(|l| {
                (
                    l.first_str(&["source"]).unwrap_or_default(),
                    l.first_str(&["target"]).unwrap_or_default(),
                )
            });
        }

        info!(
            devices = devices.len(),
            links = links.len(),
            failures = failures.len(),
            "cloud discovery finished"
        );

        Ok(Discovery {
            data: DiscoveredFleet {
                organizations,
                networks,
                devices,
                links,
            },
            failures,
        })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn device_serial(device: &RawRecord) -> String {
    device.first_str(&["serial"]).unwrap_or_default()
}

fn annotate_network(mut device: RawRecord, network: &CloudNetwork) -> RawRecord {
    if !device.contains_key("networkId") {
        device.insert("networkId", network.id.clone());
    }
    if !device.contains_key("networkName") {
        device.insert("networkName", network.name.clone());
    }
    device
}

fn is_switch(device: &RawRecord) -> bool {
    device
        .first_str(&["productType"])
        .map_or_else(
            || {
                device
                    .first_str(&["model"])
                    .is_some_and(|m| m.to_ascii_uppercase().starts_with("MS"))
            },
            |p| p.eq_ignore_ascii_case("switch"),
        )
}

fn serial_by_mac(devices: &[RawRecord]) -> HashMap<MacAddress, String> {
    devices
        .iter()
        .filter_map(|d| {
            let mac = d.first_str(&["mac"]).and_then(|m| MacAddress::parse(&m))?;
            Some((mac, d.first_str(&["serial"])?))
        })
        .collect()
}

/// Turn one port status with an LLDP or CDP neighbor into a link record.
///
/// The neighbor's chassis MAC is resolved to a discovered serial when
/// possible, otherwise the normalized MAC (or advertised name) is used.
fn neighbor_link(
    serial: &str,
    port: &RawRecord,
    by_mac: &HashMap<MacAddress, String>,
) -> Option<RawRecord> {
    let (protocol, chassis, name, remote_port) = if port.get("lldp").is_some_and(Value::is_object)
    {
        (
            "lldp",
            port.first_str(&["lldp.chassisId"]),
            port.first_str(&["lldp.systemName"]),
            port.first_str(&["lldp.portId"]),
        )
    } else if port.get("cdp").is_some_and(Value::is_object) {
        (
            "cdp",
            port.first_str(&["cdp.deviceId"]),
            port.first_str(&["cdp.systemName", "cdp.deviceId"]),
            port.first_str(&["cdp.portId"]),
        )
    } else {
        return None;
    };

    let mac = chassis.as_deref().and_then(MacAddress::parse);
    let target = mac
        .as_ref()
        .and_then(|m| by_mac.get(m).cloned())
        .or_else(|| mac.map(String::from))
        .or(name)?;

    let mut link = RawRecord::new();
    link.insert("source", serial);
    link.insert("target", target);
    link.insert("protocol", protocol);
    if let Some(local) = port.first_str(&["portId"]) {
        link.insert("source_port", local);
    }
    if let Some(remote) = remote_port {
        link.insert("target_port", remote);
    }
    if let Some(status) = port.first_str(&["status"]) {
        link.insert("status", status);
    }
    if let Some(speed) = port.get("speed") {
        link.insert("speed", speed.clone());
    }
    Some(link)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rec(v: Value) -> RawRecord {
        RawRecord::from_value(v).unwrap()
    }

    #[test]
    fn lldp_neighbor_resolves_to_known_serial() {
        let devices = [rec(json!({ "serial": "Q2HP-0002", "mac": "E0:55:3D:00:00:02" }))];
        let by_mac = serial_by_mac(&devices);
        let port = rec(json!({
            "portId": "8",
            "status": "Connected",
            "speed": "1 Gbps",
            "lldp": { "systemName": "store-sw-2", "chassisId": "e0:55:3d:00:00:02", "portId": "1" }
        }));

        let link = neighbor_link("Q2HP-0001", &port, &by_mac).unwrap();
        assert_eq!(link.first_str(&["target"]).as_deref(), Some("Q2HP-0002"));
        assert_eq!(link.first_str(&["protocol"]).as_deref(), Some("lldp"));
        assert_eq!(link.first_str(&["source_port"]).as_deref(), Some("8"));
    }

    #[test]
    fn unresolved_cdp_neighbor_falls_back_to_mac() {
        let port = rec(json!({
            "portId": "2",
            "cdp": { "deviceId": "00090faabbcc", "portId": "port1" }
        }));
        let link = neighbor_link("Q2HP-0001", &port, &HashMap::new()).unwrap();
        assert_eq!(link.first_str(&["target"]).as_deref(), Some("00:09:0f:aa:bb:cc"));
    }

    #[test]
    fn port_without_neighbor_is_not_a_link() {
        let port = rec(json!({ "portId": "3", "status": "Disconnected" }));
        assert!(neighbor_link("Q2HP-0001", &port, &HashMap::new()).is_none());
    }

    #[test]
    fn scope_filter_matches_ids_and_names() {
        let scope = ScopeFilter::default().network("store 12").product_type("switch");
        let net: CloudNetwork = serde_json::from_value(json!({
            "id": "N_12", "name": "Store 12", "productTypes": ["switch", "wireless"]
        }))
        .unwrap();
        assert!(scope.matches_network(&net));

        let other: CloudNetwork = serde_json::from_value(json!({
            "id": "N_13", "name": "Store 13", "productTypes": ["switch"]
        }))
        .unwrap();
        assert!(!scope.matches_network(&other));

        assert!(scope.matches_device(&rec(json!({ "productType": "switch" }))));
        assert!(!scope.matches_device(&rec(json!({ "productType": "camera" }))));
    }

    #[test]
    fn strict_view_keeps_successful_subset() {
        let discovery = Discovery {
            data: vec!["N_1", "N_2"],
            failures: vec![BranchFailure {
                scope: BranchScope::Network,
                id: "N_3".into(),
                kind: ErrorKind::Transport,
                message: "timed out".into(),
            }],
        };
        let err = discovery.into_result().unwrap_err();
        assert_eq!(err.data, vec!["N_1", "N_2"]);
        assert_eq!(err.kind(), ErrorKind::PartialDiscovery);
    }
}
