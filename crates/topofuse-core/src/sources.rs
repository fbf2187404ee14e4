// ── Session-backed topology sources ──
//
// The firewall controller and the direct switch both answer a handful of
// monitor calls. These builders shape those answers into raw node/link
// records and hand them to the normalizer, so every vendor ends up in the
// same canonical graph.

use std::collections::HashMap;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use topofuse_api::{
    FirewallClient, RawRecord, SessionBackend, SessionState, SessionStore, SwitchClient, Vendor,
};
use tracing::{debug, warn};
use url::Url;

use crate::discovery::{BranchFailure, BranchScope, Discovery};
use crate::error::{ApiResultExt, CoreError};
use crate::model::CanonicalGraph;
use crate::normalize::{node_id, normalize};

/// Host label used in error context.
pub(crate) fn host_label(url: &Url) -> String {
    url.host_str().unwrap_or(url.as_str()).to_owned()
}

// ── Firewall controller ─────────────────────────────────────────────

pub struct FirewallSource<S = SessionBackend> {
    client: FirewallClient<S>,
    host: String,
}

impl<S: SessionStore> FirewallSource<S> {
    pub fn new(client: FirewallClient<S>) -> Self {
        let host = host_label(&client.credential().host);
        Self { client, host }
    }

    pub fn client(&self) -> &FirewallClient<S> {
        &self.client
    }

    /// Firewall node, managed switches, fortilink and inter-switch links.
    ///
    /// The system status call is fatal; a failed switch listing leaves the
    /// graph with the firewall alone and a recorded failure.
    pub async fn topology(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Discovery<CanonicalGraph>, CoreError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CoreError::cancelled("firewall topology")),
            result = self.build_topology() => result,
        }
    }

    async fn build_topology(&self) -> Result<Discovery<CanonicalGraph>, CoreError> {
        let mut firewall = self
            .client
            .system_status()
            .await
            .context(Vendor::FirewallController, &self.host, "system status")?;
        firewall.insert("device_type", "firewall");
        if !firewall.contains_key("status") {
            firewall.insert("status", "online");
        }
        let firewall_id = node_id(Vendor::FirewallController, &firewall);

        let mut failures = Vec::new();
        let switches = match self.client.managed_switches().await {
            Ok(switches) => switches,
            Err(e) => {
                warn!(host = %self.host, error = %e, "managed switch listing failed");
                failures.push(BranchFailure::new(BranchScope::Resource, "managed-switches", &e));
                Vec::new()
            }
        };

        let mut devices = Vec::with_capacity(switches.len() + 1);
        let mut links = Vec::new();
        devices.push(firewall);

        for mut switch in switches {
            switch.insert("device_type", "switch");
            let Some(switch_id) = node_id(Vendor::FirewallController, &switch) else {
                devices.push(switch);
                continue;
            };

            if let Some(firewall_id) = &firewall_id {
                links.push(fortilink(firewall_id, &switch_id, &switch));
            }
            links.extend(isl_links(&switch_id, &switch));
            devices.push(switch);
        }

        debug!(
            devices = devices.len(),
            links = links.len(),
            "firewall topology assembled"
        );
        Ok(Discovery {
            data: normalize(Vendor::FirewallController, &devices, &links),
            failures,
        })
    }

    pub async fn detected_devices(&self) -> Result<Vec<RawRecord>, CoreError> {
        self.client
            .detected_devices()
            .await
            .context(Vendor::FirewallController, &self.host, "detected devices")
    }

    pub async fn port_stats(&self) -> Result<Vec<RawRecord>, CoreError> {
        self.client
            .port_stats()
            .await
            .context(Vendor::FirewallController, &self.host, "port stats")
    }

    pub async fn session_state(&self) -> SessionState {
        self.client
            .sessions()
            .session_state(self.client.credential())
            .await
    }

    pub async fn logout(&self) -> Result<(), CoreError> {
        self.client
            .sessions()
            .logout(self.client.credential())
            .await
            .context(Vendor::FirewallController, &self.host, "logout")
    }
}

fn fortilink(firewall_id: &str, switch_id: &str, switch: &RawRecord) -> RawRecord {
    let mut link = RawRecord::new();
    link.insert("source", firewall_id);
    link.insert("target", switch_id);
    link.insert("protocol", "fortilink");
    if let Some(port) = switch.first_str(&["fgt_peer_intf_name"]) {
        link.insert("source_port", port);
    }
    if let Some(status) = switch.first_str(&["status", "state"]) {
        link.insert("status", status);
    }
    link
}

/// ISL links from a switch's port list. Each pair is reported by both
/// ends, so only the end with the lower serial emits it.
fn isl_links(serial: &str, switch: &RawRecord) -> Vec<RawRecord> {
    let Some(Value::Array(ports)) = switch.get("ports") else {
        return Vec::new();
    };

    ports
        .iter()
        .filter_map(|port| RawRecord::from_value(port.clone()))
        .filter_map(|port| {
            let peer = port.first_str(&["isl_peer_device_sn"])?;
            if serial >= peer.as_str() {
                return None;
            }
            let mut link = RawRecord::new();
            link.insert("source", serial);
            link.insert("target", peer);
            link.insert("protocol", "isl");
            if let Some(local) = port.first_str(&["interface", "name"]) {
                link.insert("source_port", local);
            }
            if let Some(remote) = port.first_str(&["isl_peer_port_name"]) {
                link.insert("target_port", remote);
            }
            if let Some(status) = port.first_str(&["status"]) {
                link.insert("status", status);
            }
            if let Some(speed) = port.get("speed") {
                link.insert("speed", speed.clone());
            }
            Some(link)
        })
        .collect()
}

// ── Direct switch ───────────────────────────────────────────────────

pub struct SwitchSource<S = SessionBackend> {
    client: SwitchClient<S>,
    host: String,
}

impl<S: SessionStore> SwitchSource<S> {
    pub fn new(client: SwitchClient<S>) -> Self {
        let host = host_label(&client.credential().host);
        Self { client, host }
    }

    pub fn client(&self) -> &SwitchClient<S> {
        &self.client
    }

    /// The switch itself plus every LLDP neighbor, one `lldp` link each.
    pub async fn topology(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Discovery<CanonicalGraph>, CoreError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CoreError::cancelled("switch topology")),
            result = self.build_topology() => result,
        }
    }

    async fn build_topology(&self) -> Result<Discovery<CanonicalGraph>, CoreError> {
        let mut system = self
            .client
            .system()
            .await
            .context(Vendor::DirectSwitch, &self.host, "system")?;
        system.insert("device_type", "switch");
        if !system.contains_key("status") {
            system.insert("status", "up");
        }
        let switch_id = node_id(Vendor::DirectSwitch, &system);

        let mut failures = Vec::new();
        let (interfaces, neighbors) =
            tokio::join!(self.client.interfaces(), self.client.lldp_neighbors());

        let interfaces = match interfaces {
            Ok(list) => index_interfaces(list),
            Err(e) => {
                warn!(host = %self.host, error = %e, "interface listing failed");
                failures.push(BranchFailure::new(BranchScope::Resource, "interfaces", &e));
                HashMap::new()
            }
        };
        let neighbors = match neighbors {
            Ok(list) => list,
            Err(e) => {
                warn!(host = %self.host, error = %e, "lldp neighbor listing failed");
                failures.push(BranchFailure::new(BranchScope::Resource, "lldp-neighbors", &e));
                Vec::new()
            }
        };

        let mut devices = Vec::with_capacity(neighbors.len() + 1);
        let mut links = Vec::with_capacity(neighbors.len());
        devices.push(system);

        for neighbor in neighbors {
            if let Some(switch_id) = &switch_id {
                if let Some(link) = lldp_link(switch_id, &neighbor, &interfaces) {
                    links.push(link);
                }
            }
            devices.push(neighbor);
        }

        Ok(Discovery {
            data: normalize(Vendor::DirectSwitch, &devices, &links),
            failures,
        })
    }

    pub async fn session_state(&self) -> SessionState {
        self.client
            .sessions()
            .session_state(self.client.credential())
            .await
    }

    pub async fn logout(&self) -> Result<(), CoreError> {
        self.client
            .sessions()
            .logout(self.client.credential())
            .await
            .context(Vendor::DirectSwitch, &self.host, "logout")
    }
}

fn index_interfaces(interfaces: Vec<RawRecord>) -> HashMap<String, RawRecord> {
    interfaces
        .into_iter()
        .filter_map(|iface| Some((iface.first_str(&["name", "id"])?, iface)))
        .collect()
}

fn lldp_link(
    switch_id: &str,
    neighbor: &RawRecord,
    interfaces: &HashMap<String, RawRecord>,
) -> Option<RawRecord> {
    let target = node_id(Vendor::DirectSwitch, neighbor)?;
    let local_port = neighbor.first_str(&["local_port"]);

    let mut link = RawRecord::new();
    link.insert("source", switch_id);
    link.insert("target", target);
    link.insert("protocol", "lldp");
    if let Some(remote) = neighbor.first_str(&["port_id", "remote_port"]) {
        link.insert("target_port", remote);
    }

    if let Some(iface) = local_port.as_ref().and_then(|p| interfaces.get(p)) {
        if let Some(state) = iface.first_str(&["link_state", "status"]) {
            link.insert("status", state);
        }
        if let Some(speed) = iface.get("speed_mbps").or_else(|| iface.get("link_speed")) {
            link.insert("speed_mbps", speed.clone());
        }
    }
    if let Some(local) = local_port {
        link.insert("source_port", local);
    }
    Some(link)
}
