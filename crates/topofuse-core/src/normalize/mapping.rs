// ── Per-vendor field mappings ──
//
// Each vendor's raw shape is described as data: ordered candidate paths
// per canonical attribute plus value tables for the closed enums. The
// normalizer itself has no vendor branches.

use topofuse_api::Vendor;

use crate::model::{LinkKind, LinkStatus, NodeKind, NodeStatus};

/// Candidate field paths for one canonical node attribute, first match wins.
pub type Paths = &'static [&'static str];

/// Lowercase raw value (or value prefix) to canonical enum.
pub type ValueTable<T> = &'static [(&'static str, T)];

#[derive(Debug)]
pub struct NodeMapping {
    /// Stable identifiers (serial, MAC) in preference order.
    pub id: Paths,
    pub mac: Paths,
    pub serial: Paths,
    pub name: Paths,
    pub kind: Paths,
    pub kind_values: ValueTable<NodeKind>,
    pub default_kind: NodeKind,
    pub status: Paths,
    pub status_values: ValueTable<NodeStatus>,
    pub address: Paths,
    pub model: Paths,
    pub firmware: Paths,
    pub os_family: Paths,
    pub uptime: Paths,
    pub risk: Paths,
    pub group: Paths,
    pub tags: Paths,
}

#[derive(Debug)]
pub struct LinkMapping {
    pub source: Paths,
    pub target: Paths,
    pub source_port: Paths,
    pub target_port: Paths,
    pub kind: Paths,
    pub kind_values: ValueTable<LinkKind>,
    pub default_kind: LinkKind,
    pub status: Paths,
    pub status_values: ValueTable<LinkStatus>,
    pub bandwidth: Paths,
    pub utilization: Paths,
    pub latency: Paths,
}

#[derive(Debug)]
pub struct VendorMapping {
    pub vendor: Vendor,
    pub node: NodeMapping,
    pub link: LinkMapping,
}

pub fn mapping_for(vendor: Vendor) -> &'static VendorMapping {
    match vendor {
        Vendor::FirewallController => &FIREWALL_CONTROLLER,
        Vendor::DirectSwitch => &DIRECT_SWITCH,
        Vendor::CloudSwitch => &CLOUD_SWITCH,
    }
}

/// Look `raw` up in `table`: exact match first, then prefix match.
pub fn lookup_value<T: Copy>(table: ValueTable<T>, raw: &str) -> Option<T> {
    let raw = raw.trim().to_lowercase();
    table
        .iter()
        .find(|(key, _)| *key == raw)
        .or_else(|| table.iter().find(|(key, _)| raw.starts_with(key)))
        .map(|(_, value)| *value)
}

// ── Shared value tables ─────────────────────────────────────────────

const LINK_KINDS: ValueTable<LinkKind> = &[
    ("fortilink", LinkKind::Fortilink),
    ("isl", LinkKind::Isl),
    ("lldp", LinkKind::Lldp),
    ("cdp", LinkKind::Cdp),
    ("uplink", LinkKind::Uplink),
];

const LINK_STATUSES: ValueTable<LinkStatus> = &[
    ("up", LinkStatus::Up),
    ("connected", LinkStatus::Up),
    ("online", LinkStatus::Up),
    ("down", LinkStatus::Down),
    ("disconnected", LinkStatus::Down),
    ("offline", LinkStatus::Down),
    ("disabled", LinkStatus::Down),
];

// ── Firewall controller ─────────────────────────────────────────────

pub static FIREWALL_CONTROLLER: VendorMapping = VendorMapping {
    vendor: Vendor::FirewallController,
    node: NodeMapping {
        id: &["serial", "sn", "mac"],
        mac: &["mac", "base_mac"],
        serial: &["serial", "sn"],
        name: &["hostname", "switch-id", "name"],
        kind: &["device_type", "model_name"],
        kind_values: &[
            ("firewall", NodeKind::Firewall),
            ("fortigate", NodeKind::Firewall),
            ("switch", NodeKind::Switch),
            ("fortiswitch", NodeKind::Switch),
            ("fortiap", NodeKind::AccessPoint),
        ],
        default_kind: NodeKind::Unknown,
        status: &["status", "state"],
        status_values: &[
            ("connected", NodeStatus::Online),
            ("authorized", NodeStatus::Online),
            ("online", NodeStatus::Online),
            ("up", NodeStatus::Online),
            ("disconnected", NodeStatus::Offline),
            ("offline", NodeStatus::Offline),
            ("down", NodeStatus::Offline),
            ("discovered", NodeStatus::Dormant),
        ],
        address: &["connecting_from", "ip", "management_ip"],
        model: &["model", "model_name"],
        firmware: &["version", "os_version"],
        os_family: &["os_family"],
        uptime: &["uptime"],
        risk: &["risk"],
        group: &["group", "fgt_peer_intf_name"],
        tags: &["tags"],
    },
    link: LinkMapping {
        source: &["source"],
        target: &["target"],
        source_port: &["source_port"],
        target_port: &["target_port"],
        kind: &["protocol"],
        kind_values: LINK_KINDS,
        default_kind: LinkKind::Fortilink,
        status: &["status"],
        status_values: LINK_STATUSES,
        bandwidth: &["speed"],
        utilization: &["utilization"],
        latency: &["latency"],
    },
};

// ── Direct switch ───────────────────────────────────────────────────

pub static DIRECT_SWITCH: VendorMapping = VendorMapping {
    vendor: Vendor::DirectSwitch,
    node: NodeMapping {
        id: &["serial_number", "base_mac", "chassis_id", "mac"],
        mac: &["base_mac", "chassis_id", "mac"],
        serial: &["serial_number"],
        name: &["hostname", "system_name", "name"],
        kind: &["device_type", "capabilities"],
        kind_values: &[
            ("switch", NodeKind::Switch),
            ("bridge", NodeKind::Switch),
            ("router", NodeKind::Router),
            ("wlan", NodeKind::AccessPoint),
            ("firewall", NodeKind::Firewall),
            ("station", NodeKind::Endpoint),
            ("telephone", NodeKind::Endpoint),
        ],
        default_kind: NodeKind::Endpoint,
        status: &["status", "oper_status"],
        status_values: &[
            ("up", NodeStatus::Online),
            ("online", NodeStatus::Online),
            ("down", NodeStatus::Offline),
            ("offline", NodeStatus::Offline),
        ],
        address: &["management_address", "ip_address", "mgmt_ip"],
        model: &["product_model", "model", "system_description"],
        firmware: &["firmware_version", "software_version"],
        os_family: &["os_family"],
        uptime: &["uptime_secs", "uptime"],
        risk: &["risk"],
        group: &["location", "group"],
        tags: &["tags"],
    },
    link: LinkMapping {
        source: &["source"],
        target: &["target"],
        source_port: &["source_port", "local_port"],
        target_port: &["target_port", "remote_port"],
        kind: &["protocol"],
        kind_values: LINK_KINDS,
        default_kind: LinkKind::Lldp,
        status: &["status", "link_state"],
        status_values: LINK_STATUSES,
        bandwidth: &["speed_mbps", "speed"],
        utilization: &["utilization"],
        latency: &["latency"],
    },
};

// ── Cloud switch ────────────────────────────────────────────────────

pub static CLOUD_SWITCH: VendorMapping = VendorMapping {
    vendor: Vendor::CloudSwitch,
    node: NodeMapping {
        id: &["serial", "mac"],
        mac: &["mac"],
        serial: &["serial"],
        name: &["name", "serial"],
        kind: &["productType", "model"],
        kind_values: &[
            ("switch", NodeKind::Switch),
            ("ms", NodeKind::Switch),
            ("wireless", NodeKind::AccessPoint),
            ("mr", NodeKind::AccessPoint),
            ("appliance", NodeKind::Firewall),
            ("mx", NodeKind::Firewall),
            ("camera", NodeKind::Camera),
            ("mv", NodeKind::Camera),
            ("sensor", NodeKind::Endpoint),
        ],
        default_kind: NodeKind::Unknown,
        status: &["status"],
        status_values: &[
            ("online", NodeStatus::Online),
            ("offline", NodeStatus::Offline),
            ("alerting", NodeStatus::Alerting),
            ("dormant", NodeStatus::Dormant),
        ],
        address: &["lanIp", "wan1Ip", "publicIp"],
        model: &["model"],
        firmware: &["firmware"],
        os_family: &["os_family"],
        uptime: &["uptime"],
        risk: &["risk"],
        group: &["networkName", "networkId"],
        tags: &["tags"],
    },
    link: LinkMapping {
        source: &["source"],
        target: &["target"],
        source_port: &["source_port"],
        target_port: &["target_port"],
        kind: &["protocol"],
        kind_values: LINK_KINDS,
        default_kind: LinkKind::Uplink,
        status: &["status"],
        status_values: LINK_STATUSES,
        bandwidth: &["speed"],
        utilization: &["utilization"],
        latency: &["latency"],
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_lookup_prefers_exact_then_prefix() {
        let kinds = CLOUD_SWITCH.node.kind_values;
        assert_eq!(lookup_value(kinds, "switch"), Some(NodeKind::Switch));
        assert_eq!(lookup_value(kinds, "MS120-8LP"), Some(NodeKind::Switch));
        assert_eq!(lookup_value(kinds, "MR46"), Some(NodeKind::AccessPoint));
        assert_eq!(lookup_value(kinds, "Z3"), None);
    }

    #[test]
    fn every_vendor_has_a_mapping() {
        use strum::IntoEnumIterator;
        for vendor in Vendor::iter() {
            assert_eq!(mapping_for(vendor).vendor, vendor);
        }
    }
}
