// ── Canonical topology graph ──
//
// Vendor-agnostic node/link representation. Produced only by the
// normalizer; immutable once built for a fetch cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use topofuse_api::Vendor;

use super::identity::MacAddress;

/// Broad role of a node in the graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum NodeKind {
    Firewall,
    Router,
    Switch,
    AccessPoint,
    Server,
    Camera,
    Endpoint,
    #[default]
    Unknown,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum NodeStatus {
    Online,
    Offline,
    Alerting,
    Dormant,
    #[default]
    Unknown,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum LinkKind {
    /// Firewall-to-managed-switch control link.
    Fortilink,
    /// Inter-switch link between two managed switches.
    Isl,
    Lldp,
    Cdp,
    Uplink,
    #[default]
    Unknown,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum LinkStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

/// Fixed risk tier attached to nodes and correlated devices.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    #[default]
    Unknown,
}

pub const DEFAULT_GROUP: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub status: NodeStatus,
    pub vendor: Vendor,
    pub mac: Option<MacAddress>,
    pub serial: Option<String>,
    pub address: Option<String>,
    pub model: Option<String>,
    pub firmware: Option<String>,
    pub os_family: Option<String>,
    pub uptime_secs: Option<u64>,
    pub risk: RiskLevel,
    /// Physical grouping (site, stack, closet).
    pub group: String,
    /// Logical grouping.
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalLink {
    /// `"{source}::{target}"`, order-sensitive.
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
    pub status: LinkStatus,
    pub source_port: Option<String>,
    pub target_port: Option<String>,
    pub bandwidth_mbps: Option<u64>,
    pub utilization_pct: Option<f64>,
    pub latency_ms: Option<f64>,
}

impl CanonicalLink {
    pub fn link_id(source: &str, target: &str) -> String {
        format!("{source}::{target}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub timestamp: DateTime<Utc>,
    pub source: Vendor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalGraph {
    pub nodes: Vec<CanonicalNode>,
    pub links: Vec<CanonicalLink>,
    pub metadata: GraphMetadata,
}

impl CanonicalGraph {
    pub fn empty(source: Vendor, timestamp: DateTime<Utc>) -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            metadata: GraphMetadata { timestamp, source },
        }
    }

    pub fn node(&self, id: &str) -> Option<&CanonicalNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn link(&self, id: &str) -> Option<&CanonicalLink> {
        self.links.iter().find(|l| l.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }
}
