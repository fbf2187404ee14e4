// ── Runtime aggregator configuration ──
//
// These types describe which vendors to reach and how to tune the
// session, gate, discovery, and monitor layers. They never touch disk;
// `topofuse-config` (or a test) builds an `AggregatorConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use topofuse_api::session::DEFAULT_SESSION_TTL;
use topofuse_api::{Credential, GateConfig, TransportConfig};

use crate::classify::OuiEntry;
use crate::discovery::DEFAULT_CONCURRENCY;
use crate::monitor::DEFAULT_ACTIVE_THRESHOLD;

/// One vendor endpoint: who to log in as and how to connect.
#[derive(Debug, Clone)]
pub struct VendorEndpoint {
    pub credential: Credential,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone)]
pub struct FirewallConfig {
    pub endpoint: VendorEndpoint,
    /// Virtual domain to scope requests to.
    pub vdom: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub endpoint: VendorEndpoint,
    pub gate: GateConfig,
    /// Max networks/devices queried at once.
    pub concurrency: usize,
}

impl CloudConfig {
    pub fn new(endpoint: VendorEndpoint) -> Self {
        Self {
            endpoint,
            gate: GateConfig::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Where sessions are persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionStoreConfig {
    #[default]
    Memory,
    /// Directory shared by every process on the host.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub ttl: Duration,
    pub store: SessionStoreConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            store: SessionStoreConfig::Memory,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// A device seen within this window counts as active.
    pub active_threshold: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            active_threshold: DEFAULT_ACTIVE_THRESHOLD,
        }
    }
}

/// Everything the aggregator needs for one brand.
#[derive(Debug, Clone, Default)]
pub struct AggregatorConfig {
    pub firewall: Option<FirewallConfig>,
    pub switch: Option<VendorEndpoint>,
    pub cloud: Option<CloudConfig>,
    pub session: SessionConfig,
    pub monitor: MonitorConfig,
    /// Appended to the built-in OUI table.
    pub extra_oui: Vec<OuiEntry>,
}
