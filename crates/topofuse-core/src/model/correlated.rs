// ── Correlated monitor records ──

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::classification::ClassificationResult;
use super::identity::MacAddress;
use super::topology::RiskLevel;

/// Port counters for one device's switch port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrafficCounters {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub errors_in: u64,
    pub errors_out: u64,
}

/// A detected device enriched with classification and port traffic.
///
/// `traffic` is `None` when no statistics matched the device's port,
/// which is distinct from a port that moved zero bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedDevice {
    pub id: String,
    pub mac: Option<MacAddress>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub os: Option<String>,
    pub manufacturer: Option<String>,
    pub classification: Option<ClassificationResult>,
    pub risk: RiskLevel,
    pub switch_id: Option<String>,
    pub port: Option<String>,
    pub traffic: Option<TrafficCounters>,
    pub last_seen: Option<DateTime<Utc>>,
    pub is_active: bool,
}
