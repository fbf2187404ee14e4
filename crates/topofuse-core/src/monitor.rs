// ── Monitor correlator ──
//
// Joins the detected-device feed with per-port counters and attaches a
// classification to every device. Enrichment problems are logged and
// never drop a record.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use topofuse_api::RawRecord;
use tracing::{debug, warn};

use crate::classify::ClassificationEngine;
use crate::error::CoreError;
use crate::model::{CorrelatedDevice, MacAddress, RiskLevel, TrafficCounters, normalize_identifier};

/// Devices seen within this window count as active.
pub const DEFAULT_ACTIVE_THRESHOLD: Duration = Duration::from_secs(300);

/// Devices correlated between cancellation checks.
const CHUNK: usize = 256;

// ── Field paths ─────────────────────────────────────────────────────

const MAC: &[&str] = &["mac", "mac_address"];
const HOSTNAME: &[&str] = &["hostname", "host_name", "name"];
const ADDRESS: &[&str] = &["ipv4_address", "ip", "ip_address"];
const OS: &[&str] = &["os_name", "os", "os_family"];
const MANUFACTURER: &[&str] = &["hardware_vendor", "manufacturer", "vendor"];
const SWITCH: &[&str] = &["switch_fortilink", "switch_id", "switch_serial", "switch"];
const PORT: &[&str] = &["switch_port", "fortiswitch_port_name", "port"];
const LAST_SEEN: &[&str] = &["last_seen", "last_seen_time"];

const BYTES_SENT: &[&str] = &["tx_bytes", "bytes_sent"];
const BYTES_RECEIVED: &[&str] = &["rx_bytes", "bytes_received"];
const PACKETS_SENT: &[&str] = &["tx_packets", "packets_sent"];
const PACKETS_RECEIVED: &[&str] = &["rx_packets", "packets_received"];
const ERRORS_IN: &[&str] = &["rx_errors", "errors_in"];
const ERRORS_OUT: &[&str] = &["tx_errors", "errors_out"];

// ── Port statistics index ───────────────────────────────────────────

/// Port counters keyed by `(switch id, port name)`.
#[derive(Debug, Clone, Default)]
pub struct PortStatsIndex {
    ports: HashMap<(String, String), TrafficCounters>,
}

impl PortStatsIndex {
    /// Build from flat `{switch_id, port, ...counters}` records or nested
    /// `{serial, ports: {name: counters}}` records. Malformed entries are
    /// skipped with a warning.
    pub fn build(records: &[RawRecord]) -> Self {
        let mut ports = HashMap::new();

        for record in records {
            let Some(switch) = record.first_str(&["serial", "switch_id", "switch_serial"]) else {
                warn!("skipping port stats record without a switch id");
                continue;
            };
            let switch = normalize_identifier(&switch);

            match record.get("ports") {
                Some(Value::Object(nested)) => {
                    for (port, counters) in nested {
                        match parse_counters(counters) {
                            Some(c) => {
                                ports.insert((switch.clone(), port.clone()), c);
                            }
                            None => warn!(%switch, %port, "skipping malformed port counters"),
                        }
                    }
                }
                Some(_) => warn!(%switch, "skipping port stats with a non-object port map"),
                None => {
                    let Some(port) = record.first_str(&["port", "port_name", "interface"]) else {
                        warn!(%switch, "skipping flat port stats record without a port");
                        continue;
                    };
                    match parse_counters(&Value::Object(record.as_map().clone())) {
                        Some(c) => {
                            ports.insert((switch, port), c);
                        }
                        None => warn!(%switch, %port, "skipping malformed port counters"),
                    }
                }
            }
        }

        debug!(ports = ports.len(), "port stats indexed");
        Self { ports }
    }

    pub fn get(&self, switch: &str, port: &str) -> Option<TrafficCounters> {
        self.ports
            .get(&(normalize_identifier(switch), port.to_owned()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

/// Counters from one port object. `None` when it is not an object, holds
/// no counter at all, or any present counter is not a non-negative integer.
fn parse_counters(value: &Value) -> Option<TrafficCounters> {
    let counters = value.as_object()?;
    let mut seen = false;

    let mut field = |paths: &[&str]| -> Option<u64> {
        let Some(raw) = paths.iter().find_map(|p| counters.get(*p)) else {
            return Some(0);
        };
        seen = true;
        match raw {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    };

    let parsed = TrafficCounters {
        bytes_sent: field(BYTES_SENT)?,
        bytes_received: field(BYTES_RECEIVED)?,
        packets_sent: field(PACKETS_SENT)?,
        packets_received: field(PACKETS_RECEIVED)?,
        errors_in: field(ERRORS_IN)?,
        errors_out: field(ERRORS_OUT)?,
    };
    seen.then_some(parsed)
}

// ── Correlator ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Correlator {
    engine: Arc<ClassificationEngine>,
    active_threshold: Duration,
}

impl Correlator {
    pub fn new(engine: Arc<ClassificationEngine>, active_threshold: Duration) -> Self {
        Self {
            engine,
            active_threshold,
        }
    }

    pub fn active_threshold(&self) -> Duration {
        self.active_threshold
    }

    /// One output record per detected device, in input order.
    pub fn correlate(
        &self,
        detected: &[RawRecord],
        port_stats: &[RawRecord],
        now: DateTime<Utc>,
    ) -> Vec<CorrelatedDevice> {
        let index = PortStatsIndex::build(port_stats);
        detected
            .iter()
            .enumerate()
            .map(|(i, record)| self.correlate_one(i, record, &index, now))
            .collect()
    }

    /// `correlate` that checks the token between chunks and yields to the
    /// runtime, so a large feed can be abandoned.
    pub async fn correlate_cancellable(
        &self,
        detected: &[RawRecord],
        port_stats: &[RawRecord],
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CorrelatedDevice>, CoreError> {
        if cancel.is_cancelled() {
            return Err(CoreError::cancelled("device correlation"));
        }
        let index = PortStatsIndex::build(port_stats);

        let mut out = Vec::with_capacity(detected.len());
        for (chunk_no, chunk) in detected.chunks(CHUNK).enumerate() {
            if cancel.is_cancelled() {
                return Err(CoreError::cancelled("device correlation"));
            }
            let offset = chunk_no * CHUNK;
            out.extend(
                chunk
                    .iter()
                    .enumerate()
                    .map(|(i, record)| self.correlate_one(offset + i, record, &index, now)),
            );
            tokio::task::yield_now().await;
        }
        Ok(out)
    }

    fn correlate_one(
        &self,
        index_in_feed: usize,
        record: &RawRecord,
        ports: &PortStatsIndex,
        now: DateTime<Utc>,
    ) -> CorrelatedDevice {
        let raw_mac = record.first_str(MAC);
        let mac = raw_mac.as_deref().and_then(MacAddress::parse);
        if raw_mac.is_some() && mac.is_none() {
            warn!(mac = ?raw_mac, "detected device has an unparseable MAC");
        }
        let name = record.first_str(HOSTNAME);
        let manufacturer = record.first_str(MANUFACTURER);

        // Without a MAC the OUI tier is skipped; hostname and manufacturer still apply.
        let classification = if raw_mac.is_some() || name.is_some() || manufacturer.is_some() {
            Some(self.engine.classify(
                raw_mac.as_deref().unwrap_or_default(),
                name.as_deref(),
                manufacturer.as_deref(),
            ))
        } else {
            warn!(index = index_in_feed, "detected device has nothing to classify on");
            None
        };
        let risk = classification
            .as_ref()
            .map_or(RiskLevel::Unknown, |c| c.risk());

        let switch_id = record.first_str(SWITCH);
        let port = record.first_str(PORT);
        let traffic = match (&switch_id, &port) {
            (Some(switch), Some(port)) => ports.get(switch, port),
            _ => None,
        };

        let last_seen = LAST_SEEN
            .iter()
            .find_map(|p| record.lookup(p))
            .and_then(parse_timestamp);
        let is_active = last_seen.is_some_and(|seen| self.within_threshold(now, seen));

        let id = mac
            .as_ref()
            .map(|m| m.as_str().to_owned())
            .or_else(|| raw_mac.clone())
            .or_else(|| name.clone())
            .unwrap_or_else(|| format!("device-{index_in_feed}"));

        CorrelatedDevice {
            id,
            mac,
            name,
            address: record.first_str(ADDRESS),
            os: record.first_str(OS),
            manufacturer,
            classification,
            risk,
            switch_id,
            port,
            traffic,
            last_seen,
            is_active,
        }
    }

    fn within_threshold(&self, now: DateTime<Utc>, seen: DateTime<Utc>) -> bool {
        let threshold = TimeDelta::from_std(self.active_threshold).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(seen) < threshold
    }
}

/// Epoch seconds (or milliseconds), numeric strings, or RFC 3339.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let epoch = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(n) => Some(n),
            Err(_) => {
                return DateTime::parse_from_rfc3339(s.trim())
                    .ok()
                    .map(|t| t.with_timezone(&Utc));
            }
        },
        _ => None,
    }?;

    if epoch > 100_000_000_000 {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::{DeviceKind, MatchSource};

    fn rec(v: Value) -> RawRecord {
        RawRecord::from_value(v).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn correlator() -> Correlator {
        Correlator::new(Arc::new(ClassificationEngine::default()), DEFAULT_ACTIVE_THRESHOLD)
    }

    #[test]
    fn nested_and_flat_stats_both_index() {
        let index = PortStatsIndex::build(&[
            rec(json!({
                "serial": "S124EP0000000001",
                "ports": {
                    "port7": { "tx_bytes": 10, "rx_bytes": 20, "tx_packets": 1, "rx_packets": 2 },
                    "port8": "garbage"
                }
            })),
            rec(json!({ "switch_id": "S124EP0000000002", "port": "port1", "bytes_sent": "5" })),
            rec(json!({ "port": "orphan", "tx_bytes": 1 })),
        ]);

        assert_eq!(index.len(), 2);
        let c = index.get("S124EP0000000001", "port7").unwrap();
        assert_eq!((c.bytes_sent, c.bytes_received), (10, 20));
        assert_eq!(index.get("S124EP0000000002", "port1").unwrap().bytes_sent, 5);
    }

    #[test]
    fn negative_counter_is_malformed() {
        assert!(parse_counters(&json!({ "tx_bytes": -1 })).is_none());
        assert!(parse_counters(&json!({ "speed": 1000 })).is_none());
    }

    #[test]
    fn every_device_is_returned_in_order() {
        let detected = [
            rec(json!({
                "mac": "00:1a:2b:00:00:07", "hostname": "pos-07",
                "switch_fortilink": "S124EP0000000001", "switch_port": "port7",
                "last_seen": now().timestamp() - 60
            })),
            rec(json!({ "hostname": "no-mac-printer" })),
            rec(json!({ "ipv4_address": "10.0.0.9" })),
            rec(json!({ "mac": "3c:22:fb:10:20:30", "last_seen": "2026-03-01T11:00:00Z" })),
        ];
        let stats = [rec(json!({
            "serial": "S124EP0000000001",
            "ports": { "port7": { "tx_bytes": 100, "rx_bytes": 200 } }
        }))];

        let out = correlator().correlate(&detected, &stats, now());
        let ids: Vec<_> = out.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["00:1a:2b:00:00:07", "no-mac-printer", "device-2", "3c:22:fb:10:20:30"]
        );

        let pos = &out[0];
        assert_eq!(pos.classification.as_ref().unwrap().kind, DeviceKind::PosTerminal);
        assert_eq!(pos.risk, RiskLevel::High);
        assert_eq!(pos.traffic.unwrap().bytes_received, 200);
        assert!(pos.is_active);

        // No MAC, but the hostname still classifies it.
        let printer = out[1].classification.as_ref().unwrap();
        assert_eq!(printer.kind, DeviceKind::Printer);
        assert_eq!(printer.source, MatchSource::Hostname);
        assert_eq!(out[1].risk, RiskLevel::Low);
        assert!(out[1].mac.is_none());
        assert!(out[1].traffic.is_none());
        assert!(!out[1].is_active);

        assert!(out[2].classification.is_none());
        assert_eq!(out[2].risk, RiskLevel::Unknown);

        // An hour ago is outside the five-minute window.
        assert!(out[3].last_seen.is_some());
        assert!(!out[3].is_active);
    }

    #[test]
    fn timestamps_accept_epoch_millis_and_rfc3339() {
        let t = now();
        assert_eq!(parse_timestamp(&json!(t.timestamp())), Some(t));
        assert_eq!(parse_timestamp(&json!(t.timestamp_millis())), Some(t));
        assert_eq!(parse_timestamp(&json!("2026-03-01T12:00:00Z")), Some(t));
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
    }

    #[tokio::test]
    async fn cancelled_correlation_returns_no_partial() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = correlator()
            .correlate_cancellable(&[rec(json!({ "mac": "00:1a:2b:00:00:01" }))], &[], now(), &cancel)
            .await;
        assert!(matches!(result, Err(CoreError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn cancellable_matches_plain_correlation() {
        let detected: Vec<_> = (0..600)
            .map(|i| rec(json!({ "hostname": format!("host-{i}") })))
            .collect();
        let c = correlator();
        let plain = c.correlate(&detected, &[], now());
        let chunked = c
            .correlate_cancellable(&detected, &[], now(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(plain, chunked);
    }
}
