// ── Topology normalizer ──
//
// Pure transform from vendor-shaped records to the canonical graph.
// No I/O, no caching; safe to call concurrently.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use topofuse_api::{RawRecord, Vendor};
use tracing::warn;

use super::mapping::{LinkMapping, NodeMapping, lookup_value, mapping_for};
use crate::model::{
    CanonicalGraph, CanonicalLink, CanonicalNode, DEFAULT_GROUP, GraphMetadata, MacAddress,
    RiskLevel, normalize_identifier,
};

/// Normalize one vendor batch, stamped with the current time.
pub fn normalize(vendor: Vendor, devices: &[RawRecord], links: &[RawRecord]) -> CanonicalGraph {
    normalize_at(vendor, devices, links, Utc::now())
}

/// Normalize one vendor batch with an explicit timestamp.
///
/// Records without any identity are skipped (logged at warn). Duplicate
/// node or link ids keep the first occurrence.
pub fn normalize_at(
    vendor: Vendor,
    devices: &[RawRecord],
    links: &[RawRecord],
    timestamp: DateTime<Utc>,
) -> CanonicalGraph {
    let mapping = mapping_for(vendor);

    let mut node_ids = HashSet::new();
    let nodes = devices
        .iter()
        .filter_map(|record| normalize_node(vendor, &mapping.node, record))
        .filter(|node| node_ids.insert(node.id.clone()))
        .collect();

    let mut link_ids = HashSet::new();
    let links = links
        .iter()
        .filter_map(|record| normalize_link(vendor, &mapping.link, record))
        .filter(|link| link_ids.insert(link.id.clone()))
        .collect();

    CanonicalGraph {
        nodes,
        links,
        metadata: GraphMetadata {
            timestamp,
            source: vendor,
        },
    }
}

/// The id `normalize` assigns to a device record: the first stable
/// identifier, else the display name. Link builders use this so their
/// endpoints always name a node that exists.
pub fn node_id(vendor: Vendor, record: &RawRecord) -> Option<String> {
    node_identity(&mapping_for(vendor).node, record)
}

fn node_identity(m: &NodeMapping, record: &RawRecord) -> Option<String> {
    record
        .first_str(m.id)
        .map(|id| normalize_identifier(&id))
        .or_else(|| record.first_str(m.name))
}

fn normalize_node(vendor: Vendor, m: &NodeMapping, record: &RawRecord) -> Option<CanonicalNode> {
    let name = record.first_str(m.name);

    let Some(id) = node_identity(m, record) else {
        warn!(%vendor, "skipping device record with no identifier or name");
        return None;
    };

    let kind = record
        .first_str(m.kind)
        .and_then(|k| lookup_value(m.kind_values, &k))
        .unwrap_or(m.default_kind);
    let status = record
        .first_str(m.status)
        .and_then(|s| lookup_value(m.status_values, &s))
        .unwrap_or_default();
    let risk = record
        .first_str(m.risk)
        .and_then(|r| r.parse::<RiskLevel>().ok())
        .unwrap_or_default();

    Some(CanonicalNode {
        name: name.unwrap_or_else(|| id.clone()),
        id,
        kind,
        status,
        vendor,
        mac: record.first_str(m.mac).and_then(|s| MacAddress::parse(&s)),
        serial: record.first_str(m.serial),
        address: record.first_str(m.address),
        model: record.first_str(m.model),
        firmware: record.first_str(m.firmware),
        os_family: record.first_str(m.os_family),
        uptime_secs: record.first_u64(m.uptime),
        risk,
        group: record
            .first_str(m.group)
            .unwrap_or_else(|| DEFAULT_GROUP.to_owned()),
        tags: tags(record, m.tags),
    })
}

fn normalize_link(vendor: Vendor, m: &LinkMapping, record: &RawRecord) -> Option<CanonicalLink> {
    let source = record.first_str(m.source).map(|s| normalize_identifier(&s));
    let target = record.first_str(m.target).map(|t| normalize_identifier(&t));
    let (Some(source), Some(target)) = (source, target) else {
        warn!(%vendor, "skipping link record with a missing endpoint");
        return None;
    };

    Some(CanonicalLink {
        id: CanonicalLink::link_id(&source, &target),
        source,
        target,
        kind: record
            .first_str(m.kind)
            .and_then(|k| lookup_value(m.kind_values, &k))
            .unwrap_or(m.default_kind),
        status: record
            .first_str(m.status)
            .and_then(|s| lookup_value(m.status_values, &s))
            .unwrap_or_default(),
        source_port: record.first_str(m.source_port),
        target_port: record.first_str(m.target_port),
        bandwidth_mbps: m
            .bandwidth
            .iter()
            .find_map(|path| record.lookup(path).and_then(parse_bandwidth_mbps)),
        utilization_pct: record.first_f64(m.utilization),
        latency_ms: record.first_f64(m.latency),
    })
}

/// Tags come as a JSON array of strings or a comma-separated string.
fn tags(record: &RawRecord, paths: &[&str]) -> Vec<String> {
    let Some(value) = paths.iter().find_map(|p| record.lookup(p)) else {
        return Vec::new();
    };
    let raw: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        Value::String(s) => s.split(',').map(str::to_owned).collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse a bandwidth value into megabits per second.
///
/// Numbers are taken as Mbps. Strings accept an optional unit suffix:
/// `"1 Gbps"`, `"100 Mbps"`, `"10G"`, `"2.5 Gbps"`, `"1000"`, `"100full"`.
#[allow(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn parse_bandwidth_mbps(value: &Value) -> Option<u64> {
    let mbps = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            let split = s
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(s.len());
            let (number, unit) = s.split_at(split);
            let number: f64 = number.parse().ok()?;
            let unit = unit.trim();
            let factor = if unit.starts_with('t') {
                1_000_000.0
            } else if unit.starts_with('g') {
                1_000.0
            } else if unit.starts_with('k') {
                0.001
            } else {
                1.0
            };
            number * factor
        }
        _ => return None,
    };

    (mbps.is_finite() && mbps >= 0.0).then(|| mbps.round() as u64)
}
