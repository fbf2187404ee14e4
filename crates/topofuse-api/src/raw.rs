// ── Vendor-shaped records ──
//
// Vendor payloads are kept verbatim as JSON objects. Normalization and
// correlation read them through dotted-path lookups instead of one
// strongly-typed struct per vendor endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One JSON object exactly as a vendor returned it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, returning `None` if it is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Resolve a dotted path (`lldp.systemName`) against nested objects.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.0.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        if current.is_null() { None } else { Some(current) }
    }

    /// First candidate path holding a non-empty string (numbers are stringified).
    pub fn first_str(&self, paths: &[&str]) -> Option<String> {
        paths.iter().find_map(|p| match self.lookup(p)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// First candidate path holding an unsigned integer (numeric strings accepted).
    pub fn first_u64(&self, paths: &[&str]) -> Option<u64> {
        paths.iter().find_map(|p| match self.lookup(p)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// First candidate path holding a float (numeric strings accepted).
    pub fn first_f64(&self, paths: &[&str]) -> Option<f64> {
        paths.iter().find_map(|p| match self.lookup(p)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Split a JSON payload into records, dropping non-object entries.
///
/// Accepts either an array of objects or a single object.
pub fn records_from_value(value: Value) -> Vec<RawRecord> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(RawRecord::from_value).collect(),
        Value::Object(map) => vec![RawRecord(map)],
        _ => Vec::new(),
    }
}
