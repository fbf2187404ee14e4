// ── Hardware identity ──
//
// MAC addresses arrive as `AA:BB:..`, `aa-bb-..`, `aabb.ccdd.eeff`, or bare
// hex depending on the vendor. Everything downstream keys on the
// normalized lowercase colon form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid MAC address: {0:?}")]
pub struct InvalidMac(pub String);

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Parse any common notation. Returns `None` unless exactly twelve hex
    /// digits remain after stripping separators.
    pub fn parse(raw: &str) -> Option<Self> {
        let hex: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.' | ' '))
            .collect();
        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let hex = hex.to_ascii_lowercase();
        let octets: Vec<&str> = (0..6).map(|i| &hex[i * 2..i * 2 + 2]).collect();
        Some(Self(octets.join(":")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Organizationally unique identifier: the first three octets.
    pub fn oui(&self) -> &str {
        &self.0[..8]
    }

    fn first_octet(&self) -> u8 {
        u8::from_str_radix(&self.0[..2], 16).unwrap_or(0)
    }

    /// Randomized / locally assigned addresses carry no vendor information.
    pub fn is_locally_administered(&self) -> bool {
        self.first_octet() & 0x02 != 0
    }

    pub fn is_multicast(&self) -> bool {
        self.first_octet() & 0x01 != 0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = InvalidMac;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidMac(s.to_owned()))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = InvalidMac;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

/// Normalize `raw` to colon form if it is a MAC, otherwise return it trimmed.
///
/// Used for identifiers that may be either a serial or a hardware address.
pub fn normalize_identifier(raw: &str) -> String {
    MacAddress::parse(raw).map_or_else(|| raw.trim().to_owned(), |mac| mac.0)
}
