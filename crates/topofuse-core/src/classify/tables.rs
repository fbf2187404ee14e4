// ── Classification lookup tables ──
//
// Tables are plain data. The built-in set covers the equipment a retail
// site typically runs; configuration can append or override OUI entries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{DeviceKind, MacAddress};

/// One manufacturer prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OuiEntry {
    /// First three octets in any MAC notation (`00:1A:2B`, `001a2b`).
    pub prefix: String,
    pub kind: DeviceKind,
    pub manufacturer: String,
}

impl OuiEntry {
    pub fn new(prefix: &str, kind: DeviceKind, manufacturer: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            kind,
            manufacturer: manufacturer.to_owned(),
        }
    }

    /// Prefix in `aa:bb:cc` form, or `None` if it is not three octets.
    pub fn normalized_prefix(&self) -> Option<String> {
        MacAddress::parse(&format!("{}000000", self.prefix.replace([':', '-', '.'], "")))
            .map(|mac| mac.oui().to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostnamePattern {
    Prefix(&'static str),
    Contains(&'static str),
}

impl HostnamePattern {
    /// `hostname` must already be lowercase.
    fn matches(&self, hostname: &str) -> bool {
        match self {
            Self::Prefix(p) => hostname.starts_with(p),
            Self::Contains(p) => hostname.contains(p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostnameRule {
    pub pattern: HostnamePattern,
    pub kind: DeviceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerRule {
    /// Lowercase substring.
    pub needle: &'static str,
    pub kind: DeviceKind,
}

/// All lookup tables used by the classification engine.
#[derive(Debug, Clone)]
pub struct ClassificationTables {
    oui: HashMap<String, OuiEntry>,
    hostname: Vec<HostnameRule>,
    manufacturer: Vec<ManufacturerRule>,
}

impl Default for ClassificationTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ClassificationTables {
    pub fn builtin() -> Self {
        let mut tables = Self {
            oui: HashMap::new(),
            hostname: HOSTNAME_RULES
                .iter()
                .map(|(pattern, kind)| HostnameRule {
                    pattern: pattern.clone(),
                    kind: *kind,
                })
                .collect(),
            manufacturer: MANUFACTURER_RULES
                .iter()
                .map(|(needle, kind)| ManufacturerRule {
                    needle: *needle,
                    kind: *kind,
                })
                .collect(),
        };
        tables.extend_oui(
            OUI_TABLE
                .iter()
                .map(|(prefix, kind, name)| OuiEntry::new(prefix, *kind, name)),
        );
        tables
    }

    /// Add OUI entries, replacing any existing entry for the same prefix.
    /// Entries with malformed prefixes are skipped and returned.
    pub fn extend_oui(&mut self, entries: impl IntoIterator<Item = OuiEntry>) -> Vec<OuiEntry> {
        let mut rejected = Vec::new();
        for entry in entries {
            match entry.normalized_prefix() {
                Some(prefix) => {
                    self.oui.insert(prefix, entry);
                }
                None => rejected.push(entry),
            }
        }
        rejected
    }

    pub fn lookup_oui(&self, mac: &MacAddress) -> Option<&OuiEntry> {
        self.oui.get(mac.oui())
    }

    pub fn match_hostname(&self, hostname: &str) -> Option<DeviceKind> {
        let hostname = hostname.trim().to_lowercase();
        if hostname.is_empty() {
            return None;
        }
        self.hostname
            .iter()
            .find(|rule| rule.pattern.matches(&hostname))
            .map(|rule| rule.kind)
    }

    pub fn match_manufacturer(&self, manufacturer: &str) -> Option<DeviceKind> {
        let manufacturer = manufacturer.trim().to_lowercase();
        if manufacturer.is_empty() {
            return None;
        }
        self.manufacturer
            .iter()
            .find(|rule| manufacturer.contains(rule.needle))
            .map(|rule| rule.kind)
    }

    pub fn oui_len(&self) -> usize {
        self.oui.len()
    }
}

// ── Built-in data ───────────────────────────────────────────────────

const OUI_TABLE: &[(&str, DeviceKind, &str)] = &[
    // Store checkout
    ("00:1A:2B", DeviceKind::PosTerminal, "POS terminal"),
    ("00:0B:4F", DeviceKind::PaymentTerminal, "Verifone"),
    ("00:03:81", DeviceKind::PaymentTerminal, "Ingenico"),
    ("00:07:4D", DeviceKind::BarcodeScanner, "Zebra Technologies"),
    // Network infrastructure
    ("00:09:0F", DeviceKind::Firewall, "Fortinet"),
    ("70:4C:A5", DeviceKind::Firewall, "Fortinet"),
    ("90:6C:AC", DeviceKind::Firewall, "Fortinet"),
    ("00:18:0A", DeviceKind::Switch, "Cisco Meraki"),
    ("E0:55:3D", DeviceKind::Switch, "Cisco Meraki"),
    ("88:15:44", DeviceKind::AccessPoint, "Cisco Meraki"),
    ("00:0B:86", DeviceKind::AccessPoint, "Aruba"),
    ("24:DE:C6", DeviceKind::AccessPoint, "Aruba"),
    // Loss prevention
    ("00:40:8C", DeviceKind::Camera, "Axis Communications"),
    ("AC:CC:8E", DeviceKind::Camera, "Axis Communications"),
    ("44:19:B6", DeviceKind::Camera, "Hikvision"),
    // Peripherals
    ("00:00:48", DeviceKind::Printer, "Seiko Epson"),
    ("00:00:74", DeviceKind::Printer, "Ricoh"),
    ("00:04:F2", DeviceKind::VoipPhone, "Polycom"),
    ("00:15:65", DeviceKind::VoipPhone, "Yealink"),
    // Back office and facilities
    ("00:50:56", DeviceKind::Server, "VMware"),
    ("B8:27:EB", DeviceKind::IotSensor, "Raspberry Pi Foundation"),
    ("DC:A6:32", DeviceKind::IotSensor, "Raspberry Pi Trading"),
    ("18:B4:30", DeviceKind::IotSensor, "Nest Labs"),
    ("00:17:88", DeviceKind::IotSensor, "Philips Lighting"),
    ("00:0E:58", DeviceKind::MediaPlayer, "Sonos"),
];

// Evaluated in order; put specific patterns before generic ones.
const HOSTNAME_RULES: &[(HostnamePattern, DeviceKind)] = &[
    (HostnamePattern::Prefix("pos"), DeviceKind::PosTerminal),
    (HostnamePattern::Contains("register"), DeviceKind::PosTerminal),
    (HostnamePattern::Prefix("till"), DeviceKind::PosTerminal),
    (HostnamePattern::Contains("pinpad"), DeviceKind::PaymentTerminal),
    (HostnamePattern::Prefix("pay"), DeviceKind::PaymentTerminal),
    (HostnamePattern::Contains("kiosk"), DeviceKind::Kiosk),
    (HostnamePattern::Prefix("fw"), DeviceKind::Firewall),
    (HostnamePattern::Contains("fortigate"), DeviceKind::Firewall),
    (HostnamePattern::Contains("firewall"), DeviceKind::Firewall),
    (HostnamePattern::Prefix("rtr"), DeviceKind::Router),
    (HostnamePattern::Prefix("sw"), DeviceKind::Switch),
    (HostnamePattern::Contains("switch"), DeviceKind::Switch),
    (HostnamePattern::Prefix("ap-"), DeviceKind::AccessPoint),
    (HostnamePattern::Contains("-ap-"), DeviceKind::AccessPoint),
    (HostnamePattern::Contains("nvr"), DeviceKind::Camera),
    (HostnamePattern::Contains("cam"), DeviceKind::Camera),
    (HostnamePattern::Contains("door"), DeviceKind::AccessControl),
    (HostnamePattern::Contains("iphone"), DeviceKind::Mobile),
    (HostnamePattern::Contains("android"), DeviceKind::Mobile),
    (HostnamePattern::Contains("galaxy"), DeviceKind::Mobile),
    (HostnamePattern::Contains("ipad"), DeviceKind::Tablet),
    (HostnamePattern::Contains("tablet"), DeviceKind::Tablet),
    (HostnamePattern::Contains("printer"), DeviceKind::Printer),
    (HostnamePattern::Prefix("prn"), DeviceKind::Printer),
    (HostnamePattern::Contains("scanner"), DeviceKind::BarcodeScanner),
    (HostnamePattern::Contains("voip"), DeviceKind::VoipPhone),
    (HostnamePattern::Contains("phone"), DeviceKind::VoipPhone),
    (HostnamePattern::Contains("signage"), DeviceKind::DigitalSignage),
    (HostnamePattern::Contains("display"), DeviceKind::DigitalSignage),
    (HostnamePattern::Contains("sonos"), DeviceKind::MediaPlayer),
    (HostnamePattern::Prefix("srv"), DeviceKind::Server),
    (HostnamePattern::Contains("server"), DeviceKind::Server),
    (HostnamePattern::Contains("laptop"), DeviceKind::Laptop),
    (HostnamePattern::Contains("macbook"), DeviceKind::Laptop),
    (HostnamePattern::Contains("desktop"), DeviceKind::Workstation),
    (HostnamePattern::Prefix("ws-"), DeviceKind::Workstation),
    (HostnamePattern::Contains("sensor"), DeviceKind::IotSensor),
    (HostnamePattern::Contains("thermostat"), DeviceKind::IotSensor),
];

const MANUFACTURER_RULES: &[(&str, DeviceKind)] = &[
    ("verifone", DeviceKind::PaymentTerminal),
    ("ingenico", DeviceKind::PaymentTerminal),
    ("pax technology", DeviceKind::PaymentTerminal),
    ("ncr", DeviceKind::PosTerminal),
    ("toshiba global commerce", DeviceKind::PosTerminal),
    ("par technology", DeviceKind::PosTerminal),
    ("fortinet", DeviceKind::Firewall),
    ("palo alto", DeviceKind::Firewall),
    ("sonicwall", DeviceKind::Firewall),
    ("aruba", DeviceKind::AccessPoint),
    ("ruckus", DeviceKind::AccessPoint),
    ("meraki", DeviceKind::Switch),
    ("cisco", DeviceKind::Switch),
    ("juniper", DeviceKind::Switch),
    ("axis", DeviceKind::Camera),
    ("hikvision", DeviceKind::Camera),
    ("hanwha", DeviceKind::Camera),
    ("dahua", DeviceKind::Camera),
    ("zebra", DeviceKind::BarcodeScanner),
    ("honeywell", DeviceKind::BarcodeScanner),
    ("epson", DeviceKind::Printer),
    ("star micronics", DeviceKind::Printer),
    ("brother", DeviceKind::Printer),
    ("ricoh", DeviceKind::Printer),
    ("polycom", DeviceKind::VoipPhone),
    ("yealink", DeviceKind::VoipPhone),
    ("raspberry", DeviceKind::IotSensor),
    ("nest", DeviceKind::IotSensor),
    ("sonos", DeviceKind::MediaPlayer),
    ("vmware", DeviceKind::Server),
    ("supermicro", DeviceKind::Server),
    ("dell", DeviceKind::Workstation),
    ("lenovo", DeviceKind::Workstation),
    ("apple", DeviceKind::Mobile),
    ("samsung", DeviceKind::Mobile),
];

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_prefixes_all_parse() {
        let tables = ClassificationTables::builtin();
        assert_eq!(tables.oui_len(), OUI_TABLE.len());
    }

    #[test]
    fn extend_overrides_and_rejects_malformed() {
        let mut tables = ClassificationTables::builtin();
        let rejected = tables.extend_oui([
            OuiEntry::new("001a2b", DeviceKind::Kiosk, "Self-checkout"),
            OuiEntry::new("nope", DeviceKind::Kiosk, "Broken"),
        ]);
        assert_eq!(rejected.len(), 1);

        let mac = MacAddress::parse("00:1a:2b:99:99:99").unwrap();
        assert_eq!(tables.lookup_oui(&mac).unwrap().kind, DeviceKind::Kiosk);
    }

    #[test]
    fn hostname_rules_are_ordered_and_case_insensitive() {
        let tables = ClassificationTables::builtin();
        assert_eq!(tables.match_hostname("POS-07"), Some(DeviceKind::PosTerminal));
        assert_eq!(tables.match_hostname("Janes-iPhone"), Some(DeviceKind::Mobile));
        assert_eq!(tables.match_hostname("office-phone-2"), Some(DeviceKind::VoipPhone));
        assert_eq!(tables.match_hostname("   "), None);
        assert_eq!(tables.match_hostname("qwerty"), None);
    }
}
