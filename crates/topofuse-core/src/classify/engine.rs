// ── Classification engine ──
//
// First match wins: OUI prefix (high), hostname pattern (medium),
// manufacturer substring (low), else unknown (low). Pure over its tables.

use tracing::trace;

use super::tables::{ClassificationTables, OuiEntry};
use crate::model::{ClassificationResult, Confidence, MacAddress, MatchSource};

#[derive(Debug, Clone, Default)]
pub struct ClassificationEngine {
    tables: ClassificationTables,
}

impl ClassificationEngine {
    pub fn new(tables: ClassificationTables) -> Self {
        Self { tables }
    }

    /// Built-in tables plus configured OUI entries. Malformed entries are
    /// returned so the caller can report them.
    pub fn with_extra_oui(extra: Vec<OuiEntry>) -> (Self, Vec<OuiEntry>) {
        let mut tables = ClassificationTables::builtin();
        let rejected = tables.extend_oui(extra);
        (Self::new(tables), rejected)
    }

    pub fn tables(&self) -> &ClassificationTables {
        &self.tables
    }

    pub fn classify(
        &self,
        mac: &str,
        hostname: Option<&str>,
        manufacturer: Option<&str>,
    ) -> ClassificationResult {
        let manufacturer = manufacturer
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_owned);

        // Randomized addresses would match whatever vendor owns the bits.
        let vendor_mac = MacAddress::parse(mac).filter(|m| !m.is_locally_administered());
        if let Some(entry) = vendor_mac.as_ref().and_then(|m| self.tables.lookup_oui(m)) {
            trace!(mac, manufacturer = %entry.manufacturer, "oui match");
            return ClassificationResult::new(
                entry.kind,
                Confidence::High,
                MatchSource::Oui,
                Some(entry.manufacturer.clone()),
            );
        }

        if let Some(kind) = hostname.and_then(|h| self.tables.match_hostname(h)) {
            trace!(mac, ?hostname, %kind, "hostname match");
            return ClassificationResult::new(kind, Confidence::Medium, MatchSource::Hostname, manufacturer);
        }

        if let Some(kind) = manufacturer
            .as_deref()
            .and_then(|m| self.tables.match_manufacturer(m))
        {
            trace!(mac, ?manufacturer, %kind, "manufacturer match");
            return ClassificationResult::new(
                kind,
                Confidence::Low,
                MatchSource::Manufacturer,
                manufacturer,
            );
        }

        ClassificationResult::unknown(manufacturer)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Category, DeviceKind, RiskLevel};

    fn engine() -> ClassificationEngine {
        ClassificationEngine::default()
    }

    #[test]
    fn known_prefix_is_high_confidence() {
        let result = engine().classify("00:1A:2B:10:20:30", None, None);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.source, MatchSource::Oui);
        assert_eq!(result.kind, DeviceKind::PosTerminal);
        assert_eq!(result.risk(), RiskLevel::High);
    }

    #[test]
    fn unknown_prefix_falls_back_to_hostname() {
        let result = engine().classify("3c:22:fb:10:20:30", Some("pos-07"), None);
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.kind, DeviceKind::PosTerminal);
        assert_eq!(result.category, Category::PointOfSale);
    }

    #[test]
    fn oui_beats_hostname() {
        let result = engine().classify("00:40:8c:00:00:01", Some("pos-01"), None);
        assert_eq!(result.kind, DeviceKind::Camera);
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn randomized_mac_skips_oui() {
        // 02:... has the locally administered bit set even if the rest collides.
        let result = engine().classify("02:1a:2b:00:00:01", None, Some("Apple, Inc."));
        assert_eq!(result.source, MatchSource::Manufacturer);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.kind, DeviceKind::Mobile);
    }

    #[test]
    fn nothing_matches_is_unknown_low() {
        let result = engine().classify("garbage", Some("qwerty"), Some("  "));
        assert_eq!(result, ClassificationResult::unknown(None));
        assert_eq!(result.risk(), RiskLevel::Unknown);
    }

    #[test]
    fn classify_is_referentially_transparent() {
        let e = engine();
        let inputs = [
            ("00:0b:4f:01:02:03", None, None),
            ("3c:22:fb:10:20:30", Some("register-3"), Some("NCR")),
            ("ff:ff:ff:ff:ff:ff", None, Some("Zebra")),
        ];
        for (mac, host, maker) in inputs {
            assert_eq!(e.classify(mac, host, maker), e.classify(mac, host, maker));
        }
    }

    #[test]
    fn configured_oui_is_honored() {
        let (e, rejected) = ClassificationEngine::with_extra_oui(vec![OuiEntry::new(
            "3C:22:FB",
            DeviceKind::Kiosk,
            "Self-checkout vendor",
        )]);
        assert!(rejected.is_empty());
        let result = e.classify("3c:22:fb:10:20:30", None, None);
        assert_eq!(result.kind, DeviceKind::Kiosk);
        assert_eq!(result.manufacturer.as_deref(), Some("Self-checkout vendor"));
    }
}
