// ── Device classification types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::topology::RiskLevel;

/// What a detected device is. Closed set; tables map onto it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum DeviceKind {
    PosTerminal,
    PaymentTerminal,
    Kiosk,
    Firewall,
    Router,
    Switch,
    AccessPoint,
    Camera,
    AccessControl,
    Server,
    Workstation,
    Laptop,
    IotSensor,
    Printer,
    BarcodeScanner,
    VoipPhone,
    DigitalSignage,
    MediaPlayer,
    Mobile,
    Tablet,
    Unknown,
}

/// Coarse grouping used for risk scoring.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Category {
    Payment,
    PointOfSale,
    NetworkInfrastructure,
    Security,
    Compute,
    Iot,
    Peripheral,
    Media,
    Mobile,
    Unknown,
}

impl DeviceKind {
    pub fn category(self) -> Category {
        match self {
            Self::PaymentTerminal => Category::Payment,
            Self::PosTerminal | Self::Kiosk => Category::PointOfSale,
            Self::Firewall | Self::Router | Self::Switch | Self::AccessPoint => {
                Category::NetworkInfrastructure
            }
            Self::Camera | Self::AccessControl => Category::Security,
            Self::Server | Self::Workstation | Self::Laptop => Category::Compute,
            Self::IotSensor => Category::Iot,
            Self::Printer | Self::BarcodeScanner | Self::VoipPhone => Category::Peripheral,
            Self::DigitalSignage | Self::MediaPlayer => Category::Media,
            Self::Mobile | Self::Tablet => Category::Mobile,
            Self::Unknown => Category::Unknown,
        }
    }

    /// Icon hint for presentation layers.
    pub fn icon(self) -> &'static str {
        match self {
            Self::PosTerminal => "cash-register",
            Self::PaymentTerminal => "credit-card",
            Self::Kiosk => "kiosk",
            Self::Firewall => "shield",
            Self::Router => "router",
            Self::Switch => "switch",
            Self::AccessPoint => "wifi",
            Self::Camera => "camera",
            Self::AccessControl => "door",
            Self::Server => "server",
            Self::Workstation => "desktop",
            Self::Laptop => "laptop",
            Self::IotSensor => "sensor",
            Self::Printer => "printer",
            Self::BarcodeScanner => "barcode",
            Self::VoipPhone => "phone",
            Self::DigitalSignage => "display",
            Self::MediaPlayer => "speaker",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Unknown => "question",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Which table produced the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MatchSource {
    Oui,
    Hostname,
    Manufacturer,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub kind: DeviceKind,
    pub category: Category,
    pub icon: &'static str,
    pub confidence: Confidence,
    pub source: MatchSource,
    pub manufacturer: Option<String>,
}

impl ClassificationResult {
    pub fn new(
        kind: DeviceKind,
        confidence: Confidence,
        source: MatchSource,
        manufacturer: Option<String>,
    ) -> Self {
        Self {
            kind,
            category: kind.category(),
            icon: kind.icon(),
            confidence,
            source,
            manufacturer,
        }
    }

    pub fn unknown(manufacturer: Option<String>) -> Self {
        Self::new(DeviceKind::Unknown, Confidence::Low, MatchSource::None, manufacturer)
    }

    pub fn risk(&self) -> RiskLevel {
        crate::classify::risk_tier(self.category)
    }
}
