//! Domain layer between `topofuse-api` and the CLI.
//!
//! Turns three vendors' inventories into one canonical picture of a
//! store's network:
//!
//! - **[`Aggregator`]**: Facade built once from an [`AggregatorConfig`].
//!   Answers [`topology()`](Aggregator::topology) for any configured vendor
//!   and [`monitored_devices()`](Aggregator::monitored_devices) for the
//!   firewall's detected-device feed.
//!
//! - **[`CloudDiscovery`]**: Walks organizations → networks → devices →
//!   ports through the cloud gate with bounded fan-out. Branch failures are
//!   collected in a [`Discovery`] instead of aborting the walk.
//!
//! - **Normalizer** ([`normalize`]): Table-driven mapping from vendor
//!   records to [`CanonicalGraph`] with stable node and link ids.
//!
//! - **[`ClassificationEngine`]**: OUI, hostname, and manufacturer tables
//!   yielding a [`DeviceKind`], its category, and a [`RiskLevel`].
//!
//! - **[`Correlator`]**: Joins detected devices with port counters.

pub mod aggregator;
pub mod classify;
pub mod config;
pub mod discovery;
pub mod error;
pub mod model;
pub mod monitor;
pub mod normalize;
pub mod sources;

// ── Primary re-exports ──────────────────────────────────────────────
pub use aggregator::{Aggregator, TopologyQuery};
pub use classify::{ClassificationEngine, ClassificationTables, OuiEntry, risk_tier};
pub use config::{
    AggregatorConfig, CloudConfig, FirewallConfig, MonitorConfig, SessionConfig,
    SessionStoreConfig, VendorEndpoint,
};
pub use discovery::{
    BranchFailure, BranchScope, CloudDiscovery, DEFAULT_CONCURRENCY, DiscoveredFleet, Discovery,
    ScopeFilter,
};
pub use error::{ApiResultExt, CoreError, ErrorContext, PartialDiscoveryError};
pub use monitor::{Correlator, DEFAULT_ACTIVE_THRESHOLD, PortStatsIndex};
pub use normalize::{normalize, normalize_at};
pub use sources::{FirewallSource, SwitchSource};

pub use model::{
    CanonicalGraph, CanonicalLink, CanonicalNode, Category, ClassificationResult, Confidence,
    CorrelatedDevice, DeviceKind, GraphMetadata, LinkKind, LinkStatus, MacAddress, MatchSource,
    NodeKind, NodeStatus, RiskLevel, TrafficCounters,
};

// Vendor-level types callers need to build a config.
pub use topofuse_api::{
    Credential, CredentialSecret, ErrorKind, GateConfig, SessionState, TlsMode, TransportConfig,
    Vendor,
};
