// Domain model: canonical graph, classification, and monitor records.

pub mod classification;
pub mod correlated;
pub mod identity;
pub mod topology;

pub use classification::{Category, ClassificationResult, Confidence, DeviceKind, MatchSource};
pub use correlated::{CorrelatedDevice, TrafficCounters};
pub use identity::{InvalidMac, MacAddress, normalize_identifier};
pub use topology::{
    CanonicalGraph, CanonicalLink, CanonicalNode, DEFAULT_GROUP, GraphMetadata, LinkKind,
    LinkStatus, NodeKind, NodeStatus, RiskLevel,
};
