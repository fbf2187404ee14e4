// Topology normalization: per-vendor field tables and the pure transform.

pub mod mapping;
pub mod normalizer;

pub use mapping::{VendorMapping, mapping_for};
pub use normalizer::{node_id, normalize, normalize_at, parse_bandwidth_mbps};
