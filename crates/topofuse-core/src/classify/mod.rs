// Device classification: lookup tables, engine, and risk tiers.

pub mod engine;
pub mod risk;
pub mod tables;

pub use engine::ClassificationEngine;
pub use risk::risk_tier;
pub use tables::{ClassificationTables, HostnamePattern, OuiEntry};
