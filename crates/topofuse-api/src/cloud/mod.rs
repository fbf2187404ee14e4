// Cloud-managed switch API
//
// Static API key, no session. Every call passes through the client's
// `RequestGate`, which is the only place throttling is handled.

pub mod client;
pub mod models;

pub use client::CloudClient;
pub use models::{CloudNetwork, CloudOrganization};
