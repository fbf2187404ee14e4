// Firewall controller API
//
// Cookie-session REST surface of the store firewall. Every call runs
// through the shared `SessionManager` so expiry and 401s are handled
// below the endpoint methods.

pub mod auth;
pub mod client;

pub use auth::{FirewallAuth, SESSION_COOKIE_PREFIX};
pub use client::FirewallClient;
