// topofuse-api: Async vendor clients, session lifecycle, and request gating

pub mod auth;
pub mod cloud;
pub mod error;
pub mod firewall;
pub mod gate;
pub mod raw;
mod response;
pub mod session;
pub mod switch;
pub mod transport;

pub use auth::{AuthStrategy, Credential, CredentialSecret, SessionTuple, Vendor};
pub use cloud::{CloudClient, CloudNetwork, CloudOrganization};
pub use error::{Error, ErrorKind};
pub use firewall::{FirewallAuth, FirewallClient};
pub use gate::{GateConfig, RequestGate};
pub use raw::RawRecord;
pub use session::{
    AuthAttempt, Authenticator, FileSessionStore, LoginGrant, MemorySessionStore, Session,
    SessionBackend, SessionManager, SessionState, SessionStore,
};
pub use switch::{SwitchAuth, SwitchClient};
pub use transport::{TlsMode, TransportConfig};
