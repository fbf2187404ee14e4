// Direct switch API
//
// Bearer-token REST surface of a stand-alone managed switch. Static API
// tokens are used as-is; password credentials are exchanged for a token.

pub mod auth;
pub mod client;

pub use auth::SwitchAuth;
pub use client::SwitchClient;
