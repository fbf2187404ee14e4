use serde::Serialize;
use thiserror::Error;

/// Coarse failure taxonomy shared by every layer.
///
/// API errors, core errors, and CLI diagnostics all project onto one of
/// these kinds so callers can branch on "what went wrong" without caring
/// which vendor or transport produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    /// Login failed or a request was rejected after re-authentication.
    Auth,
    /// Throttled twice in a row by the vendor.
    RateLimit,
    /// Timeout, connection failure, or TLS failure.
    Transport,
    /// Malformed or unexpected vendor payload.
    UpstreamData,
    /// Some branches of a multi-step discovery failed.
    PartialDiscovery,
    /// The caller cancelled the operation.
    Cancelled,
    /// Invalid or missing configuration.
    Config,
}

/// Top-level error type for the `topofuse-api` crate.
///
/// Covers every failure mode across the three vendor surfaces:
/// authentication, transport, throttling, vendor payloads, and session
/// persistence. `topofuse-core` attaches vendor/host/operation context.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed, or the vendor kept rejecting the session.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake, certificate, or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Throttling ──────────────────────────────────────────────────
    /// HTTP 429 from the vendor. Includes the advertised retry-after.
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Vendor responses ────────────────────────────────────────────
    /// Non-success status or error envelope from a vendor API.
    #[error("Vendor API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Session persistence ─────────────────────────────────────────
    /// The session store could not be read or written.
    #[error("Session store error: {0}")]
    SessionStore(String),
}

impl Error {
    /// Project this error onto the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Auth,
            Self::Transport(e) if e.is_decode() => ErrorKind::UpstreamData,
            Self::Transport(_) | Self::Timeout { .. } | Self::Tls(_) => ErrorKind::Transport,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Api { .. } | Self::Deserialization { .. } => ErrorKind::UpstreamData,
            Self::InvalidUrl(_) | Self::SessionStore(_) => ErrorKind::Config,
        }
    }

    /// Returns `true` if the vendor signalled throttling.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Classify a `reqwest` send failure, keeping timeouts distinct.
    pub(crate) fn from_send(err: reqwest::Error, timeout: std::time::Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                timeout_secs: timeout.as_secs(),
            }
        } else {
            Self::Transport(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            Error::Authentication {
                message: "nope".into()
            }
            .kind(),
            ErrorKind::Auth
        );
        assert_eq!(
            Error::RateLimited {
                retry_after_secs: 1
            }
            .kind(),
            ErrorKind::RateLimit
        );
        assert_eq!(Error::Timeout { timeout_secs: 30 }.kind(), ErrorKind::Transport);
        assert_eq!(
            Error::Deserialization {
                message: "bad".into(),
                body: String::new()
            }
            .kind(),
            ErrorKind::UpstreamData
        );
    }

    #[test]
    fn kind_displays_kebab_case() {
        assert_eq!(ErrorKind::UpstreamData.to_string(), "upstream-data");
        assert_eq!(ErrorKind::PartialDiscovery.to_string(), "partial-discovery");
    }
}
