// ── Core error types ──
//
// Vendor-facing failures are translated here into the shared taxonomy,
// always carrying which vendor, host, and operation produced them.
// Callers never see raw HTTP status codes without that context.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use topofuse_api::{ErrorKind, Vendor};

use crate::discovery::BranchFailure;

/// Where a failure happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    pub vendor: Vendor,
    pub host: String,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(vendor: Vendor, host: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            vendor,
            host: host.into(),
            operation: operation.into(),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.vendor, self.host, self.operation)
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Vendor failures ──────────────────────────────────────────────
    #[error("Authentication failed for {context}: {message}")]
    Auth {
        context: ErrorContext,
        message: String,
    },

    #[error("Rate limited by {context}: retry after {retry_after_secs}s")]
    RateLimit {
        context: ErrorContext,
        retry_after_secs: u64,
    },

    #[error("Cannot reach {context}: {message}")]
    Transport {
        context: ErrorContext,
        message: String,
    },

    #[error("Request to {context} timed out after {timeout_secs}s")]
    Timeout {
        context: ErrorContext,
        timeout_secs: u64,
    },

    #[error("Unexpected response from {context}: {message}")]
    UpstreamData {
        context: ErrorContext,
        message: String,
        status: Option<u16>,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("{operation} was cancelled")]
    Cancelled { operation: String },

    #[error("No {vendor} connection is configured")]
    NotConfigured { vendor: Vendor },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Wrap an API error with the context it occurred in.
    pub fn from_api(err: topofuse_api::Error, context: ErrorContext) -> Self {
        if let topofuse_api::Error::Timeout { timeout_secs } = err {
            return Self::Timeout {
                context,
                timeout_secs,
            };
        }
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Auth => Self::Auth { context, message },
            ErrorKind::RateLimit => Self::RateLimit {
                context,
                retry_after_secs: match err {
                    topofuse_api::Error::RateLimited { retry_after_secs } => retry_after_secs,
                    _ => 0,
                },
            },
            ErrorKind::Transport => Self::Transport { context, message },
            ErrorKind::Config => Self::Config {
                message: format!("{context}: {message}"),
            },
            ErrorKind::UpstreamData | ErrorKind::PartialDiscovery | ErrorKind::Cancelled => {
                Self::UpstreamData {
                    context,
                    message,
                    status: err.status(),
                }
            }
        }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { .. } => ErrorKind::Auth,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::Transport { .. } | Self::Timeout { .. } => ErrorKind::Transport,
            Self::UpstreamData { .. } => ErrorKind::UpstreamData,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::NotConfigured { .. } | Self::Config { .. } => ErrorKind::Config,
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::Auth { context, .. }
            | Self::RateLimit { context, .. }
            | Self::Transport { context, .. }
            | Self::Timeout { context, .. }
            | Self::UpstreamData { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Attach vendor/host/operation context to API results.
pub trait ApiResultExt<T> {
    fn context(
        self,
        vendor: Vendor,
        host: &str,
        operation: &str,
    ) -> Result<T, CoreError>;
}

impl<T> ApiResultExt<T> for Result<T, topofuse_api::Error> {
    fn context(self, vendor: Vendor, host: &str, operation: &str) -> Result<T, CoreError> {
        self.map_err(|e| CoreError::from_api(e, ErrorContext::new(vendor, host, operation)))
    }
}

/// A discovery that finished with some failed branches, for callers that
/// asked for all-or-nothing results. The successful subset is kept.
#[derive(Debug, Error)]
#[error("Discovery incomplete: {} branch(es) failed", failures.len())]
pub struct PartialDiscoveryError<T: fmt::Debug> {
    pub data: T,
    pub failures: Vec<BranchFailure>,
}

impl<T: fmt::Debug> PartialDiscoveryError<T> {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::PartialDiscovery
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ErrorContext {
        ErrorContext::new(Vendor::CloudSwitch, "api.cloud.example", "list organizations")
    }

    #[test]
    fn api_errors_keep_their_kind_and_context() {
        let err = CoreError::from_api(
            topofuse_api::Error::Authentication {
                message: "bad key".into(),
            },
            ctx(),
        );
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(err.context().map(|c| c.operation.as_str()), Some("list organizations"));
        assert!(err.to_string().contains("cloud-switch api.cloud.example"));
    }

    #[test]
    fn rate_limit_carries_retry_after() {
        let result: Result<(), _> = Err(topofuse_api::Error::RateLimited {
            retry_after_secs: 4,
        });
        match result.context(Vendor::CloudSwitch, "h", "list networks") {
            Err(CoreError::RateLimit {
                retry_after_secs, ..
            }) => assert_eq!(retry_after_secs, 4),
            other => panic!("expected RateLimit, got {other:?}"),
        }
    }

    #[test]
    fn deserialization_is_upstream_data() {
        let err = CoreError::from_api(
            topofuse_api::Error::Deserialization {
                message: "expected array".into(),
                body: "{}".into(),
            },
            ctx(),
        );
        assert_eq!(err.kind(), ErrorKind::UpstreamData);
    }

    #[test]
    fn timeouts_stay_distinct_from_connection_failures() {
        let err = CoreError::from_api(topofuse_api::Error::Timeout { timeout_secs: 30 }, ctx());
        assert!(matches!(err, CoreError::Timeout { timeout_secs: 30, .. }));
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.context().is_some());
    }
}
