//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use topofuse_config::ConfigError;
use topofuse_core::{CoreError, PartialDiscoveryError, Vendor};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const RATE_LIMIT: i32 = 5;
    pub const PARTIAL: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach {target}")]
    #[diagnostic(
        code(topofuse::connection_failed),
        help(
            "Check that the device is reachable from this host.\n\
             Self-signed firewall certificates need `insecure = true` or `ca_cert` in the profile.\n\
             {reason}"
        )
    )]
    ConnectionFailed { target: String, reason: String },

    #[error("Request to {target} timed out after {seconds}s")]
    #[diagnostic(
        code(topofuse::timeout),
        help("Increase the timeout with --timeout or `timeout` in the vendor section.")
    )]
    Timeout { target: String, seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed for {target}")]
    #[diagnostic(
        code(topofuse::auth_failed),
        help("Verify the username and secret for this vendor.\n{reason}")
    )]
    AuthFailed { target: String, reason: String },

    #[error("No {vendor} credentials for profile '{profile}'")]
    #[diagnostic(
        code(topofuse::no_credentials),
        help(
            "Set `secret_env` to an environment variable holding the secret,\n\
             store it in the system keyring as topofuse / {profile}/{vendor},\n\
             or set `secret` in the profile."
        )
    )]
    NoCredentials { profile: String, vendor: String },

    // ── Throttling ───────────────────────────────────────────────────
    #[error("Rate limited by {target}")]
    #[diagnostic(
        code(topofuse::rate_limited),
        help(
            "The vendor asked to retry after {retry_after_secs}s.\n\
             Lower --concurrency or raise `gate.min_interval` in the profile."
        )
    )]
    RateLimited {
        target: String,
        retry_after_secs: u64,
    },

    // ── Vendor data ──────────────────────────────────────────────────
    #[error("Unexpected response from {target}: {message}")]
    #[diagnostic(code(topofuse::upstream_data))]
    UpstreamData { target: String, message: String },

    #[error("Discovery incomplete: {failed} branch(es) failed")]
    #[diagnostic(
        code(topofuse::partial_discovery),
        help("First failure: {first}\nDrop --strict to print the healthy subset.")
    )]
    PartialDiscovery { failed: usize, first: String },

    // ── Operation ────────────────────────────────────────────────────
    #[error("{operation} was cancelled")]
    #[diagnostic(code(topofuse::cancelled))]
    Cancelled { operation: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No {vendor} connection is configured")]
    #[diagnostic(
        code(topofuse::not_configured),
        help("Add a [profiles.<name>.{section}] table to the config file (see: topofuse config path).")
    )]
    NotConfigured { vendor: String, section: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(topofuse::profile_not_found),
        help("List profiles with: topofuse config show")
    )]
    ProfileNotFound { name: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(topofuse::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(topofuse::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(topofuse::io))]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(topofuse::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::RateLimited { .. } => exit_code::RATE_LIMIT,
            Self::PartialDiscovery { .. } => exit_code::PARTIAL,
            Self::Cancelled { .. } => exit_code::CANCELLED,
            Self::NotConfigured { .. } | Self::ProfileNotFound { .. } | Self::Validation { .. } => {
                exit_code::USAGE
            }
            Self::UpstreamData { .. } | Self::Config(_) | Self::Io(_) | Self::Render(_) => {
                exit_code::GENERAL
            }
        }
    }
}

/// Profile table name for a vendor.
pub fn section_name(vendor: Vendor) -> &'static str {
    match vendor {
        Vendor::FirewallController => "firewall",
        Vendor::DirectSwitch => "switch",
        Vendor::CloudSwitch => "cloud",
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Auth { context, message } => Self::AuthFailed {
                target: context.to_string(),
                reason: message,
            },
            CoreError::RateLimit {
                context,
                retry_after_secs,
            } => Self::RateLimited {
                target: context.to_string(),
                retry_after_secs,
            },
            CoreError::Transport { context, message } => Self::ConnectionFailed {
                target: context.to_string(),
                reason: message,
            },
            CoreError::Timeout {
                context,
                timeout_secs,
            } => Self::Timeout {
                target: context.to_string(),
                seconds: timeout_secs,
            },
            CoreError::UpstreamData {
                context, message, ..
            } => Self::UpstreamData {
                target: context.to_string(),
                message,
            },
            CoreError::Cancelled { operation } => Self::Cancelled { operation },
            CoreError::NotConfigured { vendor } => Self::NotConfigured {
                vendor: vendor.to_string(),
                section: section_name(vendor).into(),
            },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile, vendor } => Self::NoCredentials {
                profile,
                vendor: vendor.to_string(),
            },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound { name },
            ConfigError::Serialization(e) => Self::Render(e.to_string()),
            ConfigError::Figment(e) => Self::Config(e),
        }
    }
}

impl<T: std::fmt::Debug> From<PartialDiscoveryError<T>> for CliError {
    fn from(err: PartialDiscoveryError<T>) -> Self {
        Self::PartialDiscovery {
            failed: err.failures.len(),
            first: err
                .failures
                .first()
                .map_or_else(String::new, ToString::to_string),
        }
    }
}
