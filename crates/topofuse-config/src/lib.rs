//! Profile configuration for topofuse.
//!
//! TOML profiles (one per brand), credential resolution (env + keyring +
//! plaintext), and translation to `topofuse_core::AggregatorConfig`. The
//! CLI layers its flag overrides on top of what this crate produces.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use topofuse_core::{
    AggregatorConfig, CloudConfig, Credential, CredentialSecret, FirewallConfig, GateConfig,
    MonitorConfig, OuiEntry, SessionConfig, SessionStoreConfig, TlsMode, TransportConfig, Vendor,
    VendorEndpoint,
};

/// Keyring service every secret is filed under.
pub const KEYRING_SERVICE: &str = "topofuse";

/// Environment prefix; nested keys are separated by a double underscore
/// (`TOPOFUSE_DEFAULTS__TIMEOUT`).
pub const ENV_PREFIX: &str = "TOPOFUSE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {vendor} credentials configured for profile '{profile}'")]
    NoCredentials { profile: String, vendor: Vendor },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// One profile per brand.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, else `default_profile`, else `"default"`.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name, p))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }

    /// Copy with every plaintext secret masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for profile in copy.profiles.values_mut() {
            for section in [&mut profile.firewall, &mut profile.switch, &mut profile.cloud]
                .into_iter()
                .flatten()
            {
                if section.secret.is_some() {
                    section.secret = Some("********".into());
                }
            }
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-request timeout, e.g. `"30s"`.
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> String {
    "30s".into()
}

/// One brand's set of vendor endpoints and tuning.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    pub firewall: Option<VendorSection>,
    pub switch: Option<VendorSection>,
    pub cloud: Option<VendorSection>,

    #[serde(default)]
    pub session: SessionSection,

    #[serde(default)]
    pub gate: GateSection,

    #[serde(default)]
    pub discovery: DiscoverySection,

    #[serde(default)]
    pub monitor: MonitorSection,

    #[serde(default)]
    pub classification: ClassificationSection,
}

/// How the configured secret is presented to the vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretKind {
    /// Exchanged for a session at login.
    #[default]
    Password,
    /// Used directly as the session key.
    Token,
}

/// Connection settings for one vendor endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VendorSection {
    /// Base URL, e.g. `"https://10.20.0.1"`.
    pub url: String,

    /// Login name. Not needed for the cloud API.
    pub username: Option<String>,

    #[serde(default)]
    pub secret_kind: SecretKind,

    /// Environment variable holding the secret.
    pub secret_env: Option<String>,

    /// Plaintext secret (prefer the keyring or an env var).
    pub secret: Option<String>,

    /// Firewall virtual domain.
    pub vdom: Option<String>,

    /// Accept self-signed certificates.
    pub insecure: Option<bool>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override the default timeout.
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionSection {
    /// Session lifetime, e.g. `"30m"`.
    pub ttl: Option<String>,

    #[serde(default)]
    pub store: StoreKind,

    /// Directory for the file store; defaults to the platform data dir.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GateSection {
    pub min_interval: Option<String>,
    pub backoff: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DiscoverySection {
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MonitorSection {
    pub active_threshold: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClassificationSection {
    #[serde(default)]
    pub oui: Vec<OuiEntry>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "topofuse", "topofuse")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default directory for the shared file session store.
pub fn default_session_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("sessions"),
        |dirs| dirs.data_dir().join("sessions"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("topofuse");
    p
}

// ── Loading ─────────────────────────────────────────────────────────

/// Defaults, then the TOML file at `path`, then `TOPOFUSE_` env vars.
pub fn figment_for(path: &std::path::Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the full config from the canonical file and the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&figment_for(&config_path()))
}

/// Load from an explicit figment (tests, `--config` overrides).
pub fn load_config_from(figment: &Figment) -> Result<Config, ConfigError> {
    Ok(figment.extract()?)
}

/// Parse a human duration (`"30m"`, `"200ms"`), naming the field on error.
pub fn parse_duration(field: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|e| invalid(field, format!("'{raw}': {e}")))
}

fn optional_duration(field: &str, raw: Option<&String>) -> Result<Option<Duration>, ConfigError> {
    raw.map(|r| parse_duration(field, r)).transpose()
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a vendor secret: named env var, then the system keyring
/// (`topofuse` / `{profile}/{vendor}`), then plaintext.
pub fn resolve_secret(
    section: &VendorSection,
    profile_name: &str,
    vendor: Vendor,
) -> Result<SecretString, ConfigError> {
    // 1. Env var named by the profile
    if let Some(ref env_name) = section.secret_env {
        if let Ok(val) = std::env::var(env_name) {
            debug!(%vendor, env = %env_name, "secret from environment");
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_entry(profile_name, vendor)) {
        if let Ok(secret) = entry.get_password() {
            debug!(%vendor, "secret from keyring");
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref secret) = section.secret {
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
        vendor,
    })
}

/// Keyring account name for a profile's vendor secret.
pub fn keyring_entry(profile_name: &str, vendor: Vendor) -> String {
    format!("{profile_name}/{vendor}")
}

/// Build the vendor credential for one section.
pub fn resolve_credential(
    section: &VendorSection,
    profile_name: &str,
    vendor: Vendor,
) -> Result<Credential, ConfigError> {
    let field = format!("{vendor}.url");
    let host: Url = section
        .url
        .parse()
        .map_err(|e| invalid(&field, format!("'{}': {e}", section.url)))?;

    let username = match (vendor, &section.username) {
        (_, Some(user)) => user.clone(),
        (Vendor::CloudSwitch, None) => String::new(),
        (_, None) => return Err(invalid(format!("{vendor}.username"), "required")),
    };

    let secret = resolve_secret(section, profile_name, vendor)?;
    let secret = match section.secret_kind {
        SecretKind::Password => CredentialSecret::Password(secret),
        SecretKind::Token => CredentialSecret::Token(secret),
    };

    Ok(Credential::new(vendor, host, username, secret))
}

fn transport(
    section: &VendorSection,
    vendor: Vendor,
    default_timeout: Duration,
) -> Result<TransportConfig, ConfigError> {
    let tls = if section.insecure.unwrap_or(false) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = section.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else if vendor == Vendor::CloudSwitch {
        TlsMode::System
    } else {
        // Store firewalls and switches ship self-signed certificates.
        TlsMode::DangerAcceptInvalid
    };

    let timeout = optional_duration(&format!("{vendor}.timeout"), section.timeout.as_ref())?
        .unwrap_or(default_timeout);
    Ok(TransportConfig::new(tls, timeout))
}

fn endpoint(
    section: &VendorSection,
    profile_name: &str,
    vendor: Vendor,
    default_timeout: Duration,
) -> Result<VendorEndpoint, ConfigError> {
    Ok(VendorEndpoint {
        credential: resolve_credential(section, profile_name, vendor)?,
        transport: transport(section, vendor, default_timeout)?,
    })
}

// ── Translation ─────────────────────────────────────────────────────

/// Build an `AggregatorConfig` from a profile and the global defaults.
pub fn profile_to_aggregator_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<AggregatorConfig, ConfigError> {
    let timeout = parse_duration("defaults.timeout", &defaults.timeout)?;

    let firewall = profile
        .firewall
        .as_ref()
        .map(|s| {
            Ok::<_, ConfigError>(FirewallConfig {
                endpoint: endpoint(s, profile_name, Vendor::FirewallController, timeout)?,
                vdom: s.vdom.clone(),
            })
        })
        .transpose()?;

    let switch = profile
        .switch
        .as_ref()
        .map(|s| endpoint(s, profile_name, Vendor::DirectSwitch, timeout))
        .transpose()?;

    let gate = gate_config(&profile.gate)?;
    let cloud = profile
        .cloud
        .as_ref()
        .map(|s| -> Result<CloudConfig, ConfigError> {
            let mut cloud = CloudConfig::new(endpoint(s, profile_name, Vendor::CloudSwitch, timeout)?);
            cloud.gate = gate;
            if let Some(concurrency) = profile.discovery.concurrency {
                if concurrency == 0 {
                    return Err(invalid("discovery.concurrency", "must be at least 1"));
                }
                cloud.concurrency = concurrency;
            }
            Ok(cloud)
        })
        .transpose()?;

    let mut session = SessionConfig::default();
    if let Some(ttl) = optional_duration("session.ttl", profile.session.ttl.as_ref())? {
        session.ttl = ttl;
    }
    session.store = match profile.session.store {
        StoreKind::Memory => SessionStoreConfig::Memory,
        StoreKind::File => SessionStoreConfig::File(
            profile
                .session
                .path
                .clone()
                .unwrap_or_else(default_session_dir),
        ),
    };

    let mut monitor = MonitorConfig::default();
    if let Some(threshold) = optional_duration(
        "monitor.active_threshold",
        profile.monitor.active_threshold.as_ref(),
    )? {
        monitor.active_threshold = threshold;
    }

    Ok(AggregatorConfig {
        firewall,
        switch,
        cloud,
        session,
        monitor,
        extra_oui: profile.classification.oui.clone(),
    })
}

fn gate_config(section: &GateSection) -> Result<GateConfig, ConfigError> {
    let mut gate = GateConfig::default();
    if let Some(interval) = optional_duration("gate.min_interval", section.min_interval.as_ref())? {
        gate.min_interval = interval;
    }
    if let Some(backoff) = optional_duration("gate.backoff", section.backoff.as_ref())? {
        gate.backoff = backoff;
    }
    Ok(gate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;
    use topofuse_core::DeviceKind;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "brand-east"

[defaults]
timeout = "15s"

[profiles.brand-east.firewall]
url = "https://10.20.0.1"
username = "api-admin"
secret = "fw-password"
vdom = "root"

[profiles.brand-east.cloud]
url = "https://api.cloud.example/api/v1/"
secret_kind = "token"
secret_env = "TOPOFUSE_TEST_UNSET_CLOUD_KEY"
secret = "cloud-key"
timeout = "45s"

[profiles.brand-east.session]
ttl = "20m"
store = "file"
path = "/var/lib/topofuse/sessions"

[profiles.brand-east.gate]
min_interval = "250ms"

[profiles.brand-east.discovery]
concurrency = 8

[profiles.brand-east.monitor]
active_threshold = "10m"

[[profiles.brand-east.classification.oui]]
prefix = "AC:DE:48"
kind = "kiosk"
manufacturer = "Self-checkout kiosk"
"#;

    fn sample() -> Config {
        load_config_from(
            &Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Toml::string(SAMPLE)),
        )
        .unwrap()
    }

    #[test]
    fn default_profile_is_selected() {
        let config = sample();
        let (name, profile) = config.profile(None).unwrap();
        assert_eq!(name, "brand-east");
        assert!(profile.switch.is_none());
        assert!(matches!(
            config.profile(Some("brand-west")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn profile_translates_to_aggregator_config() {
        let config = sample();
        let (name, profile) = config.profile(None).unwrap();
        let agg = profile_to_aggregator_config(profile, name, &config.defaults).unwrap();

        let fw = agg.firewall.unwrap();
        assert_eq!(fw.vdom.as_deref(), Some("root"));
        assert_eq!(fw.endpoint.transport.timeout, Duration::from_secs(15));
        assert_eq!(fw.endpoint.transport.tls, TlsMode::DangerAcceptInvalid);

        let cloud = agg.cloud.unwrap();
        assert_eq!(cloud.concurrency, 8);
        assert_eq!(cloud.gate.min_interval, Duration::from_millis(250));
        assert_eq!(cloud.gate.backoff, GateConfig::default().backoff);
        assert_eq!(cloud.endpoint.transport.timeout, Duration::from_secs(45));
        assert_eq!(cloud.endpoint.transport.tls, TlsMode::System);
        match &cloud.endpoint.credential.secret {
            CredentialSecret::Token(key) => assert_eq!(key.expose_secret(), "cloud-key"),
            CredentialSecret::Password(_) => panic!("expected a token secret"),
        }

        assert_eq!(agg.session.ttl, Duration::from_secs(20 * 60));
        assert_eq!(
            agg.session.store,
            SessionStoreConfig::File(PathBuf::from("/var/lib/topofuse/sessions"))
        );
        assert_eq!(agg.monitor.active_threshold, Duration::from_secs(600));
        assert_eq!(agg.extra_oui.len(), 1);
        assert_eq!(agg.extra_oui[0].kind, DeviceKind::Kiosk);
    }

    #[test]
    fn missing_secret_is_reported() {
        let section = VendorSection {
            url: "https://10.20.0.2".into(),
            username: Some("admin".into()),
            ..VendorSection::default()
        };
        let result = resolve_secret(&section, "topofuse-test-no-such-profile", Vendor::DirectSwitch);
        assert!(matches!(result, Err(ConfigError::NoCredentials { .. })));
    }

    #[test]
    fn switch_requires_username() {
        let section = VendorSection {
            url: "https://10.20.0.2".into(),
            secret: Some("pw".into()),
            ..VendorSection::default()
        };
        let result = resolve_credential(&section, "p", Vendor::DirectSwitch);
        assert!(matches!(result, Err(ConfigError::Validation { ref field, .. }) if field == "direct-switch.username"));
    }

    #[test]
    fn bad_duration_names_the_field() {
        let err = parse_duration("session.ttl", "soon").unwrap_err();
        assert!(err.to_string().contains("session.ttl"));
        assert_eq!(parse_duration("x", "200ms").unwrap(), Duration::from_millis(200));
    }

    #[test]
    fn redaction_masks_plaintext_secrets() {
        let shown = sample().redacted().to_toml().unwrap();
        assert!(!shown.contains("fw-password"));
        assert!(!shown.contains("cloud-key"));
        assert!(shown.contains("********"));
    }

    #[test]
    fn file_store_defaults_to_data_dir() {
        let profile = Profile {
            session: SessionSection {
                store: StoreKind::File,
                ..SessionSection::default()
            },
            ..Profile::default()
        };
        let agg = profile_to_aggregator_config(&profile, "p", &Defaults::default()).unwrap();
        assert_eq!(agg.session.store, SessionStoreConfig::File(default_session_dir()));
    }
}
