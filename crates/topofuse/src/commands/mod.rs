//! Command dispatch: bridges CLI args -> aggregator operations -> output.

pub mod classify;
pub mod config_cmd;
pub mod monitor;
pub mod session;
pub mod topology;

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use topofuse_config::{Config, parse_duration};
use topofuse_core::{Aggregator, AggregatorConfig};

use crate::cli::{Command, GlobalOpts, TopologySource};
use crate::error::CliError;

/// Dispatch a vendor-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    aggregator: &Aggregator,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match cmd {
        Command::Topology(args) => topology::handle(aggregator, &args, global, cancel).await,
        Command::Monitor(args) => monitor::handle(aggregator, &args, global, cancel).await,
        Command::Session(args) => session::handle(aggregator, &args, global).await,
        // Handled before an aggregator is built.
        Command::Classify(_) | Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

// ── Config resolution ───────────────────────────────────────────────

/// `--config`, else the platform config path.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(topofuse_config::config_path)
}

pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_file(global);
    debug!(path = %path.display(), "loading config");
    Ok(topofuse_config::load_config_from(
        &topofuse_config::figment_for(&path),
    )?)
}

/// Resolve the active profile into an `AggregatorConfig`, then apply
/// command-line overrides.
pub fn aggregator_config(global: &GlobalOpts, cmd: &Command) -> Result<AggregatorConfig, CliError> {
    let cfg = load_config(global)?;
    let (name, profile) = cfg.profile(global.profile.as_deref())?;
    debug!(profile = name, "resolved profile");

    let mut config = topofuse_config::profile_to_aggregator_config(profile, name, &cfg.defaults)?;

    if let Some(ref raw) = global.timeout {
        let timeout = parse_duration("--timeout", raw)?;
        if let Some(fw) = config.firewall.as_mut() {
            fw.endpoint.transport.timeout = timeout;
        }
        if let Some(sw) = config.switch.as_mut() {
            sw.transport.timeout = timeout;
        }
        if let Some(cloud) = config.cloud.as_mut() {
            cloud.endpoint.transport.timeout = timeout;
        }
    }

    if let Command::Topology(args) = cmd {
        if let TopologySource::Cloud(scope) = &args.source {
            if let (Some(n), Some(cloud)) = (scope.concurrency, config.cloud.as_mut()) {
                cloud.concurrency = usize::from(n);
            }
        }
    }

    Ok(config)
}

/// Build the aggregator for a vendor-bound command.
pub fn build_aggregator(global: &GlobalOpts, cmd: &Command) -> Result<Aggregator, CliError> {
    Ok(Aggregator::new(aggregator_config(global, cmd)?)?)
}
