//! Clap derive structures for the `topofuse` CLI.
//!
//! Kept free of workspace types so `build.rs` can include it for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// topofuse -- one topology across store firewalls, switches, and the cloud
#[derive(Debug, Parser)]
#[command(
    name = "topofuse",
    version,
    about = "Aggregate store network topology across vendors",
    long_about = "Builds one canonical topology graph from a store's firewall \
        controller, directly managed switches, and cloud-managed switch fleets.\n\n\
        Also correlates and classifies the devices the firewall has detected.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Brand profile to use
    #[arg(long, short = 'p', env = "TOPOFUSE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "TOPOFUSE_CONFIG", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TOPOFUSE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Per-request timeout for every vendor, e.g. "10s" (overrides profile)
    #[arg(long, env = "TOPOFUSE_TIMEOUT", global = true, value_name = "DURATION")]
    pub timeout: Option<String>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Vendor surface a command talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VendorArg {
    /// Store firewall and the switches it manages
    Firewall,
    /// Switch reached over its own REST API
    Switch,
    /// Cloud-managed switch fleet
    Cloud,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the canonical topology graph for one vendor
    #[command(alias = "topo", alias = "t")]
    Topology(TopologyArgs),

    /// Correlate and classify devices detected by the firewall
    #[command(alias = "mon")]
    Monitor(MonitorArgs),

    /// Classify a single device by MAC, hostname, and manufacturer
    Classify(ClassifyArgs),

    /// Inspect or end vendor sessions
    Session(SessionArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Topology ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TopologyArgs {
    #[command(subcommand)]
    pub source: TopologySource,

    /// Fail (exit 6) when any discovery branch failed
    #[arg(long, global = true)]
    pub strict: bool,

    /// What to print in table/plain output
    #[arg(long, default_value = "all", global = true)]
    pub view: TopologyView,
}

#[derive(Debug, Subcommand)]
pub enum TopologySource {
    /// Firewall, its managed switches, and their links
    #[command(alias = "fw")]
    Firewall,

    /// A directly managed switch and its LLDP neighbors
    #[command(alias = "sw")]
    Switch,

    /// Every in-scope switch in the cloud organizations
    Cloud(CloudScopeArgs),
}

#[derive(Debug, Args)]
pub struct CloudScopeArgs {
    /// Organization id or name (repeatable)
    #[arg(long = "org", value_name = "ORG")]
    pub organizations: Vec<String>,

    /// Network id or name (repeatable)
    #[arg(long = "network", short = 'n', value_name = "NETWORK")]
    pub networks: Vec<String>,

    /// Device product type, e.g. "switch" (repeatable)
    #[arg(long = "product-type", value_name = "TYPE")]
    pub product_types: Vec<String>,

    /// Skip per-switch port fetches (no links)
    #[arg(long)]
    pub no_ports: bool,

    /// Concurrent cloud branches (overrides profile)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=64))]
    pub concurrency: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TopologyView {
    /// Nodes and links
    All,
    /// Nodes only
    Nodes,
    /// Links only
    Links,
}

// ── Monitor ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Only devices seen within the active threshold
    #[arg(long, short = 'a')]
    pub active_only: bool,
}

// ── Classify ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// MAC address in any common notation
    pub mac: String,

    /// Device hostname
    #[arg(long = "hostname", short = 'H')]
    pub hostname: Option<String>,

    /// Manufacturer string reported by the vendor
    #[arg(long, short = 'm')]
    pub manufacturer: Option<String>,
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Show session state (all configured vendors when omitted)
    Status {
        vendor: Option<VendorArg>,
    },

    /// End the vendor session and drop it from the store
    Logout {
        vendor: VendorArg,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the resolved config with secrets masked
    Show,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
