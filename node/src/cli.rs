//! # CLI Interface
//!
//! Defines the command-line argument structure for `vaulthub-node` using
//! `clap` derive. Supports two subcommands: `run` and `version`.

use clap::{Parser, Subcommand, ValueEnum};

use vaulthub_protocol::config::{
    DEFAULT_API_PORT, DEFAULT_METRICS_PORT, DEFAULT_REPLAY_WINDOW, ORACLE_FRESHNESS_WINDOW_SECS,
};

/// VaultHub node.
///
/// Hosts the vault registry and share ledger actors in one process and
/// exposes them over an HTTP gateway, with Prometheus metrics on a
/// separate port.
#[derive(Parser, Debug)]
#[command(
    name = "vaulthub-node",
    about = "VaultHub registry and share ledger node",
    version,
    propagate_version = true
)]
pub struct VaultHubCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Log output format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the HTTP gateway.
    #[arg(long, env = "VAULTHUB_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "VAULTHUB_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Identity allowed to manage vaults, mint and burn.
    #[arg(long, env = "VAULTHUB_ADMIN", default_value = "admin")]
    pub admin: String,

    /// Identity allowed to apply vault reports.
    #[arg(long, env = "VAULTHUB_ORACLE", default_value = "oracle")]
    pub oracle: String,

    /// Identity the registry sends from.
    #[arg(long, env = "VAULTHUB_REGISTRY_ADDRESS", default_value = "registry")]
    pub registry_address: String,

    /// Identity the ledger sends from.
    #[arg(long, env = "VAULTHUB_LEDGER_ADDRESS", default_value = "ledger")]
    pub ledger_address: String,

    /// Deployer recorded on the ledger.
    #[arg(long, env = "VAULTHUB_DEPLOYER", default_value = "deployer")]
    pub deployer: String,

    /// Seconds a vault report stays fresh enough to back minting.
    #[arg(long, env = "VAULTHUB_FRESHNESS_SECS", default_value_t = ORACLE_FRESHNESS_WINDOW_SECS)]
    pub freshness_secs: u64,

    /// Out-of-order message ids remembered per sender.
    #[arg(long, env = "VAULTHUB_REPLAY_WINDOW", default_value_t = DEFAULT_REPLAY_WINDOW)]
    pub replay_window: usize,

    /// Log output format.
    #[arg(long, env = "VAULTHUB_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,
}
