//! # CLI Interface
//!
//! Defines the command-line argument structure for `vaultlinkd` using
//! `clap` derive. Supports two subcommands: `run` and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// VaultLink service daemon.
///
/// Serves the wallet-linking and vault-provisioning HTTP API, persists
/// link/vault state in an embedded store, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "vaultlinkd",
    about = "VaultLink wallet-linking and vault-provisioning service",
    version,
    propagate_version = true
)]
pub struct VaultLinkCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the VaultLink binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the service.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the data directory where link and vault state is stored.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "VAULTLINK_DATA_DIR", default_value = "~/.vaultlink")]
    pub data_dir: PathBuf,

    /// Port for the HTTP API.
    #[arg(long, env = "VAULTLINK_API_PORT", default_value_t = 9751)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "VAULTLINK_METRICS_PORT", default_value_t = 9752)]
    pub metrics_port: u16,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "VAULTLINK_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Chain backend to wire into the registry.
    ///
    /// Only "dev" exists today: an in-process backend whose deposits are
    /// marked via `POST /dev/deposits/:request_id` and whose deploys land
    /// at the derived address.
    #[arg(long, env = "VAULTLINK_CHAIN_BACKEND", default_value = "dev")]
    pub chain_backend: String,

    /// Chain ids to register against the chosen backend.
    ///
    /// The default chain ("1") must be present or lookups with an absent
    /// chain id will fail.
    #[arg(long, env = "VAULTLINK_CHAIN_IDS", value_delimiter = ',', default_value = "1")]
    pub chain_ids: Vec<String>,

    /// Deposit address handed out to linking users.
    #[arg(
        long,
        env = "VAULTLINK_DEPOSIT_ADDRESS",
        default_value = "0x00000000000000000000000000000000deab0517"
    )]
    pub deposit_address: String,

    /// Hex prefix mined vault addresses must start with.
    #[arg(long, env = "VAULTLINK_ADDRESS_PREFIX", default_value = "00")]
    pub address_prefix: String,

    /// Iteration cap for one salt-mining run.
    #[arg(long, env = "VAULTLINK_MINING_MAX_ITERATIONS", default_value_t = 5_000_000)]
    pub mining_max_iterations: u64,

    /// Wall-clock budget in seconds for one salt-mining run.
    #[arg(long, env = "VAULTLINK_MINING_DEADLINE_SECS", default_value_t = 10)]
    pub mining_deadline_secs: u64,

    /// Enable dev-mode surfaces (the deposit-marking endpoint and derived
    /// wallets for unregistered accounts). Never enable in production.
    #[arg(long, env = "VAULTLINK_DEV")]
    pub dev: bool,
}
