// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # VaultLink Service
//!
//! Entry point for the `vaultlinkd` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the database, wires the chain
//! backends, and serves the HTTP API.
//!
//! The binary supports two subcommands:
//!
//! - `run`     — start the service
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use vaultlink_core::chains::dev::{DevAccountDirectory, DevChainRpc, DevLedgerService};
use vaultlink_core::chains::registry::ChainServiceRegistry;
use vaultlink_core::chains::{ChainServices, LedgerService};
use vaultlink_core::link::{LinkClaimResolver, LinkRequestInitiator};
use vaultlink_core::storage::{LinkRequestStore, VaultLinkDb, VaultNameRegistry};
use vaultlink_core::vault::{AddressPolicy, VaultProvisioner};

use cli::{Commands, VaultLinkCli};
use logging::LogFormat;
use metrics::ServiceMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VaultLinkCli::parse();

    match cli.command {
        Commands::Run(args) => run_service(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full service: API server and metrics endpoint.
async fn run_service(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "vaultlinkd=info,vaultlink_core=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        chain_backend = %args.chain_backend,
        dev = args.dev,
        "starting vaultlinkd"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let db = VaultLinkDb::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "database opened");

    // --- Chain backends ---
    let dev_ledger = Arc::new(DevLedgerService::new(&db));
    let chains = Arc::new(build_chain_registry(&args, &dev_ledger)?);
    tracing::info!(chains = ?chains.chain_ids(), "chain registry ready");

    let accounts: Arc<DevAccountDirectory> = if args.dev {
        Arc::new(DevAccountDirectory::with_derived_wallets())
    } else {
        Arc::new(DevAccountDirectory::new())
    };

    // --- Address policy ---
    let policy = AddressPolicy::new(
        &args.address_prefix,
        args.mining_max_iterations,
        Duration::from_secs(args.mining_deadline_secs),
    )
    .with_context(|| format!("invalid address prefix {:?}", args.address_prefix))?;

    // --- Metrics ---
    let service_metrics = Arc::new(ServiceMetrics::new());

    // --- Application state ---
    let store = LinkRequestStore::new(&db);
    let names = VaultNameRegistry::new(&db);
    let app_state = api::AppState {
        initiator: LinkRequestInitiator::new(store.clone(), Arc::clone(&chains)),
        resolver: LinkClaimResolver::new(store, Arc::clone(&chains)),
        provisioner: VaultProvisioner::new(names, accounts, chains, policy),
        metrics: Arc::clone(&service_metrics),
        dev_ledger: args.dev.then_some(dev_ledger),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&service_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    db.flush().context("final database flush failed")?;
    tracing::info!("vaultlinkd stopped");
    Ok(())
}

/// Builds the chain registry from CLI arguments.
///
/// Every configured chain id gets its own registry entry. Only the dev
/// backend exists today; the ledger and RPC for a production backend plug
/// in here once one lands.
fn build_chain_registry(
    args: &cli::RunArgs,
    dev_ledger: &Arc<DevLedgerService>,
) -> Result<ChainServiceRegistry> {
    if args.chain_backend != "dev" {
        bail!(
            "unsupported chain backend {:?}; only \"dev\" is available",
            args.chain_backend
        );
    }
    if args.chain_ids.is_empty() {
        bail!("at least one chain id must be configured");
    }

    let mut registry = ChainServiceRegistry::new();
    for chain_id in &args.chain_ids {
        registry.register(ChainServices {
            chain_id: chain_id.clone(),
            deposit_address: args.deposit_address.clone(),
            ledger: Arc::clone(dev_ledger) as Arc<dyn LedgerService>,
            rpc: Arc::new(DevChainRpc::faithful()),
        });
    }
    Ok(registry)
}

/// Prints version information to stdout.
fn print_version() {
    println!("vaultlinkd {}", env!("CARGO_PKG_VERSION"));
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
