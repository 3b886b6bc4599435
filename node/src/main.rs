// Copyright (c) 2026 VaultHub Contributors. MIT License.
// See LICENSE for details.

//! # VaultHub Node
//!
//! Entry point for the `vaulthub-node` binary. Parses CLI arguments,
//! initializes logging and metrics, starts the registry and ledger actors,
//! and serves the HTTP gateway.
//!
//! The binary supports two subcommands:
//!
//! - `run`     — start the node
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use vaulthub_contracts::share_ledger::LedgerConfig;
use vaulthub_contracts::system::{Hub, HubConfig};
use vaulthub_contracts::vault_registry::RegistryConfig;
use vaulthub_protocol::clock::SystemClock;
use vaulthub_protocol::types::Address;

use cli::{Commands, VaultHubCli};
use metrics::HubMetrics;

/// How often the state gauges are refreshed from the actors.
const METRICS_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// How long shutdown waits for the actors to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VaultHubCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the hub, the HTTP gateway and the metrics endpoint, and runs
/// until a shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "vaulthub_node=info,vaulthub_contracts=info,vaulthub_protocol=info,tower_http=debug",
        args.log_format.into(),
    );

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        admin = %args.admin,
        oracle = %args.oracle,
        freshness_secs = args.freshness_secs,
        replay_window = args.replay_window,
        "starting vaulthub-node"
    );

    // --- Metrics ---
    let hub_metrics =
        Arc::new(HubMetrics::new().context("failed to register prometheus metrics")?);

    // --- Actors ---
    let config = HubConfig {
        registry_address: Address::new(args.registry_address),
        ledger_address: Address::new(args.ledger_address),
        admin: Address::new(args.admin),
        oracle: Address::new(args.oracle),
        deployer: Address::new(args.deployer),
        registry: RegistryConfig {
            freshness_window_secs: args.freshness_secs,
            replay_window: args.replay_window,
        },
        ledger: LedgerConfig {
            replay_window: args.replay_window,
        },
    };
    let hub = Hub::start(config, Arc::new(SystemClock), hub_metrics.clone());

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            vaulthub_protocol::config::PROTOCOL_VERSION,
        ),
        registry: hub.registry().clone(),
        ledger: hub.ledger().clone(),
        internal: vec![
            hub.config().registry_address.clone(),
            hub.config().ledger_address.clone(),
        ],
        metrics: Arc::clone(&hub_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state.clone());
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&hub_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Gauge sampler ---
    let sampler_state = app_state.clone();
    let sampler = tokio::spawn(async move {
        let mut interval = tokio::time::interval(METRICS_SAMPLE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = sampler_state
                .metrics
                .sample(&sampler_state.registry, &sampler_state.ledger)
                .await
            {
                tracing::warn!(error = %e, "metrics sampling stopped");
                break;
            }
        }
    });
    drop(app_state);

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
            tracing::info!("shutdown signal received, draining actors");
        }
    }

    sampler.abort();
    let _ = sampler.await;

    match tokio::time::timeout(SHUTDOWN_GRACE, hub.shutdown()).await {
        Ok(Ok((registry, ledger))) => tracing::info!(
            vaults = registry.vault_count(),
            total_shares_minted = registry.total_shares_minted(),
            total_shares = ledger.total_shares(),
            "vaulthub-node stopped"
        ),
        Ok(Err(e)) => tracing::error!(error = %e, "actor shutdown failed"),
        Err(_) => tracing::warn!("actors still busy after grace period, exiting anyway"),
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("vaulthub-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol      {}", vaulthub_protocol::config::PROTOCOL_VERSION);
    println!("wire          {}", vaulthub_protocol::config::WIRE_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
