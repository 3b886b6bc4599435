//! # Hub
//!
//! Wires a [`VaultRegistry`] and a [`ShareLedger`] together: spawns each on
//! its own task, bound to each other, and runs a router task that carries
//! every emitted message to its destination mailbox.
//!
//! ```text
//!   registry task ──┐                    ┌──► ledger mailbox
//!                   ├──► outbox ──► router
//!   ledger task ────┘                    └──► registry mailbox
//! ```
//!
//! Emitting never blocks (the outbox is unbounded); only the router waits on
//! a full mailbox, so the two actors cannot deadlock on each other.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vaulthub_protocol::clock::Clock;
use vaulthub_protocol::message::Outbound;
use vaulthub_protocol::runtime::{self, ActorHandle, Observer, RuntimeError};
use vaulthub_protocol::types::Address;

use crate::share_ledger::{LedgerConfig, ShareLedger};
use crate::vault_registry::{RegistryConfig, VaultRegistry};

/// How often [`Hub::settle`] re-checks for outstanding ledger messages.
const SETTLE_POLL: Duration = Duration::from_millis(2);

// ---------------------------------------------------------------------------
// Config & errors
// ---------------------------------------------------------------------------

/// Identities and tunables for a hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Address the registry sends from.
    pub registry_address: Address,
    /// Address the ledger sends from.
    pub ledger_address: Address,
    /// Initial registry admin.
    pub admin: Address,
    /// Initial oracle.
    pub oracle: Address,
    /// Deployer recorded on the ledger.
    pub deployer: Address,
    /// Registry tunables.
    pub registry: RegistryConfig,
    /// Ledger tunables.
    pub ledger: LedgerConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            registry_address: Address::new("registry"),
            ledger_address: Address::new("ledger"),
            admin: Address::new("admin"),
            oracle: Address::new("oracle"),
            deployer: Address::new("deployer"),
            registry: RegistryConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

/// Failures of the hub as a whole.
#[derive(Debug, Error)]
pub enum HubError {
    /// An actor is no longer running.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Ledger messages were still unsettled when the wait ran out.
    #[error("{pending} ledger messages still unsettled after {waited:?}")]
    SettleTimeout {
        /// Messages still awaiting receipts.
        pending: usize,
        /// How long we waited.
        waited: Duration,
    },

    /// An actor task panicked.
    #[error("actor task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// A running registry/ledger pair.
pub struct Hub {
    config: HubConfig,
    registry: ActorHandle<VaultRegistry>,
    ledger: ActorHandle<ShareLedger>,
    registry_task: JoinHandle<VaultRegistry>,
    ledger_task: JoinHandle<ShareLedger>,
    router_task: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl Hub {
    /// Spawns both actors, already bound to each other, plus the router.
    pub fn start(config: HubConfig, clock: Arc<dyn Clock>, observer: Arc<dyn Observer>) -> Self {
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();

        let registry_state = VaultRegistry::with_ledger(
            config.registry_address.clone(),
            config.admin.clone(),
            config.oracle.clone(),
            config.ledger_address.clone(),
            config.registry.clone(),
        );
        let ledger_state = ShareLedger::with_registry(
            config.ledger_address.clone(),
            config.deployer.clone(),
            config.registry_address.clone(),
            config.ledger.clone(),
        );

        let (registry, registry_task) = runtime::spawn(
            registry_state,
            Arc::clone(&clock),
            Arc::clone(&observer),
            outbox_tx.clone(),
        );
        let (ledger, ledger_task) = runtime::spawn(ledger_state, clock, observer, outbox_tx);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let router = Router {
            registry_address: config.registry_address.clone(),
            ledger_address: config.ledger_address.clone(),
            registry: registry.clone(),
            ledger: ledger.clone(),
        };
        let router_task = tokio::spawn(router.run(outbox_rx, shutdown_rx));

        info!(
            registry = %config.registry_address,
            ledger = %config.ledger_address,
            admin = %config.admin,
            oracle = %config.oracle,
            "hub started"
        );

        Self {
            config,
            registry,
            ledger,
            registry_task,
            ledger_task,
            router_task,
            shutdown_tx,
        }
    }

    /// Handle to the registry actor.
    pub fn registry(&self) -> &ActorHandle<VaultRegistry> {
        &self.registry
    }

    /// Handle to the ledger actor.
    pub fn ledger(&self) -> &ActorHandle<ShareLedger> {
        &self.ledger
    }

    /// The identities this hub was started with.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Waits until every message the registry sent to the ledger has been
    /// answered by a receipt and processed.
    pub async fn settle(&self, timeout: Duration) -> Result<(), HubError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let pending = self.registry.query(|r| r.in_flight().len()).await?;
            if pending == 0 {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(HubError::SettleTimeout {
                    pending,
                    waited: timeout,
                });
            }
            tokio::time::sleep(SETTLE_POLL).await;
        }
    }

    /// Stops the router and both actors and returns their final state.
    ///
    /// Every clone of the actor handles must be dropped first, or this
    /// waits until they are.
    pub async fn shutdown(self) -> Result<(VaultRegistry, ShareLedger), HubError> {
        let _ = self.shutdown_tx.send(true);
        self.router_task.await?;

        drop(self.registry);
        drop(self.ledger);
        let registry = self.registry_task.await?;
        let ledger = self.ledger_task.await?;
        info!("hub stopped");
        Ok((registry, ledger))
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

struct Router {
    registry_address: Address,
    ledger_address: Address,
    registry: ActorHandle<VaultRegistry>,
    ledger: ActorHandle<ShareLedger>,
}

impl Router {
    async fn run(
        self,
        mut outbox: mpsc::UnboundedReceiver<Outbound>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                message = outbox.recv() => match message {
                    Some(message) => self.dispatch(message).await,
                    None => break,
                },
                _ = shutdown.changed() => {
                    debug!("router received shutdown signal");
                    break;
                }
            }
        }
    }

    async fn dispatch(&self, message: Outbound) {
        let result = match message {
            Outbound::Ledger { to, envelope } if to == self.ledger_address => {
                debug!(id = envelope.id, kind = envelope.body.kind(), "routing to ledger");
                self.ledger.deliver(envelope).await
            }
            Outbound::Registry { to, envelope } if to == self.registry_address => {
                debug!(id = envelope.id, kind = envelope.body.kind(), "routing to registry");
                self.registry.deliver(envelope).await
            }
            other => {
                warn!(to = %other.destination(), "no route for outbound message, dropping");
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "dropping outbound message");
        }
    }
}
