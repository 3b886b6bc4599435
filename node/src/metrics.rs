//! # Prometheus Metrics
//!
//! Exposes operational metrics for the hub. Scraped by Prometheus at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! Message counters are fed by the actor runtime through the [`Observer`]
//! trait; the state gauges are refreshed by a sampler task that queries both
//! actors periodically.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use vaulthub_contracts::share_ledger::ShareLedger;
use vaulthub_contracts::vault_registry::VaultRegistry;
use vaulthub_protocol::error::ErrorClass;
use vaulthub_protocol::runtime::{ActorHandle, Observer, RuntimeError};

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct HubMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Messages applied, by actor and message kind.
    pub messages_applied_total: IntCounterVec,
    /// Messages rejected, by actor, message kind and error class.
    pub messages_rejected_total: IntCounterVec,
    /// Currently connected vaults.
    pub connected_vaults: IntGauge,
    /// Shares the registry has issued across all vaults.
    pub shares_minted: IntGauge,
    /// Shares in existence on the ledger.
    pub ledger_total_shares: IntGauge,
    /// Pooled value backing the ledger's shares.
    pub ledger_pooled_value: IntGauge,
    /// Registry messages awaiting a ledger receipt.
    pub in_flight_messages: IntGauge,
}

impl HubMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("vaulthub".into()), None)?;

        let messages_applied_total = IntCounterVec::new(
            Opts::new("messages_applied_total", "Messages applied by an actor"),
            &["actor", "kind"],
        )?;
        registry.register(Box::new(messages_applied_total.clone()))?;

        let messages_rejected_total = IntCounterVec::new(
            Opts::new("messages_rejected_total", "Messages rejected by an actor"),
            &["actor", "kind", "class"],
        )?;
        registry.register(Box::new(messages_rejected_total.clone()))?;

        let connected_vaults = IntGauge::new("connected_vaults", "Currently connected vaults")?;
        registry.register(Box::new(connected_vaults.clone()))?;

        let shares_minted =
            IntGauge::new("shares_minted", "Shares issued by the registry across all vaults")?;
        registry.register(Box::new(shares_minted.clone()))?;

        let ledger_total_shares =
            IntGauge::new("ledger_total_shares", "Shares in existence on the ledger")?;
        registry.register(Box::new(ledger_total_shares.clone()))?;

        let ledger_pooled_value =
            IntGauge::new("ledger_pooled_value", "Pooled value backing the ledger")?;
        registry.register(Box::new(ledger_pooled_value.clone()))?;

        let in_flight_messages = IntGauge::new(
            "in_flight_messages",
            "Registry messages awaiting a ledger receipt",
        )?;
        registry.register(Box::new(in_flight_messages.clone()))?;

        Ok(Self {
            registry,
            messages_applied_total,
            messages_rejected_total,
            connected_vaults,
            shares_minted,
            ledger_total_shares,
            ledger_pooled_value,
            in_flight_messages,
        })
    }

    /// Refreshes the state gauges from the running actors.
    pub async fn sample(
        &self,
        registry: &ActorHandle<VaultRegistry>,
        ledger: &ActorHandle<ShareLedger>,
    ) -> Result<(), RuntimeError> {
        let (vaults, minted, in_flight) = registry
            .query(|r| (r.vault_count(), r.total_shares_minted(), r.in_flight().len()))
            .await?;
        let (shares, pooled) = ledger
            .query(|l| (l.total_shares(), l.total_pooled_value()))
            .await?;

        self.connected_vaults.set(gauge(vaults as u64));
        self.shares_minted.set(gauge(minted));
        self.in_flight_messages.set(gauge(in_flight as u64));
        self.ledger_total_shares.set(gauge(shares));
        self.ledger_pooled_value.set(gauge(pooled));
        Ok(())
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Gauges are `i64`; saturate rather than wrap.
fn gauge(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl Observer for HubMetrics {
    fn applied(&self, actor: &'static str, kind: &'static str) {
        self.messages_applied_total
            .with_label_values(&[actor, kind])
            .inc();
    }

    fn rejected(&self, actor: &'static str, kind: &'static str, class: ErrorClass) {
        self.messages_rejected_total
            .with_label_values(&[actor, kind, class.as_str()])
            .inc();
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<HubMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
