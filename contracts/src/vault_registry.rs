//! # Vault Registry
//!
//! The source of truth for how many shares have been issued against which
//! vault. Every vault has one [`VaultRecord`]; the registry enforces, on
//! every mint, that the vault stays solvent:
//!
//! ```text
//! liability_shares <= share_limit
//! liability_shares * reserve_ratio_bp <= total_value * 10_000
//! ```
//!
//! Whichever bound is tighter wins. An oracle report may later push a vault
//! under water (`total_value < liability_shares`, "bad debt"); the registry
//! records that faithfully; the solvency bounds above then decide whether
//! anything more may be minted against it.
//!
//! ## Talking to the ledger
//!
//! Mints, burns and value changes are mirrored onto the share ledger with
//! one-way messages. The registry remembers each one it sent until the
//! ledger's receipt comes back. A rejected `Mint` or `Burn` is undone here
//! (a compensating transition), so registry liability and ledger supply
//! converge without any cross-actor transaction.
//!
//! ## Roles
//!
//! - **admin** — connects/disconnects/updates vaults, mints, burns, pauses,
//!   binds the ledger, rotates the oracle, hands over the admin role.
//! - **oracle** — applies vault reports.
//! - **ledger** — sends receipts.
//!
//! ## Pausing
//!
//! While paused the registry refuses anything that can add risk:
//! `ConnectVault`, `UpdateConnection`, `ApplyVaultReport` and `MintShares`.
//! Burning, disconnecting, receipts and role management stay available.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use vaulthub_protocol::config::{
    DEFAULT_REPLAY_WINDOW, ORACLE_FRESHNESS_WINDOW_SECS, TOTAL_BASIS_POINTS,
};
use vaulthub_protocol::error::{Classify, ErrorClass};
use vaulthub_protocol::math::{bp_of, reserve_capacity, within_reserve};
use vaulthub_protocol::message::{LedgerMessage, Outbound, ReceiptOutcome, RegistryMessage};
use vaulthub_protocol::replay::{ReplayError, ReplayGuard};
use vaulthub_protocol::runtime::Actor;
use vaulthub_protocol::types::{Address, Envelope, MessageId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while applying a registry message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The sender does not hold the role this operation requires.
    #[error("unauthorized: {sender} is not the {role}")]
    Unauthorized {
        /// The offending sender.
        sender: Address,
        /// The role the operation requires.
        role: &'static str,
    },

    /// The registry is paused and this operation is not exempt.
    #[error("registry is paused")]
    Paused,

    /// `Pause` while already paused.
    #[error("registry is already paused")]
    AlreadyPaused,

    /// `Resume` while not paused.
    #[error("registry is not paused")]
    NotPaused,

    /// The operation must notify the ledger, but none is bound yet.
    #[error("no ledger is bound to this registry")]
    LedgerNotBound,

    /// The ledger binding is one-time only.
    #[error("ledger already bound to {0}")]
    AlreadyBound(Address),

    /// The vault is already connected.
    #[error("vault {0} is already connected")]
    AlreadyConnected(Address),

    /// The vault is unknown or disconnected.
    #[error("vault {0} is not connected")]
    UnknownVault(Address),

    /// A basis-point parameter is out of range.
    #[error("invalid parameter {name}: {value} exceeds {max}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offered value.
        value: u64,
        /// Largest accepted value.
        max: u64,
    },

    /// Mint/burn messages for the vault are still awaiting ledger receipts.
    #[error("vault {vault} has {pending} unsettled ledger messages")]
    PendingSettlement {
        /// The vault.
        vault: Address,
        /// Messages still in flight.
        pending: usize,
    },

    /// A receipt names a message this registry is not waiting on.
    #[error("no in-flight message with id {0}")]
    UnknownReceipt(MessageId),

    /// The vault's last report is missing or too old to back new shares.
    #[error("oracle report for {vault} is stale (reported at {report_timestamp}, now {now})")]
    OracleStale {
        /// The vault.
        vault: Address,
        /// Timestamp of the last report, 0 if never reported.
        report_timestamp: u64,
        /// Current time.
        now: u64,
    },

    /// Minting or a connection update would break the share limit or the reserve ratio.
    #[error("max liability exceeded for {vault}: resulting {requested} shares, limit {limit}")]
    MaxLiability {
        /// The vault.
        vault: Address,
        /// Liability the change would leave the vault with.
        requested: u64,
        /// The binding limit.
        limit: u64,
    },

    /// Burning more than the vault's liability.
    #[error("insufficient shares on {vault}: liability {liability}, requested {requested}")]
    InsufficientShares {
        /// The vault.
        vault: Address,
        /// Current liability.
        liability: u64,
        /// Shares the caller tried to burn.
        requested: u64,
    },

    /// Disconnecting a vault that still owes shares.
    #[error("vault {vault} still has {liability} liability shares")]
    OutstandingLiability {
        /// The vault.
        vault: Address,
        /// Outstanding liability.
        liability: u64,
    },

    /// A share or fee total would leave the `u64` range.
    #[error("liability arithmetic overflow")]
    Overflow,

    /// The message id was already consumed.
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

impl Classify for RegistryError {
    fn class(&self) -> ErrorClass {
        use RegistryError::*;
        match self {
            Unauthorized { .. } => ErrorClass::Authorization,
            Paused | AlreadyPaused | NotPaused | LedgerNotBound => ErrorClass::Operational,
            AlreadyBound(_)
            | AlreadyConnected(_)
            | UnknownVault(_)
            | InvalidParameter { .. }
            | PendingSettlement { .. }
            | UnknownReceipt(_) => ErrorClass::StateValidation,
            OracleStale { .. }
            | MaxLiability { .. }
            | InsufficientShares { .. }
            | OutstandingLiability { .. }
            | Overflow => ErrorClass::Economic,
            Replay(_) => ErrorClass::Replay,
        }
    }

    fn code(&self) -> &'static str {
        use RegistryError::*;
        match self {
            Unauthorized { .. } => "unauthorized",
            Paused => "paused",
            AlreadyPaused => "already_paused",
            NotPaused => "not_paused",
            LedgerNotBound => "ledger_not_bound",
            AlreadyBound(_) => "already_bound",
            AlreadyConnected(_) => "already_connected",
            UnknownVault(_) => "unknown_vault",
            InvalidParameter { .. } => "invalid_parameter",
            PendingSettlement { .. } => "pending_settlement",
            UnknownReceipt(_) => "unknown_receipt",
            OracleStale { .. } => "oracle_stale",
            MaxLiability { .. } => "max_liability",
            InsufficientShares { .. } => "insufficient_shares",
            OutstandingLiability { .. } => "outstanding_liability",
            Overflow => "overflow",
            Replay(e) => e.code(),
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Tunables for a registry instance.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// A report older than this many seconds cannot back new minting.
    pub freshness_window_secs: u64,
    /// Out-of-order ids tracked per sender by the replay guard.
    pub replay_window: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            freshness_window_secs: ORACLE_FRESHNESS_WINDOW_SECS,
            replay_window: DEFAULT_REPLAY_WINDOW,
        }
    }
}

/// Everything the registry knows about one vault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// `false` once disconnected. The record is kept for audit.
    pub connected: bool,
    /// Hard cap on liability shares.
    pub share_limit: u64,
    /// Collateral buffer required over liability, in basis points.
    pub reserve_ratio_bp: u64,
    /// Fee charged on minted shares, in basis points.
    pub infra_fee_bp: u64,
    /// Liquidity fee, in basis points. Set at connection time only.
    pub liquidity_fee_bp: u64,
    /// Last reported collateral value.
    pub total_value: i64,
    /// Last reported net deposits minus withdrawals.
    pub in_out_delta: i64,
    /// Shares currently issued against this vault.
    pub liability_shares: u64,
    /// Fees accrued on minting so far.
    pub accumulated_fee: u64,
    /// Unix time of the last report, 0 if never reported.
    pub report_timestamp: u64,
}

impl VaultRecord {
    /// `total_value < liability_shares`.
    pub fn has_bad_debt(&self) -> bool {
        (self.total_value as i128) < (self.liability_shares as i128)
    }

    /// Whether the last report may back new minting at `now`.
    pub fn is_report_fresh(&self, now: u64, window_secs: u64) -> bool {
        self.report_timestamp != 0 && now.saturating_sub(self.report_timestamp) <= window_secs
    }

    /// The tighter of the share limit and the reserve-ratio bound.
    pub fn liability_limit(&self) -> u64 {
        match reserve_capacity(self.reserve_ratio_bp, self.total_value) {
            Some(capacity) => capacity.min(self.share_limit),
            None => self.share_limit,
        }
    }

    /// Whether `liability` would satisfy both solvency bounds.
    pub fn admits_liability(&self, liability: u64) -> bool {
        liability <= self.share_limit
            && within_reserve(liability, self.reserve_ratio_bp, self.total_value)
    }
}

/// A ledger message the registry is waiting to hear back about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InFlight {
    /// Shares minted against `vault`, with the fee accrued for them.
    Mint {
        vault: Address,
        amount: u64,
        fee: u64,
    },
    /// Shares burned against `vault`.
    Burn { vault: Address, amount: u64 },
    /// A pooled-value update.
    Rebase { total_pooled_value: u64 },
}

impl InFlight {
    fn vault(&self) -> Option<&Address> {
        match self {
            InFlight::Mint { vault, .. } | InFlight::Burn { vault, .. } => Some(vault),
            InFlight::Rebase { .. } => None,
        }
    }
}

/// The vault registry actor state.
#[derive(Debug, Clone)]
pub struct VaultRegistry {
    /// This registry's own identity, used as the sender of ledger messages.
    address: Address,
    admin: Address,
    oracle: Address,
    ledger: Option<Address>,
    config: RegistryConfig,
    vaults: HashMap<Address, VaultRecord>,
    paused: bool,
    total_shares_minted: u64,
    in_flight: HashMap<MessageId, InFlight>,
    replay: ReplayGuard,
    /// Id for the next message this registry emits.
    next_outbound_id: MessageId,
}

impl VaultRegistry {
    /// Creates an empty, running registry with no ledger bound.
    pub fn new(address: Address, admin: Address, oracle: Address, config: RegistryConfig) -> Self {
        let replay = ReplayGuard::new(config.replay_window);
        Self {
            address,
            admin,
            oracle,
            ledger: None,
            config,
            vaults: HashMap::new(),
            paused: false,
            total_shares_minted: 0,
            in_flight: HashMap::new(),
            replay,
            next_outbound_id: 0,
        }
    }

    /// Creates a registry already bound to `ledger`.
    pub fn with_ledger(
        address: Address,
        admin: Address,
        oracle: Address,
        ledger: Address,
        config: RegistryConfig,
    ) -> Self {
        let mut registry = Self::new(address, admin, oracle, config);
        registry.ledger = Some(ledger);
        registry
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current admin.
    pub fn admin(&self) -> &Address {
        &self.admin
    }

    /// Current oracle.
    pub fn oracle(&self) -> &Address {
        &self.oracle
    }

    /// The bound ledger, if any.
    pub fn ledger(&self) -> Option<&Address> {
        self.ledger.as_ref()
    }

    /// Whether the registry is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The record for `vault`, connected or not.
    pub fn vault(&self, vault: &Address) -> Option<&VaultRecord> {
        self.vaults.get(vault)
    }

    /// Whether `vault` is currently connected.
    pub fn is_vault_connected(&self, vault: &Address) -> bool {
        self.vaults.get(vault).map(|v| v.connected).unwrap_or(false)
    }

    /// Number of connected vaults.
    pub fn vault_count(&self) -> usize {
        self.vaults.values().filter(|v| v.connected).count()
    }

    /// Fees accrued on `vault`, 0 if unknown.
    pub fn accumulated_fees(&self, vault: &Address) -> u64 {
        self.vaults
            .get(vault)
            .map(|v| v.accumulated_fee)
            .unwrap_or(0)
    }

    /// Whether `vault` is under water. Unknown vaults have no debt.
    pub fn has_bad_debt(&self, vault: &Address) -> bool {
        self.vaults
            .get(vault)
            .map(VaultRecord::has_bad_debt)
            .unwrap_or(false)
    }

    /// Shares issued across all vaults.
    pub fn total_shares_minted(&self) -> u64 {
        self.total_shares_minted
    }

    /// Shares that could still be minted against `vault`, ignoring
    /// freshness. `None` if the vault is not connected.
    pub fn mintable_shares(&self, vault: &Address) -> Option<u64> {
        let record = self.vaults.get(vault).filter(|v| v.connected)?;
        Some(
            record
                .liability_limit()
                .saturating_sub(record.liability_shares),
        )
    }

    /// Sum of connected vaults' `total_value`, clamped to `[0, u64::MAX]`.
    pub fn aggregate_value(&self) -> u64 {
        let sum: i128 = self
            .vaults
            .values()
            .filter(|v| v.connected)
            .map(|v| v.total_value as i128)
            .sum();
        u64::try_from(sum.max(0)).unwrap_or(u64::MAX)
    }

    /// Ledger messages still awaiting a receipt.
    pub fn in_flight(&self) -> &HashMap<MessageId, InFlight> {
        &self.in_flight
    }

    /// Returns `true` if `(sender, id)` has been consumed.
    pub fn is_processed(&self, sender: &Address, id: MessageId) -> bool {
        self.replay.is_consumed(sender, id)
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    fn require_role(
        &self,
        sender: &Address,
        holder: &Address,
        role: &'static str,
    ) -> Result<(), RegistryError> {
        if sender != holder {
            return Err(RegistryError::Unauthorized {
                sender: sender.clone(),
                role,
            });
        }
        Ok(())
    }

    fn require_admin(&self, sender: &Address) -> Result<(), RegistryError> {
        self.require_role(sender, &self.admin, "admin")
    }

    fn require_running(&self) -> Result<(), RegistryError> {
        if self.paused {
            return Err(RegistryError::Paused);
        }
        Ok(())
    }

    fn require_ledger(&self) -> Result<Address, RegistryError> {
        self.ledger.clone().ok_or(RegistryError::LedgerNotBound)
    }

    fn connected(&self, vault: &Address) -> Result<&VaultRecord, RegistryError> {
        self.vaults
            .get(vault)
            .filter(|v| v.connected)
            .ok_or_else(|| RegistryError::UnknownVault(vault.clone()))
    }

    fn check_bp(name: &'static str, value: u64) -> Result<(), RegistryError> {
        if value > TOTAL_BASIS_POINTS {
            return Err(RegistryError::InvalidParameter {
                name,
                value,
                max: TOTAL_BASIS_POINTS,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transitions
    //
    // Each transition validates everything first and mutates last, so an
    // early return leaves the registry untouched.
    // -----------------------------------------------------------------------

    fn apply(
        &mut self,
        sender: &Address,
        message: RegistryMessage,
        now: u64,
    ) -> Result<Vec<Outbound>, RegistryError> {
        match message {
            RegistryMessage::ConnectVault {
                vault,
                share_limit,
                reserve_ratio_bp,
                infra_fee_bp,
                liquidity_fee_bp,
            } => {
                self.require_admin(sender)?;
                self.require_running()?;
                Self::check_bp("reserve_ratio_bp", reserve_ratio_bp)?;
                Self::check_bp("infra_fee_bp", infra_fee_bp)?;
                Self::check_bp("liquidity_fee_bp", liquidity_fee_bp)?;
                if self.is_vault_connected(&vault) {
                    return Err(RegistryError::AlreadyConnected(vault));
                }

                info!(
                    vault = %vault,
                    share_limit,
                    reserve_ratio_bp,
                    infra_fee_bp,
                    "vault connected"
                );
                self.vaults.insert(
                    vault,
                    VaultRecord {
                        connected: true,
                        share_limit,
                        reserve_ratio_bp,
                        infra_fee_bp,
                        liquidity_fee_bp,
                        ..VaultRecord::default()
                    },
                );
                Ok(Vec::new())
            }

            RegistryMessage::DisconnectVault { vault } => {
                self.require_admin(sender)?;
                let record = self.connected(&vault)?;
                if record.liability_shares > 0 {
                    return Err(RegistryError::OutstandingLiability {
                        liability: record.liability_shares,
                        vault,
                    });
                }
                let pending = self
                    .in_flight
                    .values()
                    .filter(|f| f.vault() == Some(&vault))
                    .count();
                if pending > 0 {
                    return Err(RegistryError::PendingSettlement { vault, pending });
                }

                if let Some(record) = self.vaults.get_mut(&vault) {
                    record.connected = false;
                }
                info!(vault = %vault, "vault disconnected");

                // Its value leaves the pool; tell the ledger if there is one.
                let mut emitted = Vec::new();
                if let Some(ledger) = self.ledger.clone() {
                    emitted.push(self.emit_rebase(ledger));
                }
                Ok(emitted)
            }

            RegistryMessage::UpdateConnection {
                vault,
                share_limit,
                reserve_ratio_bp,
                infra_fee_bp,
            } => {
                self.require_admin(sender)?;
                self.require_running()?;
                let current = self.connected(&vault)?;
                Self::check_bp("reserve_ratio_bp", reserve_ratio_bp)?;
                Self::check_bp("infra_fee_bp", infra_fee_bp)?;

                // The existing liability must still fit under the new terms.
                let updated = VaultRecord {
                    share_limit,
                    reserve_ratio_bp,
                    infra_fee_bp,
                    ..current.clone()
                };
                if !updated.admits_liability(updated.liability_shares) {
                    return Err(RegistryError::MaxLiability {
                        requested: updated.liability_shares,
                        limit: updated.liability_limit(),
                        vault,
                    });
                }

                info!(
                    vault = %vault,
                    share_limit,
                    reserve_ratio_bp,
                    infra_fee_bp,
                    "vault connection updated"
                );
                self.vaults.insert(vault, updated);
                Ok(Vec::new())
            }

            RegistryMessage::ApplyVaultReport {
                vault,
                total_value,
                in_out_delta,
            } => {
                self.require_role(sender, &self.oracle, "oracle")?;
                self.require_running()?;
                self.connected(&vault)?;
                let ledger = self.require_ledger()?;

                let Some(record) = self.vaults.get_mut(&vault) else {
                    return Err(RegistryError::UnknownVault(vault));
                };
                record.total_value = total_value;
                record.in_out_delta = in_out_delta;
                record.report_timestamp = now;
                let bad_debt = record.has_bad_debt();

                info!(vault = %vault, total_value, in_out_delta, now, "vault report applied");
                if bad_debt {
                    warn!(vault = %vault, total_value, "vault has bad debt");
                }
                Ok(vec![self.emit_rebase(ledger)])
            }

            RegistryMessage::MintShares {
                vault,
                amount,
                recipient,
            } => {
                self.require_admin(sender)?;
                self.require_running()?;
                let record = self.connected(&vault)?;
                let ledger = self.require_ledger()?;

                if !record.is_report_fresh(now, self.config.freshness_window_secs) {
                    return Err(RegistryError::OracleStale {
                        report_timestamp: record.report_timestamp,
                        vault,
                        now,
                    });
                }
                let liability = record
                    .liability_shares
                    .checked_add(amount)
                    .ok_or(RegistryError::Overflow)?;
                if !record.admits_liability(liability) {
                    return Err(RegistryError::MaxLiability {
                        requested: liability,
                        limit: record.liability_limit(),
                        vault,
                    });
                }
                let fee = bp_of(amount, record.infra_fee_bp).ok_or(RegistryError::Overflow)?;
                let accumulated_fee = record
                    .accumulated_fee
                    .checked_add(fee)
                    .ok_or(RegistryError::Overflow)?;
                let total_minted = self
                    .total_shares_minted
                    .checked_add(amount)
                    .ok_or(RegistryError::Overflow)?;

                if let Some(record) = self.vaults.get_mut(&vault) {
                    record.liability_shares = liability;
                    record.accumulated_fee = accumulated_fee;
                }
                self.total_shares_minted = total_minted;
                info!(
                    vault = %vault,
                    recipient = %recipient,
                    amount,
                    fee,
                    liability,
                    "shares minted"
                );

                let emitted = self.emit(
                    ledger,
                    LedgerMessage::Mint {
                        recipient,
                        shares: amount,
                    },
                    InFlight::Mint { vault, amount, fee },
                );
                Ok(vec![emitted])
            }

            RegistryMessage::BurnShares { vault, amount } => {
                self.require_admin(sender)?;
                let record = self.connected(&vault)?;
                let ledger = self.require_ledger()?;

                if amount > record.liability_shares {
                    return Err(RegistryError::InsufficientShares {
                        liability: record.liability_shares,
                        vault,
                        requested: amount,
                    });
                }
                let liability = record.liability_shares - amount;
                let total_minted = self
                    .total_shares_minted
                    .checked_sub(amount)
                    .ok_or(RegistryError::Overflow)?;

                if let Some(record) = self.vaults.get_mut(&vault) {
                    record.liability_shares = liability;
                }
                self.total_shares_minted = total_minted;
                info!(vault = %vault, amount, liability, "shares burned");

                // The vault's own account holds the shares being retired.
                let emitted = self.emit(
                    ledger,
                    LedgerMessage::Burn {
                        account: vault.clone(),
                        shares: amount,
                    },
                    InFlight::Burn { vault, amount },
                );
                Ok(vec![emitted])
            }

            RegistryMessage::Pause => {
                self.require_admin(sender)?;
                if self.paused {
                    return Err(RegistryError::AlreadyPaused);
                }
                self.paused = true;
                warn!("registry paused");
                Ok(Vec::new())
            }

            RegistryMessage::Resume => {
                self.require_admin(sender)?;
                if !self.paused {
                    return Err(RegistryError::NotPaused);
                }
                self.paused = false;
                info!("registry resumed");
                Ok(Vec::new())
            }

            RegistryMessage::BindLedger { ledger } => {
                self.require_admin(sender)?;
                if let Some(bound) = &self.ledger {
                    return Err(RegistryError::AlreadyBound(bound.clone()));
                }
                info!(ledger = %ledger, "ledger bound");
                self.ledger = Some(ledger);
                Ok(Vec::new())
            }

            RegistryMessage::SetOracle { oracle } => {
                self.require_admin(sender)?;
                info!(previous = %self.oracle, oracle = %oracle, "oracle changed");
                self.oracle = oracle;
                Ok(Vec::new())
            }

            RegistryMessage::TransferAdmin { admin } => {
                self.require_admin(sender)?;
                info!(previous = %self.admin, admin = %admin, "admin transferred");
                self.admin = admin;
                Ok(Vec::new())
            }

            RegistryMessage::Receipt { original, outcome } => {
                let ledger = self.require_ledger()?;
                self.require_role(sender, &ledger, "ledger")?;
                self.settle(original, outcome)?;
                Ok(Vec::new())
            }
        }
    }

    /// Clears an in-flight entry and, if the ledger rejected it, undoes its
    /// effect on the registry.
    fn settle(
        &mut self,
        original: MessageId,
        outcome: ReceiptOutcome,
    ) -> Result<(), RegistryError> {
        let pending = self
            .in_flight
            .get(&original)
            .cloned()
            .ok_or(RegistryError::UnknownReceipt(original))?;

        let rejection = match outcome {
            ReceiptOutcome::Applied => {
                debug!(original, "ledger applied message");
                self.in_flight.remove(&original);
                return Ok(());
            }
            ReceiptOutcome::Rejected(rejection) => rejection,
        };

        match &pending {
            InFlight::Mint { vault, amount, fee } => {
                let record = self
                    .vaults
                    .get(vault)
                    .ok_or_else(|| RegistryError::UnknownVault(vault.clone()))?;
                let liability = record
                    .liability_shares
                    .checked_sub(*amount)
                    .ok_or(RegistryError::Overflow)?;
                let accumulated_fee = record
                    .accumulated_fee
                    .checked_sub(*fee)
                    .ok_or(RegistryError::Overflow)?;
                let total_minted = self
                    .total_shares_minted
                    .checked_sub(*amount)
                    .ok_or(RegistryError::Overflow)?;

                if let Some(record) = self.vaults.get_mut(vault) {
                    record.liability_shares = liability;
                    record.accumulated_fee = accumulated_fee;
                }
                self.total_shares_minted = total_minted;
                warn!(
                    vault = %vault,
                    amount,
                    code = %rejection.code,
                    "ledger rejected mint, liability reverted"
                );
            }
            InFlight::Burn { vault, amount } => {
                let record = self
                    .vaults
                    .get(vault)
                    .ok_or_else(|| RegistryError::UnknownVault(vault.clone()))?;
                let liability = record
                    .liability_shares
                    .checked_add(*amount)
                    .ok_or(RegistryError::Overflow)?;
                let total_minted = self
                    .total_shares_minted
                    .checked_add(*amount)
                    .ok_or(RegistryError::Overflow)?;

                if let Some(record) = self.vaults.get_mut(vault) {
                    record.liability_shares = liability;
                }
                self.total_shares_minted = total_minted;
                warn!(
                    vault = %vault,
                    amount,
                    code = %rejection.code,
                    "ledger rejected burn, liability restored"
                );
            }
            InFlight::Rebase { total_pooled_value } => {
                // The next report carries a fresh aggregate; nothing to undo.
                warn!(total_pooled_value, code = %rejection.code, "ledger rejected rebase");
            }
        }

        self.in_flight.remove(&original);
        Ok(())
    }

    fn emit(&mut self, ledger: Address, body: LedgerMessage, pending: InFlight) -> Outbound {
        let id = self.next_outbound_id;
        self.next_outbound_id += 1;
        self.in_flight.insert(id, pending);
        Outbound::Ledger {
            to: ledger,
            envelope: Envelope::new(id, self.address.clone(), body),
        }
    }

    fn emit_rebase(&mut self, ledger: Address) -> Outbound {
        let total_pooled_value = self.aggregate_value();
        self.emit(
            ledger,
            LedgerMessage::Rebase { total_pooled_value },
            InFlight::Rebase { total_pooled_value },
        )
    }
}

impl Actor for VaultRegistry {
    type Message = RegistryMessage;
    type Error = RegistryError;

    fn name(&self) -> &'static str {
        "vault_registry"
    }

    fn message_kind(message: &RegistryMessage) -> &'static str {
        message.kind()
    }

    fn handle(
        &mut self,
        envelope: Envelope<RegistryMessage>,
        now: u64,
    ) -> Result<Vec<Outbound>, RegistryError> {
        let Envelope { id, sender, body } = envelope;
        self.replay.check(&sender, id)?;
        let emitted = self.apply(&sender, body, now)?;
        self.replay.record(&sender, id);
        Ok(emitted)
    }
}
