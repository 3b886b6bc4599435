//! # Share Ledger
//!
//! A rebasing claim token. Holders own *shares*; what a share is worth is
//! never stored per holder but derived from two global scalars:
//!
//! ```text
//! balanceOf(h) = floor(shares_h * total_pooled_value / total_shares)
//! ```
//!
//! Supply changes (`Mint`, `Burn`) and the pooled value (`Rebase`) are
//! controlled by exactly one identity, the bound registry. Everyone else can
//! only move the shares they hold, directly or through an allowance.
//!
//! ## Receipts
//!
//! Every message from the registry is answered with a
//! [`RegistryMessage::Receipt`]. A rejected registry message is final: its
//! id is consumed even though nothing else changed, so a duplicate delivery
//! can never succeed after the registry has already compensated for the
//! rejection. Messages from holders keep the usual rule: a rejection leaves
//! the id unused.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use vaulthub_protocol::config::DEFAULT_REPLAY_WINDOW;
use vaulthub_protocol::error::{Classify, ErrorClass, Rejection};
use vaulthub_protocol::math::mul_div;
use vaulthub_protocol::message::{LedgerMessage, Outbound, ReceiptOutcome, RegistryMessage};
use vaulthub_protocol::replay::{ReplayError, ReplayGuard};
use vaulthub_protocol::runtime::Actor;
use vaulthub_protocol::types::{Address, Envelope, MessageId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while applying a ledger message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The sender may not perform this operation.
    #[error("unauthorized: {sender} is not the {role}")]
    Unauthorized {
        /// The offending sender.
        sender: Address,
        /// The role the operation requires.
        role: &'static str,
    },

    /// A supply operation arrived before any registry was bound.
    #[error("no registry is bound to this ledger")]
    RegistryNotBound,

    /// The registry binding is one-time only.
    #[error("registry already bound to {0}")]
    AlreadyBound(Address),

    /// The account holds fewer shares than the operation needs.
    #[error("insufficient balance: {account} has {available} shares, needs {requested}")]
    InsufficientBalance {
        /// The debited account.
        account: Address,
        /// Shares it holds.
        available: u64,
        /// Shares the operation needs.
        requested: u64,
    },

    /// The spender's allowance is too small.
    #[error("insufficient allowance: {spender} may move {allowed} of {owner}'s shares, requested {requested}")]
    InsufficientAllowance {
        /// Owner of the shares.
        owner: Address,
        /// The spender.
        spender: Address,
        /// Current allowance.
        allowed: u64,
        /// Shares the spender tried to move.
        requested: u64,
    },

    /// A share or value total would leave the `u64` range.
    #[error("share arithmetic overflow")]
    Overflow,

    /// The message id was already consumed.
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

impl Classify for LedgerError {
    fn class(&self) -> ErrorClass {
        match self {
            LedgerError::Unauthorized { .. } => ErrorClass::Authorization,
            LedgerError::RegistryNotBound => ErrorClass::Operational,
            LedgerError::AlreadyBound(_) => ErrorClass::StateValidation,
            LedgerError::InsufficientBalance { .. }
            | LedgerError::InsufficientAllowance { .. }
            | LedgerError::Overflow => ErrorClass::Economic,
            LedgerError::Replay(_) => ErrorClass::Replay,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            LedgerError::Unauthorized { .. } => "unauthorized",
            LedgerError::RegistryNotBound => "registry_not_bound",
            LedgerError::AlreadyBound(_) => "already_bound",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::InsufficientAllowance { .. } => "insufficient_allowance",
            LedgerError::Overflow => "overflow",
            LedgerError::Replay(e) => e.code(),
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Tunables for a ledger instance.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Out-of-order ids tracked per sender by the replay guard.
    pub replay_window: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            replay_window: DEFAULT_REPLAY_WINDOW,
        }
    }
}

/// A holder's shares and the allowances it has granted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderAccount {
    /// Shares held.
    pub shares: u64,
    /// Spender → shares it may still move. Overwritten by `Approve`.
    pub allowances: HashMap<Address, u64>,
}

/// The share ledger actor state.
#[derive(Debug, Clone)]
pub struct ShareLedger {
    /// This ledger's own identity, used as the sender of receipts.
    address: Address,
    /// The only identity allowed to bind the registry.
    deployer: Address,
    /// The registry trusted for supply operations, once bound.
    registry: Option<Address>,
    total_shares: u64,
    total_pooled_value: u64,
    holders: HashMap<Address, HolderAccount>,
    replay: ReplayGuard,
    /// Id for the next receipt this ledger emits.
    next_outbound_id: MessageId,
}

impl ShareLedger {
    /// Creates an empty ledger with no registry bound.
    pub fn new(address: Address, deployer: Address, config: LedgerConfig) -> Self {
        Self {
            address,
            deployer,
            registry: None,
            total_shares: 0,
            total_pooled_value: 0,
            holders: HashMap::new(),
            replay: ReplayGuard::new(config.replay_window),
            next_outbound_id: 0,
        }
    }

    /// Creates a ledger already bound to `registry`.
    pub fn with_registry(
        address: Address,
        deployer: Address,
        registry: Address,
        config: LedgerConfig,
    ) -> Self {
        let mut ledger = Self::new(address, deployer, config);
        ledger.registry = Some(registry);
        ledger
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The bound registry, if any.
    pub fn registry(&self) -> Option<&Address> {
        self.registry.as_ref()
    }

    /// Shares held by `holder`.
    pub fn shares_of(&self, holder: &Address) -> u64 {
        self.holders.get(holder).map(|a| a.shares).unwrap_or(0)
    }

    /// Total shares in existence.
    pub fn total_shares(&self) -> u64 {
        self.total_shares
    }

    /// Pooled value backing all shares.
    pub fn total_pooled_value(&self) -> u64 {
        self.total_pooled_value
    }

    /// Value of `holder`'s shares. With no shares in existence the ratio is
    /// taken as 1:1.
    pub fn balance_of(&self, holder: &Address) -> u64 {
        let shares = self.shares_of(holder);
        if self.total_shares == 0 {
            return shares;
        }
        // shares <= total_shares bounds the quotient by the pooled value.
        mul_div(shares, self.total_pooled_value, self.total_shares)
            .unwrap_or(self.total_pooled_value)
    }

    /// Shares currently worth `value`. Identity while the pool is empty.
    /// `None` if the result does not fit in `u64`.
    pub fn shares_by_pooled_value(&self, value: u64) -> Option<u64> {
        if self.total_pooled_value == 0 {
            return Some(value);
        }
        mul_div(value, self.total_shares, self.total_pooled_value)
    }

    /// Value of `shares` shares. Identity while no shares exist.
    /// `None` if the result does not fit in `u64`.
    pub fn pooled_value_by_shares(&self, shares: u64) -> Option<u64> {
        if self.total_shares == 0 {
            return Some(shares);
        }
        mul_div(shares, self.total_pooled_value, self.total_shares)
    }

    /// Shares `spender` may still move on behalf of `owner`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.holders
            .get(owner)
            .and_then(|a| a.allowances.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Every account the ledger knows about.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &HolderAccount)> {
        self.holders.iter()
    }

    /// Returns `true` if `(sender, id)` has been consumed.
    pub fn is_processed(&self, sender: &Address, id: MessageId) -> bool {
        self.replay.is_consumed(sender, id)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn is_registry(&self, sender: &Address) -> bool {
        self.registry.as_ref() == Some(sender)
    }

    fn require_registry(&self, sender: &Address) -> Result<(), LedgerError> {
        match &self.registry {
            None => Err(LedgerError::RegistryNotBound),
            Some(registry) if registry == sender => Ok(()),
            Some(_) => Err(LedgerError::Unauthorized {
                sender: sender.clone(),
                role: "registry",
            }),
        }
    }

    fn apply(&mut self, sender: &Address, message: LedgerMessage) -> Result<(), LedgerError> {
        match message {
            LedgerMessage::Mint { recipient, shares } => {
                self.require_registry(sender)?;
                self.mint(&recipient, shares)
            }
            LedgerMessage::Burn { account, shares } => {
                self.require_registry(sender)?;
                self.burn(&account, shares)
            }
            LedgerMessage::Rebase { total_pooled_value } => {
                self.require_registry(sender)?;
                info!(
                    previous = self.total_pooled_value,
                    total_pooled_value,
                    total_shares = self.total_shares,
                    "rebase applied"
                );
                self.total_pooled_value = total_pooled_value;
                Ok(())
            }
            LedgerMessage::TransferShares { to, shares } => self.move_shares(sender, &to, shares),
            LedgerMessage::Transfer { to, amount } => {
                let shares = self
                    .shares_by_pooled_value(amount)
                    .ok_or(LedgerError::Overflow)?;
                self.move_shares(sender, &to, shares)
            }
            LedgerMessage::Approve { spender, shares } => {
                let account = self.holders.entry(sender.clone()).or_default();
                if shares == 0 {
                    account.allowances.remove(&spender);
                } else {
                    account.allowances.insert(spender.clone(), shares);
                }
                debug!(owner = %sender, spender = %spender, shares, "allowance set");
                Ok(())
            }
            LedgerMessage::TransferFrom { from, to, shares } => {
                let allowed = self.allowance(&from, sender);
                if allowed < shares {
                    return Err(LedgerError::InsufficientAllowance {
                        owner: from,
                        spender: sender.clone(),
                        allowed,
                        requested: shares,
                    });
                }
                self.move_shares(&from, &to, shares)?;
                // The allowance check above guarantees the entry exists
                // whenever `shares > 0`.
                if let Some(account) = self.holders.get_mut(&from) {
                    let remaining = allowed - shares;
                    if remaining == 0 {
                        account.allowances.remove(sender);
                    } else {
                        account.allowances.insert(sender.clone(), remaining);
                    }
                }
                Ok(())
            }
            LedgerMessage::BindRegistry { registry } => {
                if sender != &self.deployer {
                    return Err(LedgerError::Unauthorized {
                        sender: sender.clone(),
                        role: "deployer",
                    });
                }
                if let Some(bound) = &self.registry {
                    return Err(LedgerError::AlreadyBound(bound.clone()));
                }
                info!(registry = %registry, "registry bound");
                self.registry = Some(registry);
                Ok(())
            }
        }
    }

    fn mint(&mut self, recipient: &Address, shares: u64) -> Result<(), LedgerError> {
        let total = self
            .total_shares
            .checked_add(shares)
            .ok_or(LedgerError::Overflow)?;
        let held = self
            .shares_of(recipient)
            .checked_add(shares)
            .ok_or(LedgerError::Overflow)?;

        self.holders.entry(recipient.clone()).or_default().shares = held;
        self.total_shares = total;
        info!(recipient = %recipient, shares, total_shares = total, "shares minted");
        Ok(())
    }

    fn burn(&mut self, account: &Address, shares: u64) -> Result<(), LedgerError> {
        let available = self.shares_of(account);
        if available < shares {
            return Err(LedgerError::InsufficientBalance {
                account: account.clone(),
                available,
                requested: shares,
            });
        }
        // available <= total_shares, so this cannot underflow either.
        let total = self
            .total_shares
            .checked_sub(shares)
            .ok_or(LedgerError::Overflow)?;

        if let Some(holder) = self.holders.get_mut(account) {
            holder.shares = available - shares;
        }
        self.total_shares = total;
        info!(account = %account, shares, total_shares = total, "shares burned");
        Ok(())
    }

    fn move_shares(
        &mut self,
        from: &Address,
        to: &Address,
        shares: u64,
    ) -> Result<(), LedgerError> {
        let available = self.shares_of(from);
        if available < shares {
            return Err(LedgerError::InsufficientBalance {
                account: from.clone(),
                available,
                requested: shares,
            });
        }
        if from == to || shares == 0 {
            return Ok(());
        }
        let credited = self
            .shares_of(to)
            .checked_add(shares)
            .ok_or(LedgerError::Overflow)?;

        self.holders.entry(from.clone()).or_default().shares = available - shares;
        self.holders.entry(to.clone()).or_default().shares = credited;
        debug!(from = %from, to = %to, shares, "shares transferred");
        Ok(())
    }

    fn receipt(&mut self, original: MessageId, outcome: ReceiptOutcome) -> Option<Outbound> {
        let registry = self.registry.clone()?;
        let id = self.next_outbound_id;
        self.next_outbound_id += 1;
        Some(Outbound::Registry {
            to: registry,
            envelope: Envelope::new(
                id,
                self.address.clone(),
                RegistryMessage::Receipt { original, outcome },
            ),
        })
    }
}

impl Actor for ShareLedger {
    type Message = LedgerMessage;
    type Error = LedgerError;

    fn name(&self) -> &'static str {
        "share_ledger"
    }

    fn message_kind(message: &LedgerMessage) -> &'static str {
        message.kind()
    }

    fn handle(
        &mut self,
        envelope: Envelope<LedgerMessage>,
        _now: u64,
    ) -> Result<Vec<Outbound>, LedgerError> {
        let Envelope { id, sender, body } = envelope;
        self.replay.check(&sender, id)?;

        let receipted = body.is_registry_only() && self.is_registry(&sender);
        self.apply(&sender, body)?;
        self.replay.record(&sender, id);

        let mut emitted = Vec::new();
        if receipted {
            emitted.extend(self.receipt(id, ReceiptOutcome::Applied));
        }
        Ok(emitted)
    }

    fn on_rejected(
        &mut self,
        sender: &Address,
        id: MessageId,
        error: &LedgerError,
    ) -> Vec<Outbound> {
        // A replay already got its receipt on first delivery.
        if matches!(error, LedgerError::Replay(_)) || !self.is_registry(sender) {
            return Vec::new();
        }
        warn!(
            id,
            code = error.code(),
            error = %error,
            "registry message rejected, sending receipt"
        );
        self.replay.record(sender, id);
        self.receipt(id, ReceiptOutcome::Rejected(Rejection::from_error(error)))
            .into_iter()
            .collect()
    }
}
