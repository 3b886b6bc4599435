//! Wire messages exchanged with and between the actors.
//!
//! ```text
//!   admin / oracle                    holders / spenders
//!        │                                    │
//!        ▼                                    ▼
//!  ┌───────────────┐  Mint / Burn / Rebase ┌─────────────┐
//!  │ VaultRegistry ├──────────────────────►│ ShareLedger │
//!  │               │◄──────────────────────┤             │
//!  └───────────────┘        Receipt        └─────────────┘
//! ```
//!
//! Every message travels inside an [`Envelope`](crate::types::Envelope)
//! that carries its sender and replay id. Message enums are internally
//! tagged on `type` for a readable JSON encoding.

use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use crate::types::{Address, Envelope, MessageId};

// ---------------------------------------------------------------------------
// Registry inbound
// ---------------------------------------------------------------------------

/// Messages accepted by the vault registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryMessage {
    /// Create or reactivate a vault record. Admin only.
    ConnectVault {
        vault: Address,
        share_limit: u64,
        reserve_ratio_bp: u64,
        infra_fee_bp: u64,
        liquidity_fee_bp: u64,
    },
    /// Soft-delete a vault record. Admin only.
    DisconnectVault { vault: Address },
    /// Overwrite a connected vault's limits. Admin only.
    UpdateConnection {
        vault: Address,
        share_limit: u64,
        reserve_ratio_bp: u64,
        infra_fee_bp: u64,
    },
    /// Record a fresh oracle valuation. Oracle only.
    ApplyVaultReport {
        vault: Address,
        total_value: i64,
        in_out_delta: i64,
    },
    /// Issue shares against a vault. Admin only.
    MintShares {
        vault: Address,
        amount: u64,
        recipient: Address,
    },
    /// Retire shares issued against a vault. Admin only.
    BurnShares { vault: Address, amount: u64 },
    /// Stop accepting risk-increasing operations. Admin only.
    Pause,
    /// Undo [`RegistryMessage::Pause`]. Admin only.
    Resume,
    /// One-time binding of the ledger identity. Admin only.
    BindLedger { ledger: Address },
    /// Replace the oracle identity. Admin only.
    SetOracle { oracle: Address },
    /// Hand the admin role to another identity. Admin only.
    TransferAdmin { admin: Address },
    /// Outcome of a registry-originated ledger message. Ledger only.
    Receipt {
        original: MessageId,
        outcome: ReceiptOutcome,
    },
}

impl RegistryMessage {
    /// Short name for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryMessage::ConnectVault { .. } => "connect_vault",
            RegistryMessage::DisconnectVault { .. } => "disconnect_vault",
            RegistryMessage::UpdateConnection { .. } => "update_connection",
            RegistryMessage::ApplyVaultReport { .. } => "apply_vault_report",
            RegistryMessage::MintShares { .. } => "mint_shares",
            RegistryMessage::BurnShares { .. } => "burn_shares",
            RegistryMessage::Pause => "pause",
            RegistryMessage::Resume => "resume",
            RegistryMessage::BindLedger { .. } => "bind_ledger",
            RegistryMessage::SetOracle { .. } => "set_oracle",
            RegistryMessage::TransferAdmin { .. } => "transfer_admin",
            RegistryMessage::Receipt { .. } => "receipt",
        }
    }
}

/// Result of a registry-originated message at the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReceiptOutcome {
    /// The ledger applied the message.
    Applied,
    /// The ledger rejected the message; no effect was applied.
    Rejected(Rejection),
}

// ---------------------------------------------------------------------------
// Ledger inbound
// ---------------------------------------------------------------------------

/// Messages accepted by the share ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerMessage {
    /// Create shares for `recipient`. Registry only.
    Mint { recipient: Address, shares: u64 },
    /// Destroy shares held by `account`. Registry only.
    Burn { account: Address, shares: u64 },
    /// Replace the pooled value backing all shares. Registry only.
    Rebase { total_pooled_value: u64 },
    /// Move shares from the sender to `to`.
    TransferShares { to: Address, shares: u64 },
    /// Move the shares currently worth `amount` pooled value to `to`.
    Transfer { to: Address, amount: u64 },
    /// Set the sender's allowance for `spender` (overwrites).
    Approve { spender: Address, shares: u64 },
    /// Spend an allowance: move shares from `from` to `to`.
    TransferFrom {
        from: Address,
        to: Address,
        shares: u64,
    },
    /// One-time binding of the registry identity. Deployer only.
    BindRegistry { registry: Address },
}

impl LedgerMessage {
    /// Short name for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerMessage::Mint { .. } => "mint",
            LedgerMessage::Burn { .. } => "burn",
            LedgerMessage::Rebase { .. } => "rebase",
            LedgerMessage::TransferShares { .. } => "transfer_shares",
            LedgerMessage::Transfer { .. } => "transfer",
            LedgerMessage::Approve { .. } => "approve",
            LedgerMessage::TransferFrom { .. } => "transfer_from",
            LedgerMessage::BindRegistry { .. } => "bind_registry",
        }
    }

    /// Returns `true` for the supply-affecting messages only the registry
    /// may send.
    pub fn is_registry_only(&self) -> bool {
        matches!(
            self,
            LedgerMessage::Mint { .. } | LedgerMessage::Burn { .. } | LedgerMessage::Rebase { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A one-way message emitted by a committed transition.
///
/// Handlers return these instead of delivering them; the runtime forwards
/// them after the transition has committed, so emitting never suspends the
/// emitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum Outbound {
    /// Deliver to the share ledger at `to`.
    Ledger {
        to: Address,
        envelope: Envelope<LedgerMessage>,
    },
    /// Deliver to the vault registry at `to`.
    Registry {
        to: Address,
        envelope: Envelope<RegistryMessage>,
    },
}

impl Outbound {
    /// Destination identity.
    pub fn destination(&self) -> &Address {
        match self {
            Outbound::Ledger { to, .. } | Outbound::Registry { to, .. } => to,
        }
    }
}
