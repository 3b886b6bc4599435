//! # VaultHub Contracts
//!
//! The two actors that make up the hub:
//!
//! - **Vault Registry** — connected vaults, their limits and reported value,
//!   and the shares issued against each. Enforces solvency on every mint.
//! - **Share Ledger** — who holds how many shares, and what a share is worth
//!   now that the pool has been rebased.
//! - **System** — spawns both, binds them to each other, and routes the
//!   messages they send.
//!
//! ## Design Principles
//!
//! 1. All monetary operations are checked. Products go through `u128`, and
//!    anything that would leave `u64` is an error rather than a wrap.
//! 2. Every transition validates first and mutates last, so a rejected
//!    message leaves no trace (not even in the replay record).
//! 3. Role checks gate every privileged operation.
//! 4. Every public record type is serializable (serde) for the HTTP gateway.

pub mod share_ledger;
pub mod system;
pub mod vault_registry;

pub use share_ledger::{HolderAccount, LedgerConfig, LedgerError, ShareLedger};
pub use system::{Hub, HubConfig, HubError};
pub use vault_registry::{InFlight, RegistryConfig, RegistryError, VaultRecord, VaultRegistry};
