// Copyright (c) 2026 VaultHub Contributors. MIT License.
// See LICENSE for details.

//! # VaultHub Protocol — Shared Core
//!
//! Everything the registry and ledger actors have in common, and nothing
//! that belongs to either one alone:
//!
//! - **types** — identities, message ids, envelopes.
//! - **message** — the wire messages both actors accept and emit.
//! - **error** — the five-way error classification every failure maps to.
//! - **replay** — bounded per-sender replay protection.
//! - **math** — checked share/value arithmetic with `u128` intermediates.
//! - **clock** — the time source handed to every transition.
//! - **runtime** — one tokio task per actor, mailbox in, outbox out.
//! - **config** — protocol constants.
//!
//! ## Design Rules
//!
//! 1. Actors share no memory. The only thing that crosses between them is a
//!    message.
//! 2. A transition either commits completely or changes nothing, including
//!    the replay record.
//! 3. Money never wraps: every add and subtract is checked.

pub mod clock;
pub mod config;
pub mod error;
pub mod math;
pub mod message;
pub mod replay;
pub mod runtime;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Classify, ErrorClass, Rejection};
pub use message::{LedgerMessage, Outbound, ReceiptOutcome, RegistryMessage};
pub use replay::{ReplayError, ReplayGuard};
pub use runtime::{Actor, ActorHandle, NoopObserver, Observer, RuntimeError};
pub use types::{Address, Envelope, MessageId};
