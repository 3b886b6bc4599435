//! Bounded replay protection.
//!
//! Every mutating message carries a [`MessageId`] chosen by its sender.
//! Each actor owns one [`ReplayGuard`] and consults it before applying any
//! effect. The check and the record are split on purpose: an actor calls
//! [`ReplayGuard::check`] first, validates and computes the transition, and
//! only calls [`ReplayGuard::record`] once the transition commits. A
//! message that fails for any other reason therefore leaves its id unused
//! and may be retried.
//!
//! ## Bounding
//!
//! Remembering every id forever grows without bound. The guard instead
//! keeps, per sender, a watermark and an ordered set of ids at or above it:
//!
//! - every id strictly below the watermark counts as consumed;
//! - when the lowest tracked id equals the watermark, the watermark advances
//!   past it and the id is dropped from the set;
//! - when the set grows past the configured window, the lowest ids are
//!   folded into the watermark regardless of gaps.
//!
//! Senders that number their messages with increasing ids never notice the
//! folding. A sender that skips far ahead and later goes back may find the
//! skipped ids rejected as replays.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::config::DEFAULT_REPLAY_WINDOW;
use crate::error::{Classify, ErrorClass};
use crate::types::{Address, MessageId};

/// Errors raised by the replay guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// This exact id has already been processed for this sender.
    #[error("message {id} from {sender} was already processed")]
    Duplicate {
        /// The sender of the duplicate.
        sender: Address,
        /// The duplicate id.
        id: MessageId,
    },

    /// The id lies below the sender's watermark.
    #[error("message {id} from {sender} is below the replay watermark {watermark}")]
    BelowWatermark {
        /// The sender of the stale message.
        sender: Address,
        /// The stale id.
        id: MessageId,
        /// The sender's current watermark.
        watermark: MessageId,
    },
}

impl Classify for ReplayError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Replay
    }

    fn code(&self) -> &'static str {
        match self {
            ReplayError::Duplicate { .. } => "replay",
            ReplayError::BelowWatermark { .. } => "replay_below_watermark",
        }
    }
}

/// Per-sender replay state.
#[derive(Debug, Clone, Default)]
struct SenderWindow {
    /// Every id below this value is consumed.
    watermark: MessageId,
    /// Consumed ids at or above the watermark.
    seen: BTreeSet<MessageId>,
}

impl SenderWindow {
    fn contains(&self, id: MessageId) -> bool {
        id < self.watermark || self.seen.contains(&id)
    }

    fn insert(&mut self, id: MessageId, window: usize) {
        self.seen.insert(id);
        self.fold_contiguous();

        while self.seen.len() > window {
            let Some(lowest) = self.seen.pop_first() else {
                break;
            };
            match lowest.checked_add(1) {
                Some(next) => self.watermark = next,
                None => {
                    // u64::MAX itself can never be folded; keep it tracked.
                    self.seen.insert(lowest);
                    break;
                }
            }
            self.fold_contiguous();
        }
    }

    fn fold_contiguous(&mut self) {
        while self.seen.first() == Some(&self.watermark) {
            let Some(next) = self.watermark.checked_add(1) else {
                break;
            };
            self.seen.remove(&self.watermark);
            self.watermark = next;
        }
    }
}

/// Records consumed message ids per sender and rejects duplicates.
#[derive(Debug, Clone)]
pub struct ReplayGuard {
    window: usize,
    senders: HashMap<Address, SenderWindow>,
}

impl ReplayGuard {
    /// Creates a guard that tracks at most `window` out-of-order ids per
    /// sender. A window of zero is treated as one.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            senders: HashMap::new(),
        }
    }

    /// Fails with a [`ReplayError`] if `id` was already consumed for
    /// `sender`. Does not record anything.
    pub fn check(&self, sender: &Address, id: MessageId) -> Result<(), ReplayError> {
        let Some(state) = self.senders.get(sender) else {
            return Ok(());
        };
        if id < state.watermark {
            return Err(ReplayError::BelowWatermark {
                sender: sender.clone(),
                id,
                watermark: state.watermark,
            });
        }
        if state.seen.contains(&id) {
            return Err(ReplayError::Duplicate {
                sender: sender.clone(),
                id,
            });
        }
        Ok(())
    }

    /// Marks `id` as consumed for `sender`. Call only after the transition
    /// that consumed it has committed.
    pub fn record(&mut self, sender: &Address, id: MessageId) {
        let window = self.window;
        self.senders
            .entry(sender.clone())
            .or_default()
            .insert(id, window);
    }

    /// Returns `true` if `id` counts as consumed for `sender`.
    pub fn is_consumed(&self, sender: &Address, id: MessageId) -> bool {
        self.senders
            .get(sender)
            .map(|s| s.contains(id))
            .unwrap_or(false)
    }

    /// The sender's watermark: every id below it counts as consumed.
    pub fn watermark(&self, sender: &Address) -> MessageId {
        self.senders.get(sender).map(|s| s.watermark).unwrap_or(0)
    }

    /// Total number of ids held in memory across all senders.
    pub fn tracked(&self) -> usize {
        self.senders.values().map(|s| s.seen.len()).sum()
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_WINDOW)
    }
}
