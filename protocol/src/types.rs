//! Identity and envelope types shared by every actor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-chosen message identifier, unique per sender.
pub type MessageId = u64;

/// Opaque identity of an actor, vault or holder.
///
/// Identities are compared byte-for-byte. Nothing in the core interprets
/// their contents; the transport is responsible for authenticating that a
/// message's `sender` really is who it claims to be.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wraps a raw identity string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// A message together with the metadata every actor needs before looking at
/// its body: who sent it and under which replay identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<M> {
    /// Replay identifier, unique per `sender`.
    pub id: MessageId,
    /// Authenticated identity of the sender.
    pub sender: Address,
    /// The message itself.
    pub body: M,
}

impl<M> Envelope<M> {
    /// Builds an envelope.
    pub fn new(id: MessageId, sender: impl Into<Address>, body: M) -> Self {
        Self {
            id,
            sender: sender.into(),
            body,
        }
    }
}
