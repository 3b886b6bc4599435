//! # Protocol Configuration & Constants
//!
//! Every magic number in VaultHub lives here. Per-actor tunables that an
//! operator may want to change at startup are carried in the actors' own
//! config structs, which take their defaults from these constants.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full protocol version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Wire format version for envelopes. Bumped on any breaking change to the
/// message enums.
pub const WIRE_VERSION: u16 = 1;

// ---------------------------------------------------------------------------
// Economic Parameters
// ---------------------------------------------------------------------------

/// Denominator for every basis-point parameter. 10_000 bp = 100%.
pub const TOTAL_BASIS_POINTS: u64 = 10_000;

/// A vault report older than this many seconds cannot back new minting.
pub const ORACLE_FRESHNESS_WINDOW_SECS: u64 = 2 * 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Replay Protection
// ---------------------------------------------------------------------------

/// Maximum number of out-of-order ids tracked per sender above the
/// watermark. Beyond this the lowest ids are folded into the watermark.
pub const DEFAULT_REPLAY_WINDOW: usize = 4_096;

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Capacity of each actor's inbound mailbox.
pub const MAILBOX_CAPACITY: usize = 1_024;

/// Default HTTP gateway port.
pub const DEFAULT_API_PORT: u16 = 9841;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;
