//! Error classification shared by every actor.
//!
//! Each actor has its own `thiserror` enum. On top of that, every failure
//! maps to one [`ErrorClass`] and a stable snake_case code, so that a
//! transport can surface a distinct classification instead of a generic
//! failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Wrong sender for an admin/oracle/registry-restricted operation.
    Authorization,
    /// Unknown vault, already-connected, disconnected target, bad parameter.
    StateValidation,
    /// Stale report, solvency breach, insufficient shares/balance/allowance.
    Economic,
    /// Paused, collaborator not bound.
    Operational,
    /// Duplicate message identifier.
    Replay,
}

impl ErrorClass {
    /// Stable lowercase name, used for metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Authorization => "authorization",
            ErrorClass::StateValidation => "state_validation",
            ErrorClass::Economic => "economic",
            ErrorClass::Operational => "operational",
            ErrorClass::Replay => "replay",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every actor error type.
pub trait Classify {
    /// The failure category.
    fn class(&self) -> ErrorClass;

    /// A stable, machine-readable code, e.g. `"max_liability"`.
    fn code(&self) -> &'static str;
}

/// Serializable summary of a failure, suitable for receipts and API bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Stable error code.
    pub code: String,
    /// Failure category.
    pub class: ErrorClass,
    /// Human-readable description.
    pub message: String,
}

impl Rejection {
    /// Summarizes any classified error.
    pub fn from_error<E: Classify + fmt::Display>(err: &E) -> Self {
        Self {
            code: err.code().to_string(),
            class: err.class(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.class, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorClass::StateValidation).unwrap();
        assert_eq!(json, "\"state_validation\"");
        assert_eq!(ErrorClass::StateValidation.as_str(), "state_validation");
    }
}
