// src/domain/model/status.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an alert.
///
/// Transitions are monotone:
/// `Active -> Acknowledged -> Resolved`, `Active -> Resolved`,
/// `Active -> Dismissed` (rejected for CRITICAL priority). `Resolved` and
/// `Dismissed` are terminal; nothing ever returns to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Dismissed,
}

impl AlertStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Dismissed)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertStatus::Active => "ACTIVE",
            AlertStatus::Acknowledged => "ACKNOWLEDGED",
            AlertStatus::Resolved => "RESOLVED",
            AlertStatus::Dismissed => "DISMISSED",
        };
        write!(f, "{}", s)
    }
}
