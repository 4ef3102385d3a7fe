// src/domain/model/priority.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Urgency of an alert. The declaration order is the total order used by
/// scheduling: `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertPriority {
    /// Requires immediate action; bypasses quiet hours and the hourly rate
    /// limit, and can never be dismissed.
    Critical,
    /// Requires prompt attention.
    High,
    /// Should be handled during normal operations.
    Medium,
    /// Informational; safe to defer.
    Low,
}

impl AlertPriority {
    /// Numeric rank used for sorting. Lower = more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            AlertPriority::Critical => 0,
            AlertPriority::High => 1,
            AlertPriority::Medium => 2,
            AlertPriority::Low => 3,
        }
    }

    /// Prefix used when formatting notification titles.
    pub fn emoji(&self) -> &'static str {
        match self {
            AlertPriority::Critical => "🚨",
            AlertPriority::High => "⚠️",
            AlertPriority::Medium => "🔔",
            AlertPriority::Low => "ℹ️",
        }
    }

    /// Sound identifier per tier, used when custom sounds are enabled.
    pub fn sound_id(&self) -> &'static str {
        match self {
            AlertPriority::Critical => "alarm-critical",
            AlertPriority::High => "chime-urgent",
            AlertPriority::Medium => "chime-soft",
            AlertPriority::Low => "tick",
        }
    }

    pub fn all() -> [AlertPriority; 4] {
        [
            AlertPriority::Critical,
            AlertPriority::High,
            AlertPriority::Medium,
            AlertPriority::Low,
        ]
    }

    /// Parses from loose text, defaulting unknown values to `Medium`.
    pub fn from_str_flexible(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "critical" | "crit" => AlertPriority::Critical,
            "high" => AlertPriority::High,
            "low" => AlertPriority::Low,
            _ => AlertPriority::Medium,
        }
    }
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertPriority::Critical => write!(f, "CRITICAL"),
            AlertPriority::High => write!(f, "HIGH"),
            AlertPriority::Medium => write!(f, "MEDIUM"),
            AlertPriority::Low => write!(f, "LOW"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_matches_declaration_order() {
        assert!(AlertPriority::Critical < AlertPriority::High);
        assert!(AlertPriority::High < AlertPriority::Medium);
        assert!(AlertPriority::Medium < AlertPriority::Low);
        assert_eq!(AlertPriority::Critical.rank(), 0);
        assert_eq!(AlertPriority::Low.rank(), 3);
    }
}
