// src/domain/model/alert_type.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operational category of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertType {
    Order,
    Equipment,
    Inventory,
    Staff,
    Customer,
    Financial,
    Safety,
    Health,
    Security,
}

impl AlertType {
    pub fn all() -> [AlertType; 9] {
        [
            AlertType::Order,
            AlertType::Equipment,
            AlertType::Inventory,
            AlertType::Staff,
            AlertType::Customer,
            AlertType::Financial,
            AlertType::Safety,
            AlertType::Health,
            AlertType::Security,
        ]
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertType::Order => "ORDER",
            AlertType::Equipment => "EQUIPMENT",
            AlertType::Inventory => "INVENTORY",
            AlertType::Staff => "STAFF",
            AlertType::Customer => "CUSTOMER",
            AlertType::Financial => "FINANCIAL",
            AlertType::Safety => "SAFETY",
            AlertType::Health => "HEALTH",
            AlertType::Security => "SECURITY",
        };
        write!(f, "{}", s)
    }
}
