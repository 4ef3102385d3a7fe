// src/domain/model/settings.rs
//! User-controlled notification policy.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::model::alert_type::AlertType;
use crate::domain::model::priority::AlertPriority;

/// Tri-state OS notification permission, mirrored from the OS collaborator
/// and persisted with the restaurant profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionState {
    Granted,
    Denied,
    Undetermined,
}

/// Time-of-day window during which only CRITICAL alerts may notify.
/// `start > end` means the window wraps past midnight (e.g. 22:00-08:00).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whether `t` falls inside the window, boundaries inclusive.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= t && t <= self.end
        } else {
            t >= self.start || t <= self.end
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Master switch; false suppresses everything, including CRITICAL.
    pub enabled: bool,

    pub allow_critical: bool,
    pub allow_high: bool,
    pub allow_medium: bool,
    pub allow_low: bool,

    /// `None` disables quiet hours entirely.
    pub quiet_hours: Option<QuietHours>,
    /// Cap on notifications dispatched per trailing 60 minutes.
    pub max_per_hour: u32,

    /// Per-type enable flags; an absent entry means enabled.
    #[serde(default)]
    pub type_filters: HashMap<AlertType, bool>,

    pub sound_enabled: bool,
    pub vibration_enabled: bool,
    pub badge_enabled: bool,
    /// Use per-priority sound identifiers instead of the system default.
    pub custom_sounds: bool,
}

impl NotificationSettings {
    pub fn allows_priority(&self, priority: AlertPriority) -> bool {
        match priority {
            AlertPriority::Critical => self.allow_critical,
            AlertPriority::High => self.allow_high,
            AlertPriority::Medium => self.allow_medium,
            AlertPriority::Low => self.allow_low,
        }
    }

    pub fn allows_type(&self, alert_type: AlertType) -> bool {
        self.type_filters.get(&alert_type).copied().unwrap_or(true)
    }
}

impl Default for NotificationSettings {
    /// Documented defaults, also returned by the archive when no settings
    /// were ever saved: everything enabled, quiet hours 22:00-08:00, at most
    /// 10 notifications per hour.
    fn default() -> Self {
        let start = NaiveTime::from_hms_opt(22, 0, 0).expect("valid time");
        let end = NaiveTime::from_hms_opt(8, 0, 0).expect("valid time");
        Self {
            enabled: true,
            allow_critical: true,
            allow_high: true,
            allow_medium: true,
            allow_low: true,
            quiet_hours: Some(QuietHours::new(start, end)),
            max_per_hour: 10,
            type_filters: HashMap::new(),
            sound_enabled: true,
            vibration_enabled: true,
            badge_enabled: true,
            custom_sounds: false,
        }
    }
}
