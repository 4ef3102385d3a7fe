// src/domain/model/context.rs
//! Restaurant operating context.
//!
//! A read-mostly snapshot produced by the restaurant-profile collaborator and
//! passed by value into the synthesis engine and the scheduler. The core
//! never mutates it.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::model::settings::PermissionState;

/// Kind of establishment; scales simulated alert frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestaurantKind {
    FastFood,
    CasualDining,
    FineDining,
    Cafe,
    Bar,
}

impl RestaurantKind {
    /// Multiplier applied to the real-time simulation tick probability.
    pub fn simulation_multiplier(&self) -> f64 {
        match self {
            RestaurantKind::FastFood => 1.3,
            RestaurantKind::CasualDining => 1.0,
            RestaurantKind::FineDining => 0.8,
            RestaurantKind::Cafe => 1.1,
            RestaurantKind::Bar => 1.2,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            RestaurantKind::FastFood => "kind:fast-food",
            RestaurantKind::CasualDining => "kind:casual-dining",
            RestaurantKind::FineDining => "kind:fine-dining",
            RestaurantKind::Cafe => "kind:cafe",
            RestaurantKind::Bar => "kind:bar",
        }
    }
}

/// Coarse time-of-day bucket used for tagging and simulation weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DayPart {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => DayPart::Morning,
            12..=16 => DayPart::Afternoon,
            17..=21 => DayPart::Evening,
            _ => DayPart::Night,
        }
    }

    pub fn from_time(t: DateTime<Utc>) -> Self {
        Self::from_hour(t.hour())
    }

    /// Multiplier applied to the real-time simulation tick probability.
    pub fn simulation_multiplier(&self) -> f64 {
        match self {
            DayPart::Morning => 1.5,
            DayPart::Afternoon => 2.0,
            DayPart::Evening => 1.8,
            DayPart::Night => 0.3,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            DayPart::Morning => "daypart:morning",
            DayPart::Afternoon => "daypart:afternoon",
            DayPart::Evening => "daypart:evening",
            DayPart::Night => "daypart:night",
        }
    }
}

/// Named demo scenario; selects a curated template set in demo mode and a
/// contextual scheduling policy in the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceScenario {
    BusyLunchRush,
    MorningPrep,
    EveningService,
    QuietAfternoon,
}

/// Snapshot of the restaurant's current operating state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantContext {
    pub restaurant_name: String,
    pub kind: RestaurantKind,

    /// Guests currently seated.
    pub capacity: u32,
    pub max_capacity: u32,
    pub active_orders: u32,
    pub staff_on_duty: u32,
    pub is_open: bool,

    /// Rolling average alert frequency, alerts per hour.
    pub average_alerts_per_hour: f64,
    /// Hours of day (0-23) at which service peaks.
    pub peak_hours: Vec<u32>,
    pub is_weekend: bool,

    /// Demo mode swaps weighted generation for curated scenario templates and
    /// lets the simulation run faster than real time.
    pub demo_mode: bool,
    pub simulation_speed: f64,
}

impl RestaurantContext {
    /// Occupancy as a fraction in `[0, 1]`.
    pub fn capacity_fraction(&self) -> f64 {
        if self.max_capacity == 0 {
            return 0.0;
        }
        (self.capacity as f64 / self.max_capacity as f64).clamp(0.0, 1.0)
    }

    pub fn capacity_percent(&self) -> f64 {
        self.capacity_fraction() * 100.0
    }

    pub fn capacity_tag(&self) -> &'static str {
        let pct = self.capacity_percent();
        if pct < 30.0 {
            "capacity:light"
        } else if pct < 60.0 {
            "capacity:moderate"
        } else if pct < 85.0 {
            "capacity:busy"
        } else {
            "capacity:packed"
        }
    }

    /// True when `hour` is within one hour of any configured peak hour,
    /// wrapping around midnight.
    pub fn near_peak_hour(&self, hour: u32) -> bool {
        self.peak_hours.iter().any(|p| {
            let d = (hour as i64 - *p as i64).rem_euclid(24);
            d <= 1 || d >= 23
        })
    }
}

/// Persisted restaurant profile, owned by the external profile collaborator.
/// The engine only reads it back for context defaults and the last known
/// notification-permission state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantProfile {
    pub restaurant_name: String,
    pub kind: RestaurantKind,
    pub max_capacity: u32,
    pub peak_hours: Vec<u32>,
    #[serde(default)]
    pub permission_state: Option<PermissionState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(capacity: u32, max: u32) -> RestaurantContext {
        RestaurantContext {
            restaurant_name: "La Brasa".into(),
            kind: RestaurantKind::CasualDining,
            capacity,
            max_capacity: max,
            active_orders: 12,
            staff_on_duty: 5,
            is_open: true,
            average_alerts_per_hour: 4.0,
            peak_hours: vec![12, 19],
            is_weekend: false,
            demo_mode: false,
            simulation_speed: 1.0,
        }
    }

    #[test]
    fn capacity_buckets() {
        assert_eq!(ctx(10, 100).capacity_tag(), "capacity:light");
        assert_eq!(ctx(45, 100).capacity_tag(), "capacity:moderate");
        assert_eq!(ctx(70, 100).capacity_tag(), "capacity:busy");
        assert_eq!(ctx(95, 100).capacity_tag(), "capacity:packed");
        // zero max capacity must not divide by zero
        assert_eq!(ctx(10, 0).capacity_fraction(), 0.0);
    }

    #[test]
    fn peak_window_wraps_midnight() {
        let mut c = ctx(10, 100);
        c.peak_hours = vec![23];
        assert!(c.near_peak_hour(22));
        assert!(c.near_peak_hour(23));
        assert!(c.near_peak_hour(0));
        assert!(!c.near_peak_hour(2));
    }

    #[test]
    fn dayparts() {
        assert_eq!(DayPart::from_hour(6), DayPart::Morning);
        assert_eq!(DayPart::from_hour(13), DayPart::Afternoon);
        assert_eq!(DayPart::from_hour(19), DayPart::Evening);
        assert_eq!(DayPart::from_hour(2), DayPart::Night);
    }
}
