// src/service/synthesis.rs
//! Alert synthesis engine.
//!
//! Produces candidate `Alert` values two ways:
//! - **Demo scenario mode**: a `ServiceScenario` selects a fixed, curated
//!   template list. No randomness; used for presentation and testing.
//! - **Context-weighted mode**: an alert type is drawn by weighted random
//!   choice (weights derived from time of day and occupancy), then a template
//!   within that type (critical tiers boosted as the room fills, low tiers
//!   boosted when it is quiet), then instantiated with context values
//!   substituted into message placeholders.
//!
//! The random source is injected so tests can pin exact selections.

use chrono::{DateTime, Timelike, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::model::alert::Alert;
use crate::domain::model::alert_type::AlertType;
use crate::domain::model::context::{DayPart, RestaurantContext, ServiceScenario};
use crate::domain::model::priority::AlertPriority;
use crate::util::clock::Clock;
use crate::util::random::{weighted_index, SharedRandom};

/// A curated alert blueprint. Placeholders `{restaurant}`, `{capacity}`,
/// `{orders}`, and `{staff}` are substituted at instantiation time.
#[derive(Debug, Clone, Copy)]
pub struct AlertTemplate {
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub title: &'static str,
    pub message: &'static str,
    pub details: Option<&'static str>,
    pub action_required: bool,
    pub estimated_resolution_min: Option<u32>,
}

/// Options for a generation request. `scenario` forces the demo path;
/// `type_weights` overrides the computed distribution in weighted mode.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub scenario: Option<ServiceScenario>,
    pub count: Option<usize>,
    pub type_weights: Option<HashMap<AlertType, f64>>,
}

// ---------------------------------------------------------------------------
// Template catalog
// ---------------------------------------------------------------------------

macro_rules! tmpl {
    ($ty:ident, $prio:ident, $title:expr, $msg:expr, $details:expr, $action:expr, $est:expr) => {
        AlertTemplate {
            alert_type: AlertType::$ty,
            priority: AlertPriority::$prio,
            title: $title,
            message: $msg,
            details: $details,
            action_required: $action,
            estimated_resolution_min: $est,
        }
    };
}

const ORDER_TEMPLATES: &[AlertTemplate] = &[
    tmpl!(Order, Critical, "Kitchen backlog critical",
        "{orders} open orders and ticket times past 35 minutes",
        Some("Expo is overwhelmed. Pull a manager to the pass and pause online orders."),
        true, Some(20)),
    tmpl!(Order, High, "Ticket times slipping",
        "Average ticket time over 20 minutes with {orders} active orders",
        None, true, Some(15)),
    tmpl!(Order, Medium, "Large party queued",
        "Party of 12 seated at {capacity}% capacity; kitchen should stagger fire times",
        None, false, Some(10)),
    tmpl!(Order, Low, "Delivery orders trending up",
        "Third-party platform volume rising at {restaurant}",
        None, false, None),
];

const EQUIPMENT_TEMPLATES: &[AlertTemplate] = &[
    tmpl!(Equipment, Critical, "Walk-in cooler failing",
        "Walk-in temperature above the safe range and climbing",
        Some("Move proteins to the reach-in and call refrigeration service."),
        true, Some(45)),
    tmpl!(Equipment, High, "Fryer not reaching temperature",
        "Station 2 fryer holding 40°F below target",
        None, true, Some(30)),
    tmpl!(Equipment, Medium, "Dish machine cycling slow",
        "Rack cycle time doubled; plating may back up at {capacity}% capacity",
        None, false, Some(25)),
    tmpl!(Equipment, Low, "Hood filter change due",
        "Scheduled filter swap due this week",
        None, false, None),
];

const INVENTORY_TEMPLATES: &[AlertTemplate] = &[
    tmpl!(Inventory, Critical, "Cold-chain breach on proteins",
        "Delivery left unrefrigerated; product temperature out of range",
        Some("Quarantine the delivery and log the rejection."),
        true, Some(30)),
    tmpl!(Inventory, High, "86 risk: chicken",
        "Projected to run out before close with {orders} open orders",
        None, true, Some(20)),
    tmpl!(Inventory, Medium, "Produce below par",
        "Romaine under par level for tomorrow's prep",
        None, false, None),
    tmpl!(Inventory, Low, "Dry goods reorder point",
        "Napkins and to-go boxes at reorder threshold",
        None, false, None),
];

const STAFF_TEMPLATES: &[AlertTemplate] = &[
    tmpl!(Staff, Critical, "No certified manager on floor",
        "Closing shift has no food-safety-certified manager scheduled",
        None, true, Some(60)),
    tmpl!(Staff, High, "Understaffed for current volume",
        "Only {staff} staff on duty at {capacity}% capacity",
        None, true, Some(30)),
    tmpl!(Staff, Medium, "Break schedule conflict",
        "Two line cooks scheduled for overlapping breaks during service",
        None, false, Some(10)),
    tmpl!(Staff, Low, "Shift swap requested",
        "Server requested a swap for Saturday dinner",
        None, false, None),
];

const CUSTOMER_TEMPLATES: &[AlertTemplate] = &[
    tmpl!(Customer, High, "Wait times over 30 minutes",
        "{capacity}% capacity with a growing waitlist at {restaurant}",
        None, true, Some(20)),
    tmpl!(Customer, Medium, "Complaint logged",
        "Guest at table 14 reported a cold entrée",
        None, true, Some(10)),
    tmpl!(Customer, Low, "Review responses pending",
        "Three online reviews from this week still unanswered",
        None, false, None),
];

const FINANCIAL_TEMPLATES: &[AlertTemplate] = &[
    tmpl!(Financial, Critical, "Card processing down",
        "POS payment gateway unreachable; cash only",
        Some("Switch terminals to offline mode and post signage."),
        true, Some(40)),
    tmpl!(Financial, Medium, "Cash drawer variance",
        "Drawer 2 over/short beyond tolerance at shift change",
        None, true, Some(15)),
    tmpl!(Financial, Low, "Daily sales report ready",
        "Yesterday's summary is available for review",
        None, false, None),
];

const SAFETY_TEMPLATES: &[AlertTemplate] = &[
    tmpl!(Safety, Critical, "Hood suppression fault",
        "Fire-suppression system reporting a fault over the main line",
        Some("Stop fryer service until the system is inspected."),
        true, Some(90)),
    tmpl!(Safety, High, "Wet floor near the line",
        "Standing water by the dish pit walkway",
        None, true, Some(5)),
    tmpl!(Safety, Low, "Safety walkthrough due",
        "Monthly walkthrough checklist not yet completed",
        None, false, None),
];

const HEALTH_TEMPLATES: &[AlertTemplate] = &[
    tmpl!(Health, Critical, "Holding temperature violation",
        "Hot-holding unit logged below 135°F for over an hour",
        Some("Discard affected items and record the corrective action."),
        true, Some(30)),
    tmpl!(Health, Medium, "Handwash station unstocked",
        "Line handwash station out of soap",
        None, true, Some(5)),
    tmpl!(Health, Low, "Inspection prep checklist",
        "Quarterly self-inspection due at {restaurant}",
        None, false, None),
];

const SECURITY_TEMPLATES: &[AlertTemplate] = &[
    tmpl!(Security, Critical, "Back door forced open",
        "Rear entry contact opened outside business hours",
        None, true, Some(15)),
    tmpl!(Security, High, "Alarm sensor offline",
        "Office motion sensor stopped reporting",
        None, true, Some(30)),
    tmpl!(Security, Low, "Camera storage near capacity",
        "DVR retention below 7 days of footage",
        None, false, None),
];

/// Full template list for one alert type.
pub fn type_templates(alert_type: AlertType) -> &'static [AlertTemplate] {
    match alert_type {
        AlertType::Order => ORDER_TEMPLATES,
        AlertType::Equipment => EQUIPMENT_TEMPLATES,
        AlertType::Inventory => INVENTORY_TEMPLATES,
        AlertType::Staff => STAFF_TEMPLATES,
        AlertType::Customer => CUSTOMER_TEMPLATES,
        AlertType::Financial => FINANCIAL_TEMPLATES,
        AlertType::Safety => SAFETY_TEMPLATES,
        AlertType::Health => HEALTH_TEMPLATES,
        AlertType::Security => SECURITY_TEMPLATES,
    }
}

/// Curated template set for a demo scenario, in presentation order.
pub fn scenario_templates(scenario: ServiceScenario) -> Vec<AlertTemplate> {
    match scenario {
        ServiceScenario::BusyLunchRush => vec![
            ORDER_TEMPLATES[1],     // ticket times slipping
            STAFF_TEMPLATES[1],     // understaffed
            CUSTOMER_TEMPLATES[0],  // wait times
            INVENTORY_TEMPLATES[1], // 86 risk
            EQUIPMENT_TEMPLATES[0], // walk-in failing
        ],
        ServiceScenario::MorningPrep => vec![
            INVENTORY_TEMPLATES[2], // produce below par
            EQUIPMENT_TEMPLATES[1], // fryer
            INVENTORY_TEMPLATES[3], // dry goods
            HEALTH_TEMPLATES[1],    // handwash station
        ],
        ServiceScenario::EveningService => vec![
            ORDER_TEMPLATES[2],     // large party
            CUSTOMER_TEMPLATES[1],  // complaint
            SECURITY_TEMPLATES[1],  // sensor offline
            EQUIPMENT_TEMPLATES[3], // filter due
        ],
        ServiceScenario::QuietAfternoon => vec![
            FINANCIAL_TEMPLATES[2], // sales report
            SAFETY_TEMPLATES[2],    // walkthrough
            INVENTORY_TEMPLATES[3], // dry goods
        ],
    }
}

// ---------------------------------------------------------------------------
// Weighting
// ---------------------------------------------------------------------------

/// Type-selection weights for the given hour and context.
///
/// Order alerts are weighted up during meal-service hours (11-13, 18-20) and
/// further when the room is over 70% full; staffing above 60% capacity and
/// customer alerts above 80%; security late at night.
pub fn type_weights(hour: u32, ctx: &RestaurantContext) -> Vec<(AlertType, f64)> {
    let pct = ctx.capacity_percent();
    let meal_service = matches!(hour, 11..=13 | 18..=20);
    AlertType::all()
        .iter()
        .map(|t| {
            let mut w = 1.0;
            match t {
                AlertType::Order => {
                    if meal_service {
                        w *= 3.0;
                        if pct > 70.0 {
                            w *= 1.5;
                        }
                    }
                }
                AlertType::Staff => {
                    if pct > 60.0 {
                        w *= 2.0;
                    }
                }
                AlertType::Customer => {
                    if pct > 80.0 {
                        w *= 2.0;
                    }
                }
                AlertType::Security => {
                    if !(5..22).contains(&hour) {
                        w *= 2.5;
                    }
                }
                _ => {}
            }
            (*t, w)
        })
        .collect()
}

/// Template-selection weight within a type. Critical/High tiers ramp up as
/// capacity approaches 90-100%; Low tiers are boosted under 30%.
pub fn template_weight(priority: AlertPriority, capacity_pct: f64) -> f64 {
    match priority {
        AlertPriority::Critical | AlertPriority::High if capacity_pct >= 90.0 => {
            1.0 + ((capacity_pct - 90.0) / 10.0).clamp(0.0, 1.0) * 2.0
        }
        AlertPriority::Low if capacity_pct < 30.0 => 2.0,
        _ => 1.0,
    }
}

/// Per-minute probability that the real-time simulation synthesizes a new
/// alert: rolling average frequency scaled by occupancy and time of day
/// (×2.0 within one hour of a peak hour, ×0.1 outside 06:00-23:00), clamped
/// to 0.10.
pub fn alert_probability_per_minute(now: DateTime<Utc>, ctx: &RestaurantContext) -> f64 {
    let hour = now.hour();
    let tod = if ctx.near_peak_hour(hour) {
        2.0
    } else if !(6..23).contains(&hour) {
        0.1
    } else {
        1.0
    };
    let p = (ctx.average_alerts_per_hour / 60.0) * (0.5 + ctx.capacity_fraction()) * tod;
    p.min(0.10)
}

/// Tags stamped on every synthesized alert so filtered views can slice by
/// operating situation.
pub fn context_tags(ctx: &RestaurantContext, now: DateTime<Utc>) -> Vec<String> {
    vec![
        ctx.kind.tag().to_string(),
        DayPart::from_time(now).tag().to_string(),
        ctx.capacity_tag().to_string(),
    ]
}

fn substitute(text: &str, ctx: &RestaurantContext) -> String {
    text.replace("{restaurant}", &ctx.restaurant_name)
        .replace("{capacity}", &format!("{:.0}", ctx.capacity_percent()))
        .replace("{orders}", &ctx.active_orders.to_string())
        .replace("{staff}", &ctx.staff_on_duty.to_string())
}

// ---------------------------------------------------------------------------
// Synthesizer
// ---------------------------------------------------------------------------

pub struct AlertSynthesizer {
    clock: Arc<dyn Clock>,
    rng: SharedRandom,
}

impl AlertSynthesizer {
    pub fn new(clock: Arc<dyn Clock>, rng: SharedRandom) -> Self {
        Self { clock, rng }
    }

    /// Demo path: instantiates the scenario's curated templates, in order.
    pub fn generate_for_scenario(
        &self,
        scenario: ServiceScenario,
        ctx: &RestaurantContext,
    ) -> Vec<Alert> {
        scenario_templates(scenario)
            .iter()
            .map(|t| self.instantiate(t, ctx))
            .collect()
    }

    /// Weighted path: draws `count` alerts from the catalog using the
    /// context-derived (or overridden) type distribution.
    pub fn generate_weighted(
        &self,
        ctx: &RestaurantContext,
        count: usize,
        override_weights: Option<&HashMap<AlertType, f64>>,
    ) -> Vec<Alert> {
        let hour = self.clock.now().hour();
        let weights: Vec<(AlertType, f64)> = match override_weights {
            Some(ov) => AlertType::all()
                .iter()
                .map(|t| (*t, ov.get(t).copied().unwrap_or(0.0)))
                .collect(),
            None => type_weights(hour, ctx),
        };
        let weight_values: Vec<f64> = weights.iter().map(|(_, w)| *w).collect();
        let pct = ctx.capacity_percent();

        let mut out = Vec::with_capacity(count);
        let mut rng = self.rng.lock().expect("random source lock poisoned");
        for _ in 0..count {
            let Some(ti) = weighted_index(rng.as_mut(), &weight_values) else {
                debug!("no positive type weight; skipping generation");
                break;
            };
            let templates = type_templates(weights[ti].0);
            let tw: Vec<f64> = templates
                .iter()
                .map(|t| template_weight(t.priority, pct))
                .collect();
            let Some(i) = weighted_index(rng.as_mut(), &tw) else { continue };
            out.push(self.instantiate(&templates[i], ctx));
        }
        drop(rng);
        metrics::increment_counter!("alerts_synthesized");
        out
    }

    fn instantiate(&self, tmpl: &AlertTemplate, ctx: &RestaurantContext) -> Alert {
        let now = self.clock.now();
        let mut alert = Alert::new(
            tmpl.alert_type,
            tmpl.priority,
            substitute(tmpl.title, ctx),
            substitute(tmpl.message, ctx),
            now,
        );
        alert.details = tmpl.details.map(|d| substitute(d, ctx));
        alert.action_required = tmpl.action_required;
        alert.estimated_resolution_min = tmpl.estimated_resolution_min;
        alert.tags = context_tags(ctx, now);
        alert
    }
}
