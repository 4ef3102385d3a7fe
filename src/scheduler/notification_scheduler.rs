// src/scheduler/notification_scheduler.rs
//! Notification scheduler.
//!
//! Turns eligible alerts into timed delivery attempts. Each scheduled alert
//! gets one pending timer task keyed by alert id; when the timer fires the
//! attempt goes through the delivery gate, and on a successful send the
//! scheduler flips the alert's notification bookkeeping in the shared
//! collection. The scheduler never touches status fields; those belong to
//! the lifecycle manager.
//!
//! Delays run on the tokio timer (drive them with `start_paused` tests), but
//! every delay value is drawn from the injected random source so tests can
//! pin the exact durations.

use chrono::Timelike;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::model::alert::Alert;
use crate::domain::model::alert_type::AlertType;
use crate::domain::model::context::ServiceScenario;
use crate::domain::model::priority::AlertPriority;
use crate::service::delivery_gate::{DeliveryGate, DeliveryOutcome};
use crate::service::lifecycle::SharedAlerts;
use crate::util::clock::Clock;
use crate::util::random::SharedRandom;

/// Alerts of the same type created within this window batch together.
const BATCH_WINDOW_MINUTES: i64 = 5;
/// Most alerts one notification pass forwards during a lunch rush.
const LUNCH_RUSH_LIMIT: usize = 5;

/// Delay tier bounds per priority, milliseconds. Critical fires immediately;
/// the rest draw uniformly from their band.
fn delay_bounds_ms(priority: AlertPriority) -> (u64, u64) {
    match priority {
        AlertPriority::Critical => (0, 0),
        AlertPriority::High => (30_000, 120_000),
        AlertPriority::Medium => (120_000, 300_000),
        AlertPriority::Low => (300_000, 900_000),
    }
}

/// Narrows or widens what gets notified based on how responsive the user has
/// historically been, `engagement_score` in `[0, 1]`. Disengaged users only
/// see the urgent tiers; highly engaged users get low-priority alerts
/// promoted to notify. The middle band is identity.
pub fn adapt_to_engagement(alerts: &[Alert], engagement_score: f64) -> Vec<Alert> {
    if engagement_score < 0.3 {
        alerts
            .iter()
            .filter(|a| {
                matches!(a.priority, AlertPriority::Critical | AlertPriority::High)
            })
            .cloned()
            .collect()
    } else if engagement_score > 0.8 {
        alerts
            .iter()
            .cloned()
            .map(|mut a| {
                if a.priority == AlertPriority::Low {
                    a.should_notify = true;
                }
                a
            })
            .collect()
    } else {
        alerts.to_vec()
    }
}

/// Contextual selection per demo scenario: a lunch rush caps the pass at the
/// five most urgent alerts, morning prep keeps stock and equipment issues
/// (plus anything critical), evening service collapses each related batch to
/// its most urgent member. Other scenarios pass through unchanged.
pub fn schedule_for_restaurant_context(
    alerts: &[Alert],
    scenario: ServiceScenario,
) -> Vec<Alert> {
    match scenario {
        ServiceScenario::BusyLunchRush => {
            let mut out = alerts.to_vec();
            out.sort_by_key(|a| a.priority.rank());
            out.truncate(LUNCH_RUSH_LIMIT);
            out
        }
        ServiceScenario::MorningPrep => alerts
            .iter()
            .filter(|a| {
                matches!(a.alert_type, AlertType::Inventory | AlertType::Equipment)
                    || a.priority == AlertPriority::Critical
            })
            .cloned()
            .collect(),
        ServiceScenario::EveningService => batch_related_alerts(alerts)
            .into_iter()
            .filter_map(|batch| batch.into_iter().min_by_key(|a| a.priority.rank()))
            .collect(),
        ServiceScenario::QuietAfternoon => alerts.to_vec(),
    }
}

/// Two alerts are related when they share a type within the batch window,
/// are both equipment faults, or pair inventory shortage with order pressure.
fn related(a: &Alert, b: &Alert) -> bool {
    let close = (a.created_at - b.created_at).num_minutes().abs() <= BATCH_WINDOW_MINUTES;
    if a.alert_type == b.alert_type && close {
        return true;
    }
    if a.alert_type == AlertType::Equipment && b.alert_type == AlertType::Equipment {
        return true;
    }
    matches!(
        (a.alert_type, b.alert_type),
        (AlertType::Inventory, AlertType::Order) | (AlertType::Order, AlertType::Inventory)
    )
}

/// Greedy grouping: each unplaced alert seeds a batch and absorbs every later
/// alert related to the seed. Input order is preserved inside batches.
pub fn batch_related_alerts(alerts: &[Alert]) -> Vec<Vec<Alert>> {
    let mut placed = vec![false; alerts.len()];
    let mut batches = Vec::new();
    for i in 0..alerts.len() {
        if placed[i] {
            continue;
        }
        placed[i] = true;
        let mut batch = vec![alerts[i].clone()];
        for j in (i + 1)..alerts.len() {
            if !placed[j] && related(&alerts[i], &alerts[j]) {
                placed[j] = true;
                batch.push(alerts[j].clone());
            }
        }
        batches.push(batch);
    }
    batches
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingStats {
    pub total: usize,
    pub pending: usize,
    pub average_delay_ms: u64,
}

pub struct NotificationScheduler {
    gate: Arc<DeliveryGate>,
    alerts: SharedAlerts,
    clock: Arc<dyn Clock>,
    rng: SharedRandom,
    pending: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

impl NotificationScheduler {
    pub fn new(
        gate: Arc<DeliveryGate>,
        alerts: SharedAlerts,
        clock: Arc<dyn Clock>,
        rng: SharedRandom,
    ) -> Self {
        Self {
            gate,
            alerts,
            clock,
            rng,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Draws the delivery delay for one alert from its tier band.
    fn pick_delay_ms(&self, priority: AlertPriority) -> u64 {
        let (lo, hi) = delay_bounds_ms(priority);
        if hi > lo {
            let mut rng = self.rng.lock().expect("random source lock poisoned");
            rng.next_u64_in(lo, hi)
        } else {
            lo
        }
    }

    /// Time-of-day pass over a candidate list: early morning keeps only the
    /// urgent tiers, daytime keeps everything, the dinner window lets half of
    /// medium alerts through, and overnight only critical survives.
    pub fn optimize_for_time_of_day(&self, alerts: &[Alert]) -> Vec<Alert> {
        let hour = self.clock.now().hour();
        let mut rng = self.rng.lock().expect("random source lock poisoned");
        let mut out = Vec::new();
        for a in alerts {
            let keep = match hour {
                5..=7 => matches!(a.priority, AlertPriority::Critical | AlertPriority::High),
                8..=17 => true,
                18..=21 => match a.priority {
                    AlertPriority::Critical | AlertPriority::High => true,
                    AlertPriority::Medium => rng.next_f64() < 0.5,
                    AlertPriority::Low => false,
                },
                _ => a.priority == AlertPriority::Critical,
            };
            if keep {
                out.push(a.clone());
            }
        }
        out
    }

    /// Schedules the alerts that want a notification and have not had one
    /// sent. A second schedule for the same alert replaces its pending timer.
    /// Returns how many timers were started.
    pub async fn schedule_notifications(&self, alerts: &[Alert]) -> usize {
        let mut scheduled = 0;
        for alert in alerts {
            if !alert.should_notify || alert.notification_sent {
                continue;
            }
            let delay = self.pick_delay_ms(alert.priority);
            self.spawn_timer(alert.clone(), delay).await;
            scheduled += 1;
        }
        if scheduled > 0 {
            info!(count = scheduled, "notification timers scheduled");
        }
        scheduled
    }

    /// Scenario pass: applies the contextual selection, then schedules what
    /// survives.
    pub async fn schedule_for_scenario(
        &self,
        scenario: ServiceScenario,
        alerts: &[Alert],
    ) -> usize {
        let selected = schedule_for_restaurant_context(alerts, scenario);
        self.schedule_notifications(&selected).await
    }

    /// Batching pass: related alerts collapse into one notification carrying
    /// the most urgent member's priority and a combined summary. Singleton
    /// batches schedule normally.
    pub async fn schedule_batched(&self, alerts: &[Alert]) -> usize {
        let eligible: Vec<Alert> = alerts
            .iter()
            .filter(|a| a.should_notify && !a.notification_sent)
            .cloned()
            .collect();
        let mut scheduled = 0;
        for batch in batch_related_alerts(&eligible) {
            if batch.len() == 1 {
                let delay = self.pick_delay_ms(batch[0].priority);
                self.spawn_timer(batch[0].clone(), delay).await;
            } else {
                let summary = summarize_batch(&batch, self.clock.now());
                let delay = self.pick_delay_ms(summary.priority);
                self.spawn_batch_timer(summary, batch.iter().map(|a| a.id).collect(), delay)
                    .await;
            }
            scheduled += 1;
        }
        scheduled
    }

    /// Cancels a pending timer. Returns whether one existed.
    pub async fn cancel_scheduled(&self, id: Uuid) -> bool {
        match self.pending.lock().await.remove(&id) {
            Some(handle) => {
                handle.abort();
                debug!(alert = %id, "pending notification cancelled");
                true
            }
            None => false,
        }
    }

    pub async fn cancel_all(&self) {
        let mut pending = self.pending.lock().await;
        for (_, handle) in pending.drain() {
            handle.abort();
        }
    }

    pub async fn stats(&self) -> SchedulingStats {
        let pending = self.pending.lock().await.len();
        SchedulingStats {
            total: pending,
            pending,
            // delays are not retained after the draw
            average_delay_ms: 0,
        }
    }

    async fn spawn_timer(&self, alert: Alert, delay_ms: u64) {
        let id = alert.id;
        self.spawn_with_ids(alert, vec![id], delay_ms).await;
    }

    async fn spawn_batch_timer(&self, summary: Alert, member_ids: Vec<Uuid>, delay_ms: u64) {
        self.spawn_with_ids(summary, member_ids, delay_ms).await;
    }

    /// One timer task: sleep, attempt delivery, then mark the member ids as
    /// sent on success. The task removes its own pending entry when done.
    async fn spawn_with_ids(&self, alert: Alert, member_ids: Vec<Uuid>, delay_ms: u64) {
        let key = alert.id;
        let gate = Arc::clone(&self.gate);
        let alerts = Arc::clone(&self.alerts);
        let pending = Arc::clone(&self.pending);

        // the map lock is held across spawn + insert; the task's own removal
        // needs the same lock, so its entry exists before it can run cleanup
        let mut slot = self.pending.lock().await;
        // pin the deadline at scheduling time, not at the task's first poll,
        // so paused-clock tests can advance past it deterministically
        let timer = tokio::time::sleep(StdDuration::from_millis(delay_ms));
        let task = tokio::spawn(async move {
            timer.await;
            match gate.deliver(&alert).await {
                Ok(DeliveryOutcome::Sent { handle }) => {
                    let mut list = alerts.write().await;
                    for a in list.iter_mut().filter(|a| member_ids.contains(&a.id)) {
                        a.notification_sent = true;
                        a.notification_handle = Some(handle.clone());
                    }
                }
                Ok(DeliveryOutcome::Suppressed(reason)) => {
                    debug!(alert = %key, %reason, "scheduled notification suppressed");
                }
                Err(e) => {
                    warn!(alert = %key, error = %e, strategy = ?e.recovery_strategy(), "scheduled delivery failed");
                }
            }
            pending.lock().await.remove(&key);
        });

        if let Some(previous) = slot.insert(key, task) {
            previous.abort();
            debug!(alert = %key, "replaced pending notification timer");
        }
    }
}

/// Collapses a batch into one notification: most urgent member's priority,
/// type, and id, member count in the title, member titles joined in the body.
/// Carrying the lead member's id keeps user actions on the batched
/// notification routable to an alert that exists in the collection.
fn summarize_batch(batch: &[Alert], now: chrono::DateTime<chrono::Utc>) -> Alert {
    let lead = batch
        .iter()
        .min_by_key(|a| a.priority.rank())
        .unwrap_or(&batch[0]);
    let titles: Vec<&str> = batch.iter().map(|a| a.title.as_str()).collect();
    let mut summary = Alert::new(
        lead.alert_type,
        lead.priority,
        format!("{} related alerts", batch.len()),
        titles.join(" | "),
        now,
    );
    summary.id = lead.id;
    summary.should_notify = true;
    summary
}
