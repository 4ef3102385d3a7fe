// src/service/lifecycle.rs
//! Alert lifecycle manager.
//!
//! Owns the authoritative in-memory alert collection (newest first), applies
//! user-initiated transitions through a pure reducer, answers filtered
//! queries and statistics, and keeps a short-lived cache synchronized with
//! the persistence collaborator. Consumers subscribe to collection changes
//! via a broadcast channel instead of polling.
//!
//! Ownership split with the scheduler: both sides share the collection, but
//! only this manager writes status fields; the scheduler only flips the
//! notification bookkeeping (`notification_sent`, handle).

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::error::AlertingError;
use crate::domain::model::alert::{Alert, AssignmentRecord};
use crate::domain::model::alert_type::AlertType;
use crate::domain::model::context::RestaurantContext;
use crate::domain::model::priority::AlertPriority;
use crate::domain::model::status::AlertStatus;
use crate::repository::store::AlertArchive;
use crate::service::synthesis::{AlertSynthesizer, GenerationOptions};
use crate::util::clock::Clock;

/// The alert collection shared between the lifecycle manager and the
/// notification scheduler.
pub type SharedAlerts = Arc<RwLock<Vec<Alert>>>;

pub const DEFAULT_CACHE_TTL_MINUTES: i64 = 5;
const DEFAULT_GENERATION_COUNT: usize = 3;

/// User-initiated transition, applied through the pure reducer below.
#[derive(Debug, Clone)]
pub enum LifecycleCommand {
    Acknowledge { user_id: String },
    Resolve,
    Dismiss,
    MarkRead,
}

/// Collection-change event published to subscribers.
#[derive(Debug, Clone)]
pub enum AlertEvent {
    Created { ids: Vec<Uuid> },
    Transitioned { id: Uuid, status: AlertStatus },
    Assigned { id: Uuid, assignee: String },
    Cleared,
}

/// Pure state transition: `(alert, command) -> new alert`. Never partially
/// mutates — on error the input is untouched; on success a full replacement
/// value is returned.
pub fn apply_transition(
    alert: &Alert,
    command: &LifecycleCommand,
    now: DateTime<Utc>,
) -> Result<Alert, AlertingError> {
    let mut next = alert.clone();
    match command {
        LifecycleCommand::Acknowledge { user_id } => {
            match alert.status {
                AlertStatus::Acknowledged => {
                    return Err(AlertingError::invalid_transition(alert.id, "already acknowledged"))
                }
                AlertStatus::Resolved | AlertStatus::Dismissed => {
                    return Err(AlertingError::invalid_transition(
                        alert.id,
                        format!("cannot acknowledge from {}", alert.status),
                    ))
                }
                AlertStatus::Active => {}
            }
            next.status = AlertStatus::Acknowledged;
            next.acknowledged_at = Some(now);
            next.acknowledged_by = Some(user_id.clone());
            next.read_at = next.read_at.or(Some(now));
        }
        LifecycleCommand::Resolve => {
            if alert.status.is_terminal() {
                return Err(AlertingError::invalid_transition(
                    alert.id,
                    format!("cannot resolve from {}", alert.status),
                ));
            }
            next.status = AlertStatus::Resolved;
            next.resolved_at = Some(now);
        }
        LifecycleCommand::Dismiss => {
            if alert.priority == AlertPriority::Critical {
                return Err(AlertingError::invalid_transition(
                    alert.id,
                    "critical alerts cannot be dismissed",
                ));
            }
            if alert.status != AlertStatus::Active {
                return Err(AlertingError::invalid_transition(
                    alert.id,
                    format!("cannot dismiss from {}", alert.status),
                ));
            }
            next.status = AlertStatus::Dismissed;
            next.dismissed_at = Some(now);
        }
        LifecycleCommand::MarkRead => {
            // Idempotent and orthogonal to status.
            next.read_at = next.read_at.or(Some(now));
        }
    }
    Ok(next)
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Filter predicate set applied in order; `None` means "don't filter".
#[derive(Debug, Clone)]
pub struct AlertFilters {
    pub priorities: Option<Vec<AlertPriority>>,
    pub types: Option<Vec<AlertType>>,
    pub statuses: Option<Vec<AlertStatus>>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive substring over title, message, and details.
    pub search: Option<String>,
    /// Keep alerts sharing at least one of these tags.
    pub tags: Option<Vec<String>>,
    pub include_read: bool,
    pub include_resolved: bool,
}

impl Default for AlertFilters {
    fn default() -> Self {
        Self {
            priorities: None,
            types: None,
            statuses: None,
            from: None,
            to: None,
            search: None,
            tags: None,
            include_read: true,
            include_resolved: true,
        }
    }
}

/// Pure filter + sort. The result is ordered by priority descending, then
/// timestamp descending; remaining ties keep insertion order (stable sort).
pub fn filter_alerts(alerts: &[Alert], filters: &AlertFilters) -> Vec<Alert> {
    let needle = filters.search.as_ref().map(|s| s.to_lowercase());
    let mut out: Vec<Alert> = alerts
        .iter()
        .filter(|a| {
            if let Some(ps) = &filters.priorities {
                if !ps.contains(&a.priority) {
                    return false;
                }
            }
            if let Some(ts) = &filters.types {
                if !ts.contains(&a.alert_type) {
                    return false;
                }
            }
            if let Some(ss) = &filters.statuses {
                if !ss.contains(&a.status) {
                    return false;
                }
            }
            if let Some(from) = filters.from {
                if a.created_at < from {
                    return false;
                }
            }
            if let Some(to) = filters.to {
                if a.created_at > to {
                    return false;
                }
            }
            if let Some(needle) = &needle {
                let haystack_hit = a.title.to_lowercase().contains(needle)
                    || a.message.to_lowercase().contains(needle)
                    || a
                        .details
                        .as_ref()
                        .map(|d| d.to_lowercase().contains(needle))
                        .unwrap_or(false);
                if !haystack_hit {
                    return false;
                }
            }
            if let Some(tags) = &filters.tags {
                if !tags.iter().any(|t| a.has_tag(t)) {
                    return false;
                }
            }
            if !filters.include_read && !a.is_unread() {
                return false;
            }
            if !filters.include_resolved && a.status == AlertStatus::Resolved {
                return false;
            }
            true
        })
        .cloned()
        .collect();

    out.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then(b.created_at.cmp(&a.created_at))
    });
    out
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct AlertStatistics {
    pub total: usize,
    pub by_priority: HashMap<AlertPriority, usize>,
    pub by_type: HashMap<AlertType, usize>,
    pub by_status: HashMap<AlertStatus, usize>,
    pub unread: usize,
    pub critical_active: usize,
    /// Mean latency from creation to resolution over resolved alerts in the
    /// window, in minutes.
    pub mean_resolution_minutes: Option<f64>,
}

/// Aggregates over alerts created inside the optional window.
pub fn compute_statistics(
    alerts: &[Alert],
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> AlertStatistics {
    let in_window = |a: &&Alert| match window {
        Some((from, to)) => a.created_at >= from && a.created_at <= to,
        None => true,
    };

    let mut stats = AlertStatistics::default();
    let mut latencies = Vec::new();
    for a in alerts.iter().filter(in_window) {
        stats.total += 1;
        *stats.by_priority.entry(a.priority).or_insert(0) += 1;
        *stats.by_type.entry(a.alert_type).or_insert(0) += 1;
        *stats.by_status.entry(a.status).or_insert(0) += 1;
        if a.is_unread() {
            stats.unread += 1;
        }
        if a.priority == AlertPriority::Critical && a.status == AlertStatus::Active {
            stats.critical_active += 1;
        }
        if let Some(latency) = a.resolution_latency() {
            latencies.push(latency.num_seconds() as f64 / 60.0);
        }
    }
    if !latencies.is_empty() {
        stats.mean_resolution_minutes = Some(latencies.iter().sum::<f64>() / latencies.len() as f64);
    }
    stats
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

pub struct AlertLifecycleManager {
    alerts: SharedAlerts,
    archive: Arc<dyn AlertArchive>,
    synthesizer: AlertSynthesizer,
    clock: Arc<dyn Clock>,
    cache_ttl: Duration,
    cache_loaded_at: Mutex<Option<DateTime<Utc>>>,
    events: broadcast::Sender<AlertEvent>,
}

impl AlertLifecycleManager {
    pub fn new(
        archive: Arc<dyn AlertArchive>,
        synthesizer: AlertSynthesizer,
        clock: Arc<dyn Clock>,
        cache_ttl: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            alerts: Arc::new(RwLock::new(Vec::new())),
            archive,
            synthesizer,
            clock,
            cache_ttl,
            cache_loaded_at: Mutex::new(None),
            events,
        }
    }

    /// Handle to the shared collection for scheduler wiring.
    pub fn shared_alerts(&self) -> SharedAlerts {
        Arc::clone(&self.alerts)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.events.subscribe()
    }

    /// Reloads from the archive when the cache TTL has lapsed. A storage
    /// failure keeps serving the cached working set.
    async fn ensure_fresh(&self) {
        let now = self.clock.now();
        let mut loaded_at = self.cache_loaded_at.lock().await;
        let stale = match *loaded_at {
            None => true,
            Some(at) => now - at > self.cache_ttl,
        };
        if !stale {
            return;
        }
        match self.archive.load_alerts().await {
            Ok(list) => {
                *self.alerts.write().await = list;
                *loaded_at = Some(now);
                metrics::increment_counter!("alert_cache_reloads");
            }
            Err(e) => {
                warn!(error = %e, strategy = ?e.recovery_strategy(), "alert reload failed; serving cached data");
            }
        }
    }

    /// Persists the current collection. Failures degrade to cache-only
    /// operation rather than failing the calling transition.
    async fn persist(&self) {
        let snapshot = self.alerts.read().await.clone();
        if let Err(e) = self.archive.save_alerts(&snapshot).await {
            warn!(error = %e, "alert persistence failed; continuing with in-memory state");
        }
    }

    fn publish(&self, event: AlertEvent) {
        let _ = self.events.send(event);
    }

    /// Synthesizes new alerts for the given context: curated scenario
    /// templates when the context is in demo mode, otherwise context-weighted
    /// random generation. New alerts are stamped with derived tags, inserted
    /// newest-first, and persisted. Returns the created alerts.
    pub async fn generate_alerts(
        &self,
        ctx: &RestaurantContext,
        options: Option<GenerationOptions>,
    ) -> Result<Vec<Alert>, AlertingError> {
        self.ensure_fresh().await;
        let options = options.unwrap_or_default();

        let new_alerts = if ctx.demo_mode {
            let scenario = options
                .scenario
                .unwrap_or(crate::domain::model::context::ServiceScenario::BusyLunchRush);
            self.synthesizer.generate_for_scenario(scenario, ctx)
        } else {
            let count = options.count.unwrap_or(DEFAULT_GENERATION_COUNT);
            self.synthesizer
                .generate_weighted(ctx, count, options.type_weights.as_ref())
        };

        if new_alerts.is_empty() {
            return Ok(new_alerts);
        }

        {
            let mut alerts = self.alerts.write().await;
            for a in new_alerts.iter().rev() {
                alerts.insert(0, a.clone());
            }
        }
        self.persist().await;
        info!(count = new_alerts.len(), "alerts generated");
        metrics::increment_counter!("alerts_created");
        self.publish(AlertEvent::Created {
            ids: new_alerts.iter().map(|a| a.id).collect(),
        });
        Ok(new_alerts)
    }

    /// Inserts an externally supplied alert (caller-provided template path).
    pub async fn insert_alert(&self, alert: Alert) -> Result<Alert, AlertingError> {
        self.ensure_fresh().await;
        self.alerts.write().await.insert(0, alert.clone());
        self.persist().await;
        self.publish(AlertEvent::Created { ids: vec![alert.id] });
        Ok(alert)
    }

    async fn transition(
        &self,
        id: Uuid,
        command: LifecycleCommand,
    ) -> Result<Alert, AlertingError> {
        self.ensure_fresh().await;
        let now = self.clock.now();
        let updated = {
            let mut alerts = self.alerts.write().await;
            let slot = alerts
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or(AlertingError::NotFound { id })?;
            let next = apply_transition(slot, &command, now)?;
            *slot = next.clone();
            next
        };
        self.persist().await;
        debug!(alert = %id, status = %updated.status, "alert transitioned");
        self.publish(AlertEvent::Transitioned { id, status: updated.status });
        Ok(updated)
    }

    pub async fn acknowledge_alert(
        &self,
        id: Uuid,
        user_id: impl Into<String>,
    ) -> Result<Alert, AlertingError> {
        self.transition(id, LifecycleCommand::Acknowledge { user_id: user_id.into() })
            .await
    }

    pub async fn resolve_alert(&self, id: Uuid) -> Result<Alert, AlertingError> {
        self.transition(id, LifecycleCommand::Resolve).await
    }

    pub async fn dismiss_alert(&self, id: Uuid) -> Result<Alert, AlertingError> {
        self.transition(id, LifecycleCommand::Dismiss).await
    }

    pub async fn mark_as_read(&self, id: Uuid) -> Result<Alert, AlertingError> {
        self.transition(id, LifecycleCommand::MarkRead).await
    }

    /// Assigns the alert, recording the handover in its history.
    pub async fn assign_alert(
        &self,
        id: Uuid,
        assignee: impl Into<String>,
        assigned_by: impl Into<String>,
    ) -> Result<Alert, AlertingError> {
        self.ensure_fresh().await;
        let assignee = assignee.into();
        let record = AssignmentRecord {
            assignee: assignee.clone(),
            assigned_by: assigned_by.into(),
            assigned_at: self.clock.now(),
        };
        let updated = {
            let mut alerts = self.alerts.write().await;
            let slot = alerts
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or(AlertingError::NotFound { id })?;
            slot.assignee = Some(assignee.clone());
            slot.assignment_history.push(record);
            slot.clone()
        };
        self.persist().await;
        self.publish(AlertEvent::Assigned { id, assignee });
        Ok(updated)
    }

    /// The only physical deletion path: wipes the collection and the store.
    pub async fn clear_all(&self) -> Result<(), AlertingError> {
        self.alerts.write().await.clear();
        self.archive.clear_all().await?;
        self.publish(AlertEvent::Cleared);
        Ok(())
    }

    pub async fn all_alerts(&self) -> Vec<Alert> {
        self.ensure_fresh().await;
        self.alerts.read().await.clone()
    }

    pub async fn filtered(&self, filters: &AlertFilters) -> Vec<Alert> {
        self.ensure_fresh().await;
        filter_alerts(&self.alerts.read().await, filters)
    }

    pub async fn statistics(
        &self,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> AlertStatistics {
        self.ensure_fresh().await;
        compute_statistics(&self.alerts.read().await, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::clock::FixedClock;

    fn alert(priority: AlertPriority, alert_type: AlertType, now: DateTime<Utc>) -> Alert {
        Alert::new(alert_type, priority, "t", "m", now)
    }

    #[test]
    fn acknowledge_then_resolve() {
        let now = Utc::now();
        let a = alert(AlertPriority::High, AlertType::Equipment, now);
        let acked = apply_transition(
            &a,
            &LifecycleCommand::Acknowledge { user_id: "maria".into() },
            now,
        )
        .unwrap();
        assert_eq!(acked.status, AlertStatus::Acknowledged);
        assert_eq!(acked.acknowledged_by.as_deref(), Some("maria"));
        assert!(acked.read_at.is_some());

        let resolved = apply_transition(&acked, &LifecycleCommand::Resolve, now).unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
    }

    #[test]
    fn double_acknowledge_rejected() {
        let now = Utc::now();
        let a = alert(AlertPriority::High, AlertType::Equipment, now);
        let acked = apply_transition(
            &a,
            &LifecycleCommand::Acknowledge { user_id: "maria".into() },
            now,
        )
        .unwrap();
        let err = apply_transition(
            &acked,
            &LifecycleCommand::Acknowledge { user_id: "jo".into() },
            now,
        )
        .unwrap_err();
        assert!(matches!(err, AlertingError::InvalidTransition { .. }));
    }

    #[test]
    fn critical_dismiss_rejected() {
        let now = Utc::now();
        let a = alert(AlertPriority::Critical, AlertType::Safety, now);
        let err = apply_transition(&a, &LifecycleCommand::Dismiss, now).unwrap_err();
        assert!(matches!(err, AlertingError::InvalidTransition { .. }));
    }

    #[test]
    fn terminal_states_stay_terminal() {
        let now = Utc::now();
        let a = alert(AlertPriority::Medium, AlertType::Order, now);
        let dismissed = apply_transition(&a, &LifecycleCommand::Dismiss, now).unwrap();
        assert!(apply_transition(&dismissed, &LifecycleCommand::Resolve, now).is_err());
        assert!(apply_transition(
            &dismissed,
            &LifecycleCommand::Acknowledge { user_id: "x".into() },
            now
        )
        .is_err());
    }

    #[test]
    fn mark_read_is_idempotent() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(10);
        let a = alert(AlertPriority::Low, AlertType::Inventory, t0);
        let read = apply_transition(&a, &LifecycleCommand::MarkRead, t0).unwrap();
        let again = apply_transition(&read, &LifecycleCommand::MarkRead, t1).unwrap();
        assert_eq!(again.read_at, Some(t0));
    }

    #[test]
    fn filters_apply_and_sort_by_priority_then_time() {
        let t0 = Utc::now();
        let mut old_critical = alert(AlertPriority::Critical, AlertType::Safety, t0);
        old_critical.title = "Hood suppression fault".into();
        let recent_high = alert(AlertPriority::High, AlertType::Order, t0 + Duration::minutes(5));
        let older_high = alert(AlertPriority::High, AlertType::Order, t0);
        let low = alert(AlertPriority::Low, AlertType::Inventory, t0 + Duration::minutes(9));

        let input = vec![low.clone(), older_high.clone(), recent_high.clone(), old_critical.clone()];
        let out = filter_alerts(&input, &AlertFilters::default());
        assert_eq!(out[0].id, old_critical.id);
        assert_eq!(out[1].id, recent_high.id);
        assert_eq!(out[2].id, older_high.id);
        assert_eq!(out[3].id, low.id);

        let search = AlertFilters {
            search: Some("HOOD".into()),
            ..Default::default()
        };
        let out = filter_alerts(&input, &search);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, old_critical.id);

        let by_priority = AlertFilters {
            priorities: Some(vec![AlertPriority::High]),
            ..Default::default()
        };
        assert_eq!(filter_alerts(&input, &by_priority).len(), 2);
    }

    #[test]
    fn statistics_count_and_average() {
        let t0 = Utc::now();
        let mut resolved = alert(AlertPriority::High, AlertType::Order, t0);
        resolved.status = AlertStatus::Resolved;
        resolved.resolved_at = Some(t0 + Duration::minutes(30));
        let critical = alert(AlertPriority::Critical, AlertType::Safety, t0);

        let stats = compute_statistics(&[resolved, critical], None);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.critical_active, 1);
        assert_eq!(stats.unread, 2);
        assert_eq!(stats.mean_resolution_minutes, Some(30.0));
    }

    #[tokio::test]
    async fn manager_round_trip_with_archive() {
        use crate::repository::store::InMemoryArchive;
        use crate::util::random::{shared, SequenceRandom};

        let clock = Arc::new(FixedClock::new(Utc::now()));
        let archive = Arc::new(InMemoryArchive::new(clock.clone()));
        let synth = AlertSynthesizer::new(
            clock.clone(),
            shared(Box::new(SequenceRandom::new(vec![0.0]))),
        );
        let mgr = AlertLifecycleManager::new(
            archive.clone(),
            synth,
            clock.clone(),
            Duration::minutes(DEFAULT_CACHE_TTL_MINUTES),
        );

        let a = Alert::new(AlertType::Equipment, AlertPriority::High, "t", "m", clock.now());
        let id = a.id;
        mgr.insert_alert(a).await.unwrap();

        let updated = mgr.acknowledge_alert(id, "maria").await.unwrap();
        assert_eq!(updated.status, AlertStatus::Acknowledged);

        // unknown id
        let err = mgr.resolve_alert(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AlertingError::NotFound { .. }));

        // persisted state survives a cache expiry + reload
        clock.advance(Duration::minutes(6));
        let all = mgr.all_alerts().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, AlertStatus::Acknowledged);
    }
}
