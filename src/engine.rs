// src/engine.rs
//! Top-level wiring.
//!
//! `AlertingEngine` assembles the collaborators explicitly: the host passes
//! the OS notifier (and optionally a clock, random source, and archive), and
//! everything downstream receives its dependencies through constructors.
//! There are no globals; two engines in one process stay fully independent.

use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapter::notifier::system_notifier::{
    NotificationAction, NotificationResponse, SystemNotifier,
};
use crate::config::EngineConfig;
use crate::domain::error::AlertingError;
use crate::domain::model::alert::Alert;
use crate::domain::model::context::RestaurantContext;
use crate::domain::model::settings::PermissionState;
use crate::repository::store::{AlertArchive, InMemoryArchive, JsonFileArchive};
use crate::scheduler::notification_scheduler::NotificationScheduler;
use crate::scheduler::simulation::{AlertSimulator, SimulationHandle};
use crate::service::delivery_gate::DeliveryGate;
use crate::service::lifecycle::AlertLifecycleManager;
use crate::service::permission::PermissionManager;
use crate::service::synthesis::{AlertSynthesizer, GenerationOptions};
use crate::util::clock::{Clock, SystemClock};
use crate::util::random::{shared, RandomSource, SharedRandom, ThreadRandom};

pub struct AlertingEngineBuilder {
    notifier: Arc<dyn SystemNotifier>,
    config: EngineConfig,
    clock: Option<Arc<dyn Clock>>,
    rng: Option<SharedRandom>,
    archive: Option<Arc<dyn AlertArchive>>,
}

impl AlertingEngineBuilder {
    pub fn new(notifier: Arc<dyn SystemNotifier>) -> Self {
        Self {
            notifier,
            config: EngineConfig::default(),
            clock: None,
            rng: None,
            archive: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn random(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = Some(shared(rng));
        self
    }

    pub fn archive(mut self, archive: Arc<dyn AlertArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Wires the engine: builds the archive from config when none was given,
    /// loads persisted settings, and restores the last permission state.
    pub async fn build(self) -> Result<AlertingEngine, AlertingError> {
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let rng = self.rng.unwrap_or_else(|| shared(Box::new(ThreadRandom)));
        let expiry = Duration::hours(self.config.archive_expiry_hours);

        let archive: Arc<dyn AlertArchive> = match self.archive {
            Some(a) => a,
            None => match &self.config.archive_path {
                Some(path) => Arc::new(JsonFileArchive::with_expiry(path.clone(), clock.clone(), expiry)),
                None => Arc::new(InMemoryArchive::with_expiry(clock.clone(), expiry)),
            },
        };

        let permission = Arc::new(PermissionManager::new(self.notifier.clone(), archive.clone()));
        permission.restore_persisted().await;

        let settings = archive.load_settings().await?;
        let gate = Arc::new(DeliveryGate::new(
            self.notifier,
            permission.clone(),
            archive.clone(),
            clock.clone(),
            settings,
        ));

        let synthesizer = AlertSynthesizer::new(clock.clone(), Arc::clone(&rng));
        let lifecycle = Arc::new(AlertLifecycleManager::new(
            archive.clone(),
            synthesizer,
            clock.clone(),
            Duration::minutes(self.config.cache_ttl_minutes),
        ));
        let scheduler = Arc::new(NotificationScheduler::new(
            gate.clone(),
            lifecycle.shared_alerts(),
            clock.clone(),
            Arc::clone(&rng),
        ));
        let simulator = AlertSimulator::new(
            lifecycle.clone(),
            scheduler.clone(),
            clock.clone(),
            Arc::clone(&rng),
        )
        .with_tick(std::time::Duration::from_secs(self.config.simulation_tick_seconds));

        info!("alerting engine wired");
        Ok(AlertingEngine {
            archive,
            permission,
            gate,
            lifecycle,
            scheduler,
            simulator,
            clock,
        })
    }
}

pub struct AlertingEngine {
    archive: Arc<dyn AlertArchive>,
    permission: Arc<PermissionManager>,
    gate: Arc<DeliveryGate>,
    lifecycle: Arc<AlertLifecycleManager>,
    scheduler: Arc<NotificationScheduler>,
    simulator: AlertSimulator,
    clock: Arc<dyn Clock>,
}

impl AlertingEngine {
    pub fn builder(notifier: Arc<dyn SystemNotifier>) -> AlertingEngineBuilder {
        AlertingEngineBuilder::new(notifier)
    }

    pub fn lifecycle(&self) -> &Arc<AlertLifecycleManager> {
        &self.lifecycle
    }

    pub fn scheduler(&self) -> &Arc<NotificationScheduler> {
        &self.scheduler
    }

    pub fn gate(&self) -> &Arc<DeliveryGate> {
        &self.gate
    }

    pub fn permission(&self) -> &Arc<PermissionManager> {
        &self.permission
    }

    pub fn archive(&self) -> &Arc<dyn AlertArchive> {
        &self.archive
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Session-start hook: re-reads OS permission, prompting on first use.
    pub async fn begin_session(&self) -> Result<PermissionState, AlertingError> {
        let state = self.permission.check().await?;
        if state == PermissionState::Undetermined {
            return self.permission.request().await;
        }
        Ok(state)
    }

    /// Generate alerts for the context and put the eligible ones on timers.
    pub async fn generate_and_schedule(
        &self,
        ctx: &RestaurantContext,
        options: Option<GenerationOptions>,
    ) -> Result<Vec<Alert>, AlertingError> {
        let created = self.lifecycle.generate_alerts(ctx, options).await?;
        self.scheduler.schedule_notifications(&created).await;
        Ok(created)
    }

    /// Maps a user's notification interaction back onto the alert lifecycle.
    /// An invalid transition (for instance dismissing a critical alert from
    /// the notification shade) is logged and swallowed; the host decides what
    /// to show.
    pub async fn handle_notification_response(&self, response: &NotificationResponse) {
        let id = response.data.alert_id;
        let result = match response.action {
            NotificationAction::Acknowledge => {
                self.lifecycle.acknowledge_alert(id, "notification-action").await
            }
            NotificationAction::Dismiss => self.lifecycle.dismiss_alert(id).await,
            NotificationAction::ViewDetails => self.lifecycle.mark_as_read(id).await,
        };
        if let Err(e) = result {
            warn!(alert = %id, action = ?response.action, error = %e, "notification response not applied");
        }
    }

    pub fn start_simulation(&self, ctx: RestaurantContext) -> SimulationHandle {
        self.simulator.start(ctx)
    }

    /// Cancels every pending notification timer. Already-delivered
    /// notifications stay in the OS shade.
    pub async fn shutdown(&self) {
        self.scheduler.cancel_all().await;
        info!("alerting engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::notifier::system_notifier::InMemoryNotifier;
    use crate::domain::model::context::RestaurantKind;
    use crate::domain::model::priority::AlertPriority;
    use crate::domain::model::status::AlertStatus;
    use crate::util::clock::FixedClock;
    use crate::util::random::SequenceRandom;
    use chrono::{TimeZone, Utc};

    fn demo_ctx() -> RestaurantContext {
        RestaurantContext {
            restaurant_name: "La Brasa".into(),
            kind: RestaurantKind::CasualDining,
            capacity: 60,
            max_capacity: 80,
            active_orders: 20,
            staff_on_duty: 6,
            is_open: true,
            average_alerts_per_hour: 4.0,
            peak_hours: vec![12, 19],
            is_weekend: false,
            demo_mode: true,
            simulation_speed: 1.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_generate_schedule_acknowledge() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 3, 12, 30, 0).unwrap()));
        let notifier = Arc::new(InMemoryNotifier::granted());
        let engine = AlertingEngine::builder(notifier.clone())
            .clock(clock.clone())
            .random(Box::new(SequenceRandom::new(vec![0.0])))
            .build()
            .await
            .unwrap();

        assert_eq!(engine.begin_session().await.unwrap(), PermissionState::Granted);

        let created = engine.generate_and_schedule(&demo_ctx(), None).await.unwrap();
        assert!(!created.is_empty());

        // drain the longest possible timer
        tokio::time::advance(std::time::Duration::from_secs(16 * 60)).await;
        tokio::task::yield_now().await;
        assert!(notifier.scheduled_count().await > 0);

        let target = created[0].id;
        let acked = engine.lifecycle().acknowledge_alert(target, "maria").await.unwrap();
        assert_eq!(acked.status, AlertStatus::Acknowledged);
    }

    #[tokio::test(start_paused = true)]
    async fn notification_responses_drive_the_lifecycle() {
        use crate::adapter::notifier::system_notifier::{NotificationData, NotificationResponse};
        use crate::domain::model::alert_type::AlertType;

        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 3, 12, 30, 0).unwrap()));
        let notifier = Arc::new(InMemoryNotifier::granted());
        let engine = AlertingEngine::builder(notifier)
            .clock(clock.clone())
            .random(Box::new(SequenceRandom::new(vec![0.0])))
            .build()
            .await
            .unwrap();

        let a = Alert::new(AlertType::Order, AlertPriority::High, "t", "m", clock.now());
        let id = a.id;
        engine.lifecycle().insert_alert(a).await.unwrap();

        engine
            .handle_notification_response(&NotificationResponse {
                data: NotificationData {
                    alert_id: id,
                    alert_type: AlertType::Order,
                    priority: AlertPriority::High,
                },
                action: NotificationAction::Acknowledge,
            })
            .await;

        let all = engine.lifecycle().all_alerts().await;
        assert_eq!(all[0].status, AlertStatus::Acknowledged);
        assert_eq!(all[0].acknowledged_by.as_deref(), Some("notification-action"));
    }
}
