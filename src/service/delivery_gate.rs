// src/service/delivery_gate.rs
//! Delivery eligibility gate.
//!
//! Every notification attempt funnels through `DeliveryGate::deliver`, which
//! evaluates the policy checks in a fixed order and either hands a formatted
//! payload to the OS notifier or reports why the attempt was suppressed.
//! Suppressions are ordinary outcomes, not errors; only a failing collaborator
//! produces an `Err`.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::adapter::notifier::system_notifier::{
    FireAt, NotificationData, NotificationPayload, SystemNotifier,
};
use crate::domain::error::AlertingError;
use crate::domain::model::alert::Alert;
use crate::domain::model::priority::AlertPriority;
use crate::domain::model::settings::{NotificationSettings, PermissionState};
use crate::repository::store::AlertArchive;
use crate::service::permission::PermissionManager;
use crate::util::clock::Clock;

const RATE_WINDOW_MINUTES: i64 = 60;
const BODY_LIMIT_CHARS: usize = 100;

/// Why a delivery attempt was suppressed, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    Disabled,
    PermissionDenied,
    PriorityFiltered,
    TypeFiltered,
    QuietHours,
    RateLimited,
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SuppressReason::Disabled => "notifications disabled",
            SuppressReason::PermissionDenied => "permission not granted",
            SuppressReason::PriorityFiltered => "priority filtered out",
            SuppressReason::TypeFiltered => "type filtered out",
            SuppressReason::QuietHours => "quiet hours",
            SuppressReason::RateLimited => "hourly rate limit",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Handed to the OS; carries the notifier's cancellation handle.
    Sent { handle: String },
    Suppressed(SuppressReason),
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent { .. })
    }
}

pub struct DeliveryGate {
    notifier: Arc<dyn SystemNotifier>,
    permission: Arc<PermissionManager>,
    archive: Arc<dyn AlertArchive>,
    clock: Arc<dyn Clock>,
    settings: RwLock<NotificationSettings>,
    /// Send instants inside the trailing rate window, oldest first.
    sent_log: Mutex<VecDeque<DateTime<Utc>>>,
}

impl DeliveryGate {
    pub fn new(
        notifier: Arc<dyn SystemNotifier>,
        permission: Arc<PermissionManager>,
        archive: Arc<dyn AlertArchive>,
        clock: Arc<dyn Clock>,
        settings: NotificationSettings,
    ) -> Self {
        Self {
            notifier,
            permission,
            archive,
            clock,
            settings: RwLock::new(settings),
            sent_log: Mutex::new(VecDeque::new()),
        }
    }

    pub async fn settings(&self) -> NotificationSettings {
        self.settings.read().await.clone()
    }

    /// Replaces the settings and persists them. A persistence failure keeps
    /// the in-memory update.
    pub async fn update_settings(&self, settings: NotificationSettings) -> Result<(), AlertingError> {
        *self.settings.write().await = settings.clone();
        self.archive.save_settings(&settings).await
    }

    /// Count of sends inside the trailing window.
    pub async fn sent_in_window(&self) -> usize {
        let now = self.clock.now();
        let mut log = self.sent_log.lock().await;
        prune(&mut log, now);
        log.len()
    }

    /// Runs the eligibility checks in order; on pass, formats the payload and
    /// schedules it with the OS notifier.
    pub async fn deliver(&self, alert: &Alert) -> Result<DeliveryOutcome, AlertingError> {
        let settings = self.settings.read().await.clone();

        if !settings.enabled {
            return self.suppress(alert, SuppressReason::Disabled);
        }
        if self.permission.current().await != PermissionState::Granted {
            return self.suppress(alert, SuppressReason::PermissionDenied);
        }
        if !settings.allows_priority(alert.priority) {
            return self.suppress(alert, SuppressReason::PriorityFiltered);
        }
        if !settings.allows_type(alert.alert_type) {
            return self.suppress(alert, SuppressReason::TypeFiltered);
        }

        let now = self.clock.now();
        let critical = alert.priority == AlertPriority::Critical;

        if !critical {
            if let Some(quiet) = &settings.quiet_hours {
                if quiet.contains(now.time()) {
                    return self.suppress(alert, SuppressReason::QuietHours);
                }
            }
        }

        // the slot is reserved before the notifier call; a concurrent
        // delivery parked at that await must not see a stale count
        let reserved = if critical {
            false
        } else {
            let mut log = self.sent_log.lock().await;
            prune(&mut log, now);
            if log.len() >= settings.max_per_hour as usize {
                drop(log);
                return self.suppress(alert, SuppressReason::RateLimited);
            }
            log.push_back(now);
            true
        };

        let payload = format_payload(alert, &settings);
        let handle = match self.notifier.schedule_local(payload, FireAt::Immediate).await {
            Ok(handle) => handle,
            Err(e) => {
                if reserved {
                    // give the slot back; the attempt never reached the OS
                    let mut log = self.sent_log.lock().await;
                    if let Some(pos) = log.iter().rposition(|t| *t == now) {
                        log.remove(pos);
                    }
                }
                return Err(e);
            }
        };

        if critical {
            let mut log = self.sent_log.lock().await;
            prune(&mut log, now);
            log.push_back(now);
        }

        info!(alert = %alert.id, priority = %alert.priority, handle = %handle, "notification delivered");
        metrics::increment_counter!("notifications_sent");
        Ok(DeliveryOutcome::Sent { handle })
    }

    fn suppress(&self, alert: &Alert, reason: SuppressReason) -> Result<DeliveryOutcome, AlertingError> {
        debug!(alert = %alert.id, %reason, "notification suppressed");
        metrics::increment_counter!("notifications_suppressed");
        Ok(DeliveryOutcome::Suppressed(reason))
    }
}

fn prune(log: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
    let cutoff = now - Duration::minutes(RATE_WINDOW_MINUTES);
    while log.front().map(|t| *t < cutoff).unwrap_or(false) {
        log.pop_front();
    }
}

/// Formats the OS payload: `"{emoji} {PRIORITY}: {title}"`, body truncated at
/// a character boundary, sound chosen from the settings.
pub fn format_payload(alert: &Alert, settings: &NotificationSettings) -> NotificationPayload {
    let title = format!("{} {}: {}", alert.priority.emoji(), alert.priority, alert.title);
    let body = if alert.message.chars().count() > BODY_LIMIT_CHARS {
        let truncated: String = alert.message.chars().take(BODY_LIMIT_CHARS).collect();
        format!("{truncated}...")
    } else {
        alert.message.clone()
    };
    let sound = if settings.custom_sounds {
        Some(alert.priority.sound_id().to_string())
    } else if settings.sound_enabled {
        Some("default".to_string())
    } else {
        None
    };
    NotificationPayload {
        title,
        body,
        sound,
        badge: settings.badge_enabled,
        vibrate: settings.vibration_enabled,
        data: NotificationData {
            alert_id: alert.id,
            alert_type: alert.alert_type,
            priority: alert.priority,
        },
    }
}
