// src/adapter/notifier/system_notifier.rs
//! OS notification seam.
//!
//! The engine never presents a system notification itself; it formats a
//! payload and hands it to a `SystemNotifier`. The host wires the real
//! platform implementation; `InMemoryNotifier` stands in for dev and tests,
//! recording everything it is asked to schedule.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::error::AlertingError;
use crate::domain::model::alert_type::AlertType;
use crate::domain::model::priority::AlertPriority;
use crate::domain::model::settings::PermissionState;

/// Structured data attached to every notification so a response event can be
/// routed back to the originating alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationData {
    pub alert_id: Uuid,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub sound: Option<String>,
    pub badge: bool,
    pub vibrate: bool,
    pub data: NotificationData,
}

/// When the OS should present the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireAt {
    Immediate,
    At(DateTime<Utc>),
}

/// Action chosen by the user on a presented notification; mapped back to a
/// lifecycle command by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationAction {
    Acknowledge,
    Dismiss,
    ViewDetails,
}

/// Response event delivered by the OS collaborator after user interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub data: NotificationData,
    pub action: NotificationAction,
}

#[async_trait]
pub trait SystemNotifier: Send + Sync + 'static {
    /// Prompts the user. Resolves to `Granted` or `Denied`.
    async fn request_permission(&self) -> Result<PermissionState, AlertingError>;

    /// Reads the current permission without prompting.
    async fn check_permission(&self) -> Result<PermissionState, AlertingError>;

    /// Schedules a local notification; returns an opaque handle.
    async fn schedule_local(
        &self,
        payload: NotificationPayload,
        when: FireAt,
    ) -> Result<String, AlertingError>;

    async fn cancel(&self, handle: &str) -> Result<(), AlertingError>;
    async fn cancel_all(&self) -> Result<(), AlertingError>;
}

/// Recording implementation for dev and tests. Permission behavior is
/// configurable; scheduled payloads are kept for inspection.
pub struct InMemoryNotifier {
    permission: RwLock<PermissionState>,
    /// What `request_permission` resolves to.
    grant_on_request: bool,
    scheduled: Mutex<HashMap<String, NotificationPayload>>,
    counter: AtomicU64,
    fail_next: Mutex<bool>,
}

impl InMemoryNotifier {
    /// Notifier that already has permission granted.
    pub fn granted() -> Self {
        Self::new(PermissionState::Granted, true)
    }

    pub fn new(initial: PermissionState, grant_on_request: bool) -> Self {
        Self {
            permission: RwLock::new(initial),
            grant_on_request,
            scheduled: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
            fail_next: Mutex::new(false),
        }
    }

    /// Makes the next `schedule_local` call fail, for delivery-error tests.
    pub async fn fail_next_schedule(&self) {
        *self.fail_next.lock().await = true;
    }

    pub async fn scheduled_count(&self) -> usize {
        self.scheduled.lock().await.len()
    }

    pub async fn scheduled_payloads(&self) -> Vec<NotificationPayload> {
        self.scheduled.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl SystemNotifier for InMemoryNotifier {
    async fn request_permission(&self) -> Result<PermissionState, AlertingError> {
        let state = if self.grant_on_request {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        };
        *self.permission.write().await = state;
        Ok(state)
    }

    async fn check_permission(&self) -> Result<PermissionState, AlertingError> {
        Ok(*self.permission.read().await)
    }

    async fn schedule_local(
        &self,
        payload: NotificationPayload,
        _when: FireAt,
    ) -> Result<String, AlertingError> {
        if std::mem::take(&mut *self.fail_next.lock().await) {
            return Err(AlertingError::delivery("simulated notifier outage"));
        }
        let handle = format!("local-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        self.scheduled.lock().await.insert(handle.clone(), payload);
        Ok(handle)
    }

    async fn cancel(&self, handle: &str) -> Result<(), AlertingError> {
        self.scheduled.lock().await.remove(handle);
        Ok(())
    }

    async fn cancel_all(&self) -> Result<(), AlertingError> {
        self.scheduled.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn action_ids_use_kebab_case() {
        let json = serde_json::to_string(&NotificationAction::ViewDetails).unwrap();
        assert_eq!(json, "\"view-details\"");
        let parsed: NotificationAction = serde_json::from_str("\"acknowledge\"").unwrap();
        assert_eq!(parsed, NotificationAction::Acknowledge);
    }

    #[tokio::test]
    async fn in_memory_notifier_records_and_cancels() {
        let n = InMemoryNotifier::granted();
        let payload = NotificationPayload {
            title: "⚠️ HIGH: Fryer offline".into(),
            body: "Station 2 fryer not heating".into(),
            sound: None,
            badge: true,
            vibrate: true,
            data: NotificationData {
                alert_id: Uuid::new_v4(),
                alert_type: AlertType::Equipment,
                priority: AlertPriority::High,
            },
        };
        let handle = n.schedule_local(payload, FireAt::Immediate).await.unwrap();
        assert_eq!(n.scheduled_count().await, 1);
        n.cancel(&handle).await.unwrap();
        assert_eq!(n.scheduled_count().await, 0);
    }
}
