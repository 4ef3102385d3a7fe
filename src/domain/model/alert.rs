// src/domain/model/alert.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::model::alert_type::AlertType;
use crate::domain::model::priority::AlertPriority;
use crate::domain::model::status::AlertStatus;

/// A discrete operational event requiring attention.
///
/// Alerts are created by the synthesis engine (or a caller supplying a
/// template), live in the lifecycle manager's collection newest-first, and
/// only ever leave active relevance through status transitions — never
/// garbage collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique id (UUID v4), assigned at creation, immutable.
    pub id: Uuid,

    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub status: AlertStatus,

    pub title: String,
    pub message: String,
    /// Long-form description shown on the detail screen.
    pub details: Option<String>,
    /// Advisory, UI-facing explanation of contributing factors.
    #[serde(default)]
    pub related_factors: Vec<String>,

    pub created_at: DateTime<Utc>,
    /// Each of these is set at most once and is always >= `created_at`.
    pub read_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub dismissed_at: Option<DateTime<Utc>>,

    /// Computed at creation; adaptive scheduling may revise it.
    pub should_notify: bool,
    /// Set true only after a successful hand-off to the OS collaborator.
    /// Invariant: implies `should_notify` was true at send time.
    pub notification_sent: bool,
    /// Handle returned by the OS collaborator, used for cancellation.
    pub notification_handle: Option<String>,

    pub action_required: bool,
    /// Estimated time to resolve, in minutes.
    pub estimated_resolution_min: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,

    pub assignee: Option<String>,
    #[serde(default)]
    pub assignment_history: Vec<AssignmentRecord>,
    #[serde(default)]
    pub remediation_steps: Vec<RemediationStep>,
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub assignee: String,
    pub assigned_by: String,
    pub assigned_at: DateTime<Utc>,
}

/// One step of a remediation checklist attached to an alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationStep {
    pub description: String,
    pub completed: bool,
    pub assignee: Option<String>,
    pub notes: Option<String>,
}

impl Alert {
    /// Creates a minimal `Active` alert. `created_at` comes from the caller's
    /// clock so time-dependent behavior stays testable.
    pub fn new(
        alert_type: AlertType,
        priority: AlertPriority,
        title: impl Into<String>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Alert {
            id: Uuid::new_v4(),
            alert_type,
            priority,
            status: AlertStatus::Active,
            title: title.into(),
            message: message.into(),
            details: None,
            related_factors: Vec::new(),
            created_at,
            read_at: None,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            dismissed_at: None,
            should_notify: priority != AlertPriority::Low,
            notification_sent: false,
            notification_handle: None,
            action_required: false,
            estimated_resolution_min: None,
            tags: Vec::new(),
            assignee: None,
            assignment_history: Vec::new(),
            remediation_steps: Vec::new(),
            resolution_notes: None,
        }
    }

    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }

    /// Resolution latency, when the alert has been resolved.
    pub fn resolution_latency(&self) -> Option<chrono::Duration> {
        self.resolved_at.map(|t| t - self.created_at)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
