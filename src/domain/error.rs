// src/domain/error.rs
//! Error taxonomy for the alerting engine.
//!
//! Lifecycle-transition errors (`NotFound`, `InvalidTransition`) surface to
//! the caller synchronously and never partially mutate state. Scheduling and
//! delivery *eligibility* failures (quiet hours, rate limit, priority/type
//! filters) are not errors at all — they are suppression outcomes on the
//! delivery gate. The errors here cover the genuinely failing paths, each
//! classified with an operational impact and a recovery strategy. Nothing in
//! this crate should ever take the host process down; the worst case is
//! "notifications are disabled for this session".

use thiserror::Error;
use uuid::Uuid;

/// Operational impact, used to pick a recovery strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorImpact {
    /// Retry or fallback may succeed.
    Recoverable,
    /// Retrying will not help; degrade or discard.
    NonRecoverable,
}

/// What the host should do about a failure, mirroring the permission and
/// storage education flow of the surrounding app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    ShowCachedData,
    PromptRetry,
    ReinitializeStorage,
    DegradeWithoutNotifications,
    RequireRestart,
}

#[derive(Error, Debug)]
pub enum AlertingError {
    #[error("alert {id} not found")]
    NotFound { id: Uuid },

    #[error("invalid transition for alert {id}: {reason}")]
    InvalidTransition { id: Uuid, reason: String },

    #[error("notification permission not granted")]
    PermissionDenied,

    #[error("hourly notification limit reached")]
    RateLimited,

    #[error("inside quiet-hours window")]
    QuietHours,

    #[error("storage operation '{operation}' failed: {source}")]
    StorageFailure {
        operation: &'static str,
        impact: ErrorImpact,
        #[source]
        source: anyhow::Error,
    },

    #[error("notification delivery failed: {message}")]
    DeliveryFailure { message: String, impact: ErrorImpact },
}

impl AlertingError {
    /// Recoverable storage failure wrapping an arbitrary collaborator error.
    pub fn storage(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        AlertingError::StorageFailure {
            operation,
            impact: ErrorImpact::Recoverable,
            source: source.into(),
        }
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        AlertingError::DeliveryFailure {
            message: message.into(),
            impact: ErrorImpact::Recoverable,
        }
    }

    pub fn invalid_transition(id: Uuid, reason: impl Into<String>) -> Self {
        AlertingError::InvalidTransition { id, reason: reason.into() }
    }

    pub fn impact(&self) -> ErrorImpact {
        match self {
            AlertingError::NotFound { .. } | AlertingError::InvalidTransition { .. } => {
                ErrorImpact::NonRecoverable
            }
            AlertingError::PermissionDenied
            | AlertingError::RateLimited
            | AlertingError::QuietHours => ErrorImpact::Recoverable,
            AlertingError::StorageFailure { impact, .. }
            | AlertingError::DeliveryFailure { impact, .. } => *impact,
        }
    }

    /// Strategy by error category. Logged alongside the operation name and
    /// alert id so a failure can be reconstructed later.
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            AlertingError::NotFound { .. } | AlertingError::InvalidTransition { .. } => {
                RecoveryStrategy::PromptRetry
            }
            AlertingError::PermissionDenied
            | AlertingError::RateLimited
            | AlertingError::QuietHours => RecoveryStrategy::DegradeWithoutNotifications,
            AlertingError::StorageFailure { impact, .. } => match impact {
                ErrorImpact::Recoverable => RecoveryStrategy::ShowCachedData,
                ErrorImpact::NonRecoverable => RecoveryStrategy::ReinitializeStorage,
            },
            AlertingError::DeliveryFailure { impact, .. } => match impact {
                ErrorImpact::Recoverable => RecoveryStrategy::PromptRetry,
                ErrorImpact::NonRecoverable => RecoveryStrategy::RequireRestart,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_errors_are_non_recoverable() {
        let err = AlertingError::invalid_transition(Uuid::new_v4(), "already acknowledged");
        assert_eq!(err.impact(), ErrorImpact::NonRecoverable);
        assert_eq!(err.recovery_strategy(), RecoveryStrategy::PromptRetry);
    }

    #[test]
    fn storage_failures_fall_back_to_cache() {
        let err = AlertingError::storage("load_alerts", anyhow::anyhow!("disk detached"));
        assert_eq!(err.recovery_strategy(), RecoveryStrategy::ShowCachedData);
    }

    #[test]
    fn policy_skips_degrade_gracefully() {
        assert_eq!(
            AlertingError::QuietHours.recovery_strategy(),
            RecoveryStrategy::DegradeWithoutNotifications
        );
        assert_eq!(
            AlertingError::RateLimited.recovery_strategy(),
            RecoveryStrategy::DegradeWithoutNotifications
        );
    }
}
