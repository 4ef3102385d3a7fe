// src/service/permission.rs
//! Notification permission manager.
//!
//! Wraps the OS notifier's permission calls, keeps the last observed state in
//! memory, and mirrors it into the persisted restaurant profile so the next
//! session starts from the previous answer instead of `Undetermined`.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::adapter::notifier::system_notifier::SystemNotifier;
use crate::domain::error::AlertingError;
use crate::domain::model::settings::PermissionState;
use crate::repository::store::AlertArchive;

pub struct PermissionManager {
    notifier: Arc<dyn SystemNotifier>,
    archive: Arc<dyn AlertArchive>,
    state: RwLock<PermissionState>,
}

impl PermissionManager {
    pub fn new(notifier: Arc<dyn SystemNotifier>, archive: Arc<dyn AlertArchive>) -> Self {
        Self {
            notifier,
            archive,
            state: RwLock::new(PermissionState::Undetermined),
        }
    }

    /// Seeds the cached state from the persisted profile, if one exists.
    pub async fn restore_persisted(&self) {
        match self.archive.load_profile().await {
            Ok(Some(profile)) => {
                if let Some(persisted) = profile.permission_state {
                    *self.state.write().await = persisted;
                    debug!(state = ?persisted, "restored persisted permission state");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "could not restore permission state"),
        }
    }

    /// Prompts the user through the OS collaborator, caches the answer, and
    /// mirrors it into the profile when one is persisted.
    pub async fn request(&self) -> Result<PermissionState, AlertingError> {
        let state = self.notifier.request_permission().await?;
        *self.state.write().await = state;
        self.persist(state).await;
        Ok(state)
    }

    /// Re-reads the OS-level permission and refreshes the cache. Use this on
    /// session start; the user may have changed it in system settings.
    pub async fn check(&self) -> Result<PermissionState, AlertingError> {
        let state = self.notifier.check_permission().await?;
        *self.state.write().await = state;
        Ok(state)
    }

    /// Last observed state, without touching the OS.
    pub async fn current(&self) -> PermissionState {
        *self.state.read().await
    }

    async fn persist(&self, state: PermissionState) {
        let profile = match self.archive.load_profile().await {
            Ok(Some(p)) => p,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "could not load profile to persist permission state");
                return;
            }
        };
        let mut profile = profile;
        profile.permission_state = Some(state);
        if let Err(e) = self.archive.save_profile(&profile).await {
            warn!(error = %e, "could not persist permission state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::notifier::system_notifier::InMemoryNotifier;
    use crate::domain::model::context::{RestaurantKind, RestaurantProfile};
    use crate::repository::store::InMemoryArchive;
    use crate::util::clock::FixedClock;
    use chrono::Utc;

    fn profile() -> RestaurantProfile {
        RestaurantProfile {
            restaurant_name: "La Brasa".into(),
            kind: RestaurantKind::CasualDining,
            max_capacity: 80,
            peak_hours: vec![12, 19],
            permission_state: None,
        }
    }

    #[tokio::test]
    async fn request_caches_and_persists() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let archive = Arc::new(InMemoryArchive::new(clock));
        archive.save_profile(&profile()).await.unwrap();

        let notifier = Arc::new(InMemoryNotifier::new(PermissionState::Undetermined, true));
        let mgr = PermissionManager::new(notifier, archive.clone());

        assert_eq!(mgr.current().await, PermissionState::Undetermined);
        assert_eq!(mgr.request().await.unwrap(), PermissionState::Granted);
        assert_eq!(mgr.current().await, PermissionState::Granted);

        let stored = archive.load_profile().await.unwrap().unwrap();
        assert_eq!(stored.permission_state, Some(PermissionState::Granted));
    }

    #[tokio::test]
    async fn restore_reads_previous_session_state() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let archive = Arc::new(InMemoryArchive::new(clock));
        let mut p = profile();
        p.permission_state = Some(PermissionState::Denied);
        archive.save_profile(&p).await.unwrap();

        let notifier = Arc::new(InMemoryNotifier::new(PermissionState::Undetermined, true));
        let mgr = PermissionManager::new(notifier, archive);
        mgr.restore_persisted().await;
        assert_eq!(mgr.current().await, PermissionState::Denied);
    }
}
