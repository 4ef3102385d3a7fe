// src/repository/store.rs
//! Persistence seam for the alerting engine.
//!
//! This module provides:
//! - `AlertArchive` trait: the narrow key-value interface the engine consumes
//!   (alerts, settings, profile, plus export/import/backup/restore).
//! - `InMemoryArchive` for fast tests and local dev.
//! - `JsonFileArchive` persisting one JSON document via `tokio::fs`.
//!
//! Every blob is stored inside a timestamped envelope. An alert blob older
//! than the expiry window (24h by default) is treated as empty on load.
//! Corrupt data never surfaces as a raw parse error: the archive logs it,
//! reinitializes the offending state, and returns the documented defaults.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::domain::error::AlertingError;
use crate::domain::model::alert::Alert;
use crate::domain::model::context::RestaurantProfile;
use crate::domain::model::settings::NotificationSettings;
use crate::util::clock::Clock;

const KEY_ALERTS: &str = "alerts";
const KEY_SETTINGS: &str = "settings";
const KEY_PROFILE: &str = "profile";

/// A stored blob with the instant it was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    saved_at: DateTime<Utc>,
    payload: JsonValue,
}

type ArchiveState = HashMap<String, Envelope>;

/// Key-value persistence collaborator consumed by the lifecycle manager and
/// the permission manager.
#[async_trait]
pub trait AlertArchive: Send + Sync + 'static {
    async fn save_alerts(&self, alerts: &[Alert]) -> Result<(), AlertingError>;
    /// Returns the persisted list, or empty when nothing was saved or the
    /// blob is older than the expiry window.
    async fn load_alerts(&self) -> Result<Vec<Alert>, AlertingError>;

    async fn save_settings(&self, settings: &NotificationSettings) -> Result<(), AlertingError>;
    /// Returns documented defaults when nothing was saved.
    async fn load_settings(&self) -> Result<NotificationSettings, AlertingError>;

    async fn save_profile(&self, profile: &RestaurantProfile) -> Result<(), AlertingError>;
    async fn load_profile(&self) -> Result<Option<RestaurantProfile>, AlertingError>;

    async fn clear_all(&self) -> Result<(), AlertingError>;
    async fn export_all(&self) -> Result<JsonValue, AlertingError>;
    async fn import_all(&self, blob: JsonValue) -> Result<(), AlertingError>;
    async fn create_backup(&self) -> Result<JsonValue, AlertingError>;
    async fn restore_from_backup(&self, blob: JsonValue) -> Result<(), AlertingError>;
}

fn encode<T: Serialize>(operation: &'static str, value: &T, now: DateTime<Utc>) -> Result<Envelope, AlertingError> {
    let payload = serde_json::to_value(value).map_err(|e| AlertingError::storage(operation, e))?;
    Ok(Envelope { saved_at: now, payload })
}

fn decode_alerts(env: Option<&Envelope>, now: DateTime<Utc>, expiry: Duration) -> Vec<Alert> {
    let Some(env) = env else { return Vec::new() };
    if now - env.saved_at > expiry {
        return Vec::new();
    }
    match serde_json::from_value(env.payload.clone()) {
        Ok(alerts) => alerts,
        Err(e) => {
            warn!(error = %e, "corrupt alert blob; reinitializing as empty");
            Vec::new()
        }
    }
}

fn decode_settings(env: Option<&Envelope>) -> NotificationSettings {
    let Some(env) = env else { return NotificationSettings::default() };
    match serde_json::from_value(env.payload.clone()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "corrupt settings blob; using defaults");
            NotificationSettings::default()
        }
    }
}

fn decode_profile(env: Option<&Envelope>) -> Option<RestaurantProfile> {
    let env = env?;
    match serde_json::from_value(env.payload.clone()) {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(error = %e, "corrupt profile blob; treating as absent");
            None
        }
    }
}

fn state_to_export(state: &ArchiveState) -> Result<JsonValue, AlertingError> {
    serde_json::to_value(state).map_err(|e| AlertingError::storage("export_all", e))
}

fn state_from_import(blob: JsonValue) -> Result<ArchiveState, AlertingError> {
    serde_json::from_value(blob).map_err(|e| AlertingError::storage("import_all", e))
}

#[derive(Debug, Serialize, Deserialize)]
struct Backup {
    backed_up_at: DateTime<Utc>,
    entries: ArchiveState,
}

/// --------------------
/// In-memory implementation (fast tests / dev)
/// --------------------
pub struct InMemoryArchive {
    entries: RwLock<ArchiveState>,
    clock: Arc<dyn Clock>,
    alert_expiry: Duration,
}

impl InMemoryArchive {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_expiry(clock, Duration::hours(24))
    }

    pub fn with_expiry(clock: Arc<dyn Clock>, alert_expiry: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            alert_expiry,
        }
    }
}

#[async_trait]
impl AlertArchive for InMemoryArchive {
    async fn save_alerts(&self, alerts: &[Alert]) -> Result<(), AlertingError> {
        let env = encode("save_alerts", &alerts, self.clock.now())?;
        self.entries.write().await.insert(KEY_ALERTS.into(), env);
        metrics::increment_counter!("archive_saves");
        Ok(())
    }

    async fn load_alerts(&self) -> Result<Vec<Alert>, AlertingError> {
        let entries = self.entries.read().await;
        metrics::increment_counter!("archive_loads");
        Ok(decode_alerts(entries.get(KEY_ALERTS), self.clock.now(), self.alert_expiry))
    }

    async fn save_settings(&self, settings: &NotificationSettings) -> Result<(), AlertingError> {
        let env = encode("save_settings", settings, self.clock.now())?;
        self.entries.write().await.insert(KEY_SETTINGS.into(), env);
        Ok(())
    }

    async fn load_settings(&self) -> Result<NotificationSettings, AlertingError> {
        let entries = self.entries.read().await;
        Ok(decode_settings(entries.get(KEY_SETTINGS)))
    }

    async fn save_profile(&self, profile: &RestaurantProfile) -> Result<(), AlertingError> {
        let env = encode("save_profile", profile, self.clock.now())?;
        self.entries.write().await.insert(KEY_PROFILE.into(), env);
        Ok(())
    }

    async fn load_profile(&self) -> Result<Option<RestaurantProfile>, AlertingError> {
        let entries = self.entries.read().await;
        Ok(decode_profile(entries.get(KEY_PROFILE)))
    }

    async fn clear_all(&self) -> Result<(), AlertingError> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn export_all(&self) -> Result<JsonValue, AlertingError> {
        state_to_export(&*self.entries.read().await)
    }

    async fn import_all(&self, blob: JsonValue) -> Result<(), AlertingError> {
        let state = state_from_import(blob)?;
        *self.entries.write().await = state;
        Ok(())
    }

    async fn create_backup(&self) -> Result<JsonValue, AlertingError> {
        let backup = Backup {
            backed_up_at: self.clock.now(),
            entries: self.entries.read().await.clone(),
        };
        serde_json::to_value(&backup).map_err(|e| AlertingError::storage("create_backup", e))
    }

    async fn restore_from_backup(&self, blob: JsonValue) -> Result<(), AlertingError> {
        let backup: Backup =
            serde_json::from_value(blob).map_err(|e| AlertingError::storage("restore_from_backup", e))?;
        *self.entries.write().await = backup.entries;
        Ok(())
    }
}

/// --------------------
/// JSON file implementation (single-document store)
/// --------------------
///
/// The whole archive lives in one JSON file; operations take an internal
/// mutex so concurrent read-modify-write cycles cannot interleave.
pub struct JsonFileArchive {
    path: PathBuf,
    io_lock: Mutex<()>,
    clock: Arc<dyn Clock>,
    alert_expiry: Duration,
}

impl JsonFileArchive {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self::with_expiry(path, clock, Duration::hours(24))
    }

    pub fn with_expiry(path: impl Into<PathBuf>, clock: Arc<dyn Clock>, alert_expiry: Duration) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
            clock,
            alert_expiry,
        }
    }

    /// Reads the backing file. A missing file is an empty archive; a corrupt
    /// one is cleared and reinitialized rather than surfaced as a parse
    /// error.
    async fn read_state(&self) -> Result<ArchiveState, AlertingError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(AlertingError::storage("read_archive", e)),
        };
        match serde_json::from_slice(&bytes) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt archive file; reinitializing");
                self.write_state(&HashMap::new()).await?;
                Ok(HashMap::new())
            }
        }
    }

    async fn write_state(&self, state: &ArchiveState) -> Result<(), AlertingError> {
        let bytes =
            serde_json::to_vec_pretty(state).map_err(|e| AlertingError::storage("write_archive", e))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| AlertingError::storage("write_archive", e))
    }

    async fn upsert(&self, key: &str, env: Envelope) -> Result<(), AlertingError> {
        let _guard = self.io_lock.lock().await;
        let mut state = self.read_state().await?;
        state.insert(key.to_string(), env);
        self.write_state(&state).await
    }
}

#[async_trait]
impl AlertArchive for JsonFileArchive {
    async fn save_alerts(&self, alerts: &[Alert]) -> Result<(), AlertingError> {
        let env = encode("save_alerts", &alerts, self.clock.now())?;
        self.upsert(KEY_ALERTS, env).await?;
        metrics::increment_counter!("archive_saves");
        Ok(())
    }

    async fn load_alerts(&self) -> Result<Vec<Alert>, AlertingError> {
        let _guard = self.io_lock.lock().await;
        let state = self.read_state().await?;
        metrics::increment_counter!("archive_loads");
        Ok(decode_alerts(state.get(KEY_ALERTS), self.clock.now(), self.alert_expiry))
    }

    async fn save_settings(&self, settings: &NotificationSettings) -> Result<(), AlertingError> {
        let env = encode("save_settings", settings, self.clock.now())?;
        self.upsert(KEY_SETTINGS, env).await
    }

    async fn load_settings(&self) -> Result<NotificationSettings, AlertingError> {
        let _guard = self.io_lock.lock().await;
        let state = self.read_state().await?;
        Ok(decode_settings(state.get(KEY_SETTINGS)))
    }

    async fn save_profile(&self, profile: &RestaurantProfile) -> Result<(), AlertingError> {
        let env = encode("save_profile", profile, self.clock.now())?;
        self.upsert(KEY_PROFILE, env).await
    }

    async fn load_profile(&self) -> Result<Option<RestaurantProfile>, AlertingError> {
        let _guard = self.io_lock.lock().await;
        let state = self.read_state().await?;
        Ok(decode_profile(state.get(KEY_PROFILE)))
    }

    async fn clear_all(&self) -> Result<(), AlertingError> {
        let _guard = self.io_lock.lock().await;
        self.write_state(&HashMap::new()).await
    }

    async fn export_all(&self) -> Result<JsonValue, AlertingError> {
        let _guard = self.io_lock.lock().await;
        let state = self.read_state().await?;
        state_to_export(&state)
    }

    async fn import_all(&self, blob: JsonValue) -> Result<(), AlertingError> {
        let state = state_from_import(blob)?;
        let _guard = self.io_lock.lock().await;
        self.write_state(&state).await
    }

    async fn create_backup(&self) -> Result<JsonValue, AlertingError> {
        let _guard = self.io_lock.lock().await;
        let backup = Backup {
            backed_up_at: self.clock.now(),
            entries: self.read_state().await?,
        };
        serde_json::to_value(&backup).map_err(|e| AlertingError::storage("create_backup", e))
    }

    async fn restore_from_backup(&self, blob: JsonValue) -> Result<(), AlertingError> {
        let backup: Backup =
            serde_json::from_value(blob).map_err(|e| AlertingError::storage("restore_from_backup", e))?;
        let _guard = self.io_lock.lock().await;
        self.write_state(&backup.entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::alert_type::AlertType;
    use crate::domain::model::priority::AlertPriority;
    use crate::util::clock::FixedClock;

    fn sample_alerts(now: DateTime<Utc>) -> Vec<Alert> {
        vec![
            Alert::new(AlertType::Equipment, AlertPriority::High, "Fryer offline", "Station 2 fryer not heating", now),
            Alert::new(AlertType::Inventory, AlertPriority::Low, "Napkins low", "Below par level", now),
        ]
    }

    #[tokio::test]
    async fn alerts_round_trip_within_expiry() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let archive = InMemoryArchive::new(clock.clone());
        let alerts = sample_alerts(clock.now());
        archive.save_alerts(&alerts).await.unwrap();

        let loaded = archive.load_alerts().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, alerts[0].id);
        assert_eq!(loaded[1].title, "Napkins low");
    }

    #[tokio::test]
    async fn alerts_expire_after_window() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let archive = InMemoryArchive::new(clock.clone());
        archive.save_alerts(&sample_alerts(clock.now())).await.unwrap();

        clock.advance(Duration::hours(25));
        assert!(archive.load_alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn settings_default_when_absent() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let archive = InMemoryArchive::new(clock);
        let s = archive.load_settings().await.unwrap();
        assert!(s.enabled);
        assert_eq!(s.max_per_hour, 10);
    }

    #[tokio::test]
    async fn backup_and_restore_round_trip() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let archive = InMemoryArchive::new(clock.clone());
        archive.save_alerts(&sample_alerts(clock.now())).await.unwrap();

        let backup = archive.create_backup().await.unwrap();
        archive.clear_all().await.unwrap();
        assert!(archive.load_alerts().await.unwrap().is_empty());

        archive.restore_from_backup(backup).await.unwrap();
        assert_eq!(archive.load_alerts().await.unwrap().len(), 2);
    }
}
