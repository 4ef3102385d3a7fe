// tests/archive_file_test.rs
//! JSON-file archive behavior against a real filesystem.

use std::sync::Arc;

use chrono::{Duration, Utc};
use resto_alerting::domain::model::alert::Alert;
use resto_alerting::domain::model::alert_type::AlertType;
use resto_alerting::domain::model::context::{RestaurantKind, RestaurantProfile};
use resto_alerting::domain::model::priority::AlertPriority;
use resto_alerting::domain::model::settings::{NotificationSettings, PermissionState};
use resto_alerting::repository::store::{AlertArchive, JsonFileArchive};
use resto_alerting::util::clock::{Clock, FixedClock};

fn sample_alerts(clock: &FixedClock) -> Vec<Alert> {
    vec![
        Alert::new(AlertType::Equipment, AlertPriority::High, "Fryer offline", "Station 2 fryer not heating", clock.now()),
        Alert::new(AlertType::Inventory, AlertPriority::Low, "Napkins low", "Below par level", clock.now()),
    ]
}

#[tokio::test]
async fn file_archive_round_trips_all_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.json");
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let archive = JsonFileArchive::new(&path, clock.clone());

    let alerts = sample_alerts(&clock);
    archive.save_alerts(&alerts).await.unwrap();

    let settings = NotificationSettings { max_per_hour: 4, ..Default::default() };
    archive.save_settings(&settings).await.unwrap();

    let profile = RestaurantProfile {
        restaurant_name: "La Brasa".into(),
        kind: RestaurantKind::CasualDining,
        max_capacity: 80,
        peak_hours: vec![12, 19],
        permission_state: Some(PermissionState::Granted),
    };
    archive.save_profile(&profile).await.unwrap();

    // a second instance over the same file sees everything
    let reopened = JsonFileArchive::new(&path, clock.clone());
    assert_eq!(reopened.load_alerts().await.unwrap().len(), 2);
    assert_eq!(reopened.load_settings().await.unwrap().max_per_hour, 4);
    let p = reopened.load_profile().await.unwrap().unwrap();
    assert_eq!(p.permission_state, Some(PermissionState::Granted));
}

#[tokio::test]
async fn missing_file_is_an_empty_archive() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let archive = JsonFileArchive::new(dir.path().join("nope.json"), clock);

    assert!(archive.load_alerts().await.unwrap().is_empty());
    assert!(archive.load_profile().await.unwrap().is_none());
    // settings fall back to documented defaults
    assert!(archive.load_settings().await.unwrap().enabled);
}

#[tokio::test]
async fn corrupt_file_reinitializes_instead_of_failing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.json");
    tokio::fs::write(&path, b"{not json at all").await.unwrap();

    let clock = Arc::new(FixedClock::new(Utc::now()));
    let archive = JsonFileArchive::new(&path, clock.clone());
    assert!(archive.load_alerts().await.unwrap().is_empty());

    // the file was rewritten; subsequent saves work
    archive.save_alerts(&sample_alerts(&clock)).await.unwrap();
    assert_eq!(archive.load_alerts().await.unwrap().len(), 2);
}

#[tokio::test]
async fn alerts_expire_but_settings_do_not() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.json");
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let archive = JsonFileArchive::new(&path, clock.clone());

    archive.save_alerts(&sample_alerts(&clock)).await.unwrap();
    let settings = NotificationSettings { max_per_hour: 7, ..Default::default() };
    archive.save_settings(&settings).await.unwrap();

    clock.advance(Duration::hours(25));
    assert!(archive.load_alerts().await.unwrap().is_empty());
    assert_eq!(archive.load_settings().await.unwrap().max_per_hour, 7);
}

#[tokio::test]
async fn export_import_moves_state_between_archives() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let source = JsonFileArchive::new(dir.path().join("a.json"), clock.clone());
    let target = JsonFileArchive::new(dir.path().join("b.json"), clock.clone());

    source.save_alerts(&sample_alerts(&clock)).await.unwrap();
    let blob = source.export_all().await.unwrap();
    target.import_all(blob).await.unwrap();
    assert_eq!(target.load_alerts().await.unwrap().len(), 2);
}

#[tokio::test]
async fn backup_restore_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let archive = JsonFileArchive::new(dir.path().join("a.json"), clock.clone());

    archive.save_alerts(&sample_alerts(&clock)).await.unwrap();
    let backup = archive.create_backup().await.unwrap();

    archive.clear_all().await.unwrap();
    assert!(archive.load_alerts().await.unwrap().is_empty());

    archive.restore_from_backup(backup).await.unwrap();
    assert_eq!(archive.load_alerts().await.unwrap().len(), 2);
}
