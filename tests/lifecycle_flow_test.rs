// tests/lifecycle_flow_test.rs
//! End-to-end lifecycle flows through the fully wired engine.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use resto_alerting::adapter::notifier::system_notifier::InMemoryNotifier;
use resto_alerting::domain::error::AlertingError;
use resto_alerting::domain::model::alert::Alert;
use resto_alerting::domain::model::alert_type::AlertType;
use resto_alerting::domain::model::context::{RestaurantContext, RestaurantKind, ServiceScenario};
use resto_alerting::domain::model::priority::AlertPriority;
use resto_alerting::domain::model::status::AlertStatus;
use resto_alerting::engine::AlertingEngine;
use resto_alerting::repository::store::{AlertArchive, InMemoryArchive};
use resto_alerting::service::lifecycle::AlertFilters;
use resto_alerting::service::synthesis::GenerationOptions;
use resto_alerting::util::clock::{Clock, FixedClock};
use resto_alerting::util::random::SequenceRandom;

fn ctx(demo: bool) -> RestaurantContext {
    RestaurantContext {
        restaurant_name: "La Brasa".into(),
        kind: RestaurantKind::CasualDining,
        capacity: 60,
        max_capacity: 80,
        active_orders: 18,
        staff_on_duty: 6,
        is_open: true,
        average_alerts_per_hour: 4.0,
        peak_hours: vec![12, 19],
        is_weekend: false,
        demo_mode: demo,
        simulation_speed: 1.0,
    }
}

fn lunch_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 3, 12, 30, 0).unwrap()))
}

async fn engine_with(clock: Arc<FixedClock>) -> AlertingEngine {
    AlertingEngine::builder(Arc::new(InMemoryNotifier::granted()))
        .clock(clock)
        .random(Box::new(SequenceRandom::new(vec![0.0, 0.3, 0.6, 0.9])))
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn demo_generation_uses_scenario_templates() {
    let engine = engine_with(lunch_clock()).await;

    let options = GenerationOptions {
        scenario: Some(ServiceScenario::MorningPrep),
        ..Default::default()
    };
    let created = engine
        .lifecycle()
        .generate_alerts(&ctx(true), Some(options))
        .await
        .unwrap();
    assert_eq!(created.len(), 4);
    assert!(created.iter().any(|a| a.alert_type == AlertType::Inventory));

    // context tags are stamped on every generated alert
    for a in &created {
        assert!(a.has_tag("daypart:afternoon"));
        assert!(a.has_tag("kind:casual-dining"));
    }
}

#[tokio::test]
async fn full_transition_path_and_filters() {
    let clock = lunch_clock();
    let engine = engine_with(clock.clone()).await;
    let lifecycle = engine.lifecycle();

    let high = Alert::new(AlertType::Equipment, AlertPriority::High, "Fryer offline", "m", clock.now());
    let med = Alert::new(AlertType::Order, AlertPriority::Medium, "Large party", "m", clock.now());
    let crit = Alert::new(AlertType::Safety, AlertPriority::Critical, "Hood fault", "m", clock.now());
    let (high_id, med_id, crit_id) = (high.id, med.id, crit.id);
    lifecycle.insert_alert(high).await.unwrap();
    lifecycle.insert_alert(med).await.unwrap();
    lifecycle.insert_alert(crit).await.unwrap();

    // acknowledge, then resolve
    clock.advance(Duration::minutes(2));
    lifecycle.acknowledge_alert(high_id, "maria").await.unwrap();
    clock.advance(Duration::minutes(28));
    let resolved = lifecycle.resolve_alert(high_id).await.unwrap();
    assert_eq!(resolved.resolution_latency().unwrap().num_minutes(), 30);

    // dismiss works for medium, never for critical
    lifecycle.dismiss_alert(med_id).await.unwrap();
    let err = lifecycle.dismiss_alert(crit_id).await.unwrap_err();
    assert!(matches!(err, AlertingError::InvalidTransition { .. }));

    // active view hides the terminal alerts
    let active = lifecycle
        .filtered(&AlertFilters {
            statuses: Some(vec![AlertStatus::Active]),
            ..Default::default()
        })
        .await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, crit_id);

    let stats = lifecycle.statistics(None).await;
    assert_eq!(stats.total, 3);
    assert_eq!(stats.critical_active, 1);
    assert_eq!(stats.mean_resolution_minutes, Some(30.0));
}

#[tokio::test]
async fn state_survives_cache_expiry_through_the_archive() {
    let clock = lunch_clock();
    let archive = Arc::new(InMemoryArchive::new(clock.clone()));
    let engine = AlertingEngine::builder(Arc::new(InMemoryNotifier::granted()))
        .clock(clock.clone())
        .random(Box::new(SequenceRandom::new(vec![0.0])))
        .archive(archive.clone())
        .build()
        .await
        .unwrap();

    let a = Alert::new(AlertType::Inventory, AlertPriority::Medium, "Chicken low", "m", clock.now());
    let id = a.id;
    engine.lifecycle().insert_alert(a).await.unwrap();
    engine.lifecycle().mark_as_read(id).await.unwrap();

    // past the cache TTL the collection reloads from the archive
    clock.advance(Duration::minutes(6));
    let all = engine.lifecycle().all_alerts().await;
    assert_eq!(all.len(), 1);
    assert!(!all[0].is_unread());

    // and a day later the persisted blob has expired
    clock.advance(Duration::hours(25));
    assert!(archive.load_alerts().await.unwrap().is_empty());
    assert!(engine.lifecycle().all_alerts().await.is_empty());
}

#[tokio::test]
async fn clear_all_removes_collection_and_store() {
    let clock = lunch_clock();
    let archive = Arc::new(InMemoryArchive::new(clock.clone()));
    let engine = AlertingEngine::builder(Arc::new(InMemoryNotifier::granted()))
        .clock(clock.clone())
        .random(Box::new(SequenceRandom::new(vec![0.0])))
        .archive(archive.clone())
        .build()
        .await
        .unwrap();

    engine
        .lifecycle()
        .generate_alerts(&ctx(true), None)
        .await
        .unwrap();
    assert!(!engine.lifecycle().all_alerts().await.is_empty());

    engine.lifecycle().clear_all().await.unwrap();
    assert!(engine.lifecycle().all_alerts().await.is_empty());
    assert!(archive.load_alerts().await.unwrap().is_empty());
}
