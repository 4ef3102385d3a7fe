// src/telemetry/metrics.rs
//! Metric descriptions for the counters emitted throughout the engine.
//!
//! The engine records through the `metrics` facade; the host decides which
//! recorder (if any) to install. Call `describe_metrics` once after
//! installing a recorder so exporters pick up the help texts.

use metrics::describe_counter;

pub fn describe_metrics() {
    describe_counter!("alerts_synthesized", "Synthesis runs that produced alerts");
    describe_counter!("alerts_created", "Alerts added to the working collection");
    describe_counter!("alert_cache_reloads", "Cache reloads from the archive");
    describe_counter!("archive_saves", "Alert blobs written to the archive");
    describe_counter!("archive_loads", "Alert blobs read from the archive");
    describe_counter!("notifications_sent", "Notifications handed to the OS");
    describe_counter!(
        "notifications_suppressed",
        "Delivery attempts stopped by an eligibility check"
    );
    describe_counter!("simulation_ticks_fired", "Simulation ticks that produced alerts");
}
