// src/lib.rs
//! Alert lifecycle and notification-scheduling engine for a restaurant
//! operations app.
//!
//! The crate decides *whether*, *when*, and *how often* an operational alert
//! (equipment, inventory, staffing, safety, ...) becomes a user-facing
//! notification, under user quiet hours, per-priority policy, and a sliding
//! hourly rate limit.
//!
//! Layout:
//! - `domain`: the `Alert` entity, its enums, context/settings snapshots, and
//!   the error taxonomy.
//! - `service`: alert synthesis, the lifecycle manager (state machine,
//!   filters, statistics), the permission manager, and the delivery gate.
//! - `scheduler`: timing decisions, the pending-timer map, batching and
//!   contextual scheduling passes, and the real-time simulation driver.
//! - `repository`: the key-value persistence seam (in-memory and JSON-file
//!   archives).
//! - `adapter::notifier`: the OS notification seam.
//! - `engine`: explicit construction and wiring of the above; no singletons.
//!
//! Screen rendering, theming, the OS notification primitive itself, and
//! third-party POS/reservation integrations are external collaborators and
//! are consumed only through the traits in `repository` and
//! `adapter::notifier`.

pub mod adapter {
    pub mod notifier {
        pub mod system_notifier;
    }
}

pub mod config;

pub mod domain {
    pub mod error;
    pub mod model {
        pub mod alert;
        pub mod alert_type;
        pub mod context;
        pub mod priority;
        pub mod settings;
        pub mod status;
    }
}

pub mod engine;

pub mod repository {
    pub mod store;
}

pub mod scheduler {
    pub mod notification_scheduler;
    pub mod simulation;
}

pub mod service {
    pub mod delivery_gate;
    pub mod lifecycle;
    pub mod permission;
    pub mod synthesis;
}

pub mod telemetry {
    pub mod metrics;
    pub mod tracing;
}

pub mod util {
    pub mod clock;
    pub mod random;
}
