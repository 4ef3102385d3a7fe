// src/scheduler/simulation.rs
//! Real-time alert simulation.
//!
//! Drives the synthesis engine on a fixed tick: every interval, a weighted
//! coin flip decides whether this tick produces an alert burst. The chance
//! scales with time of day, establishment kind, and weekends; demo mode
//! compresses the interval by the context's simulation speed. Stopping the
//! loop is idempotent and leaves any already scheduled notification timers
//! untouched.

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::model::context::{DayPart, RestaurantContext};
use crate::scheduler::notification_scheduler::NotificationScheduler;
use crate::service::lifecycle::AlertLifecycleManager;
use crate::service::synthesis::GenerationOptions;
use crate::util::clock::Clock;
use crate::util::random::SharedRandom;

const BASE_TICK_PROBABILITY: f64 = 0.1;
const WEEKEND_MULTIPLIER: f64 = 1.2;
const TICK_PROBABILITY_CAP: f64 = 0.5;
const DEFAULT_TICK_SECONDS: u64 = 60;

/// Chance that one tick produces alerts, before the cap.
pub fn tick_probability(hour: u32, ctx: &RestaurantContext) -> f64 {
    let mut p = BASE_TICK_PROBABILITY
        * DayPart::from_hour(hour).simulation_multiplier()
        * ctx.kind.simulation_multiplier();
    if ctx.is_weekend {
        p *= WEEKEND_MULTIPLIER;
    }
    p.min(TICK_PROBABILITY_CAP)
}

/// Handle to a running simulation loop. Dropping it does not stop the loop;
/// call `stop`.
pub struct SimulationHandle {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SimulationHandle {
    /// Stops the loop. Safe to call more than once; pending notification
    /// timers keep running.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().expect("simulation handle lock poisoned").take() {
            task.abort();
            info!("simulation stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .expect("simulation handle lock poisoned")
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }
}

pub struct AlertSimulator {
    lifecycle: Arc<AlertLifecycleManager>,
    scheduler: Arc<NotificationScheduler>,
    clock: Arc<dyn Clock>,
    rng: SharedRandom,
    tick: StdDuration,
}

impl AlertSimulator {
    pub fn new(
        lifecycle: Arc<AlertLifecycleManager>,
        scheduler: Arc<NotificationScheduler>,
        clock: Arc<dyn Clock>,
        rng: SharedRandom,
    ) -> Self {
        Self {
            lifecycle,
            scheduler,
            clock,
            rng,
            tick: StdDuration::from_secs(DEFAULT_TICK_SECONDS),
        }
    }

    pub fn with_tick(mut self, tick: StdDuration) -> Self {
        self.tick = tick;
        self
    }

    /// Spawns the loop and returns its handle. The context snapshot is fixed
    /// for the lifetime of the run; restart to pick up a new one.
    pub fn start(&self, ctx: RestaurantContext) -> SimulationHandle {
        let lifecycle = Arc::clone(&self.lifecycle);
        let scheduler = Arc::clone(&self.scheduler);
        let clock = Arc::clone(&self.clock);
        let rng = Arc::clone(&self.rng);

        let mut tick = self.tick;
        if ctx.demo_mode && ctx.simulation_speed > 1.0 {
            tick = StdDuration::from_secs_f64(tick.as_secs_f64() / ctx.simulation_speed);
        }
        info!(restaurant = %ctx.restaurant_name, tick_secs = tick.as_secs_f64(), "simulation started");

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // the first interval tick fires immediately; skip it
            interval.tick().await;
            loop {
                interval.tick().await;
                if !ctx.is_open {
                    continue;
                }
                use chrono::Timelike;
                let hour = clock.now().hour();
                let p = tick_probability(hour, &ctx);
                let roll = {
                    let mut rng = rng.lock().expect("random source lock poisoned");
                    rng.next_f64()
                };
                if roll >= p {
                    continue;
                }
                // one alert per firing tick
                let options = GenerationOptions { count: Some(1), ..Default::default() };
                match lifecycle.generate_alerts(&ctx, Some(options)).await {
                    Ok(created) if !created.is_empty() => {
                        debug!(count = created.len(), "simulation tick produced alerts");
                        scheduler.schedule_notifications(&created).await;
                        metrics::increment_counter!("simulation_ticks_fired");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!(error = %e, "simulation tick generation failed");
                    }
                }
            }
        });

        SimulationHandle { task: Mutex::new(Some(task)) }
    }
}
