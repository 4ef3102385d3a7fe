// src/telemetry/tracing.rs
//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise the configured fallback directive
//! applies, defaulting to `info`. Safe to call more than once: only the
//! first initialization installs the global subscriber.

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

pub fn init_tracing(logging: &LoggingConfig) {
    let fallback = logging.level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();
    if installed {
        info!(fallback, "tracing initialized");
    }
}
