// src/config.rs
//! Engine configuration.
//!
//! Loaded from optional config files plus `RESTO__`-prefixed environment
//! variables; every field has a default so an empty environment yields a
//! working engine.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Minutes the in-memory alert cache is trusted before a reload.
    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: i64,

    /// Hours a persisted alert blob stays valid.
    #[serde(default = "default_archive_expiry_hours")]
    pub archive_expiry_hours: i64,

    /// Backing file for the JSON archive; `None` keeps everything in memory.
    #[serde(default)]
    pub archive_path: Option<PathBuf>,

    /// Simulation tick interval, seconds.
    #[serde(default = "default_tick_seconds")]
    pub simulation_tick_seconds: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Filter directive when `RUST_LOG` is unset, e.g. `"resto_alerting=debug"`.
    pub level: Option<String>,
}

fn default_cache_ttl_minutes() -> i64 {
    5
}

fn default_archive_expiry_hours() -> i64 {
    24
}

fn default_tick_seconds() -> u64 {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_minutes: default_cache_ttl_minutes(),
            archive_expiry_hours: default_archive_expiry_hours(),
            archive_path: None,
            simulation_tick_seconds: default_tick_seconds(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Layers config files (later files override earlier ones) under
    /// `RESTO__`-prefixed environment variables.
    pub fn load_from(config_paths: &[PathBuf]) -> Result<Self> {
        let mut cfg = Config::builder();
        for path in config_paths {
            if path.exists() {
                cfg = cfg.add_source(File::from(path.clone()));
            }
        }
        cfg = cfg.add_source(Environment::with_prefix("RESTO").separator("__"));
        let built = cfg.build().context("failed to build configuration")?;
        let parsed: EngineConfig = built
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        if self.cache_ttl_minutes <= 0 {
            anyhow::bail!("cache_ttl_minutes must be positive");
        }
        if self.archive_expiry_hours <= 0 {
            anyhow::bail!("archive_expiry_hours must be positive");
        }
        if self.simulation_tick_seconds == 0 {
            anyhow::bail!("simulation_tick_seconds must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.cache_ttl_minutes, 5);
        assert_eq!(cfg.archive_expiry_hours, 24);
        assert_eq!(cfg.simulation_tick_seconds, 60);
        assert!(cfg.archive_path.is_none());
    }

    #[test]
    fn empty_sources_yield_defaults() {
        let cfg = EngineConfig::load_from(&[]).unwrap();
        assert_eq!(cfg.cache_ttl_minutes, 5);
    }
}
