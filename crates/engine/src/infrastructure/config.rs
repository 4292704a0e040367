//! Configuration for the World Server subsystem.
//!
//! Layered over defaults, an optional config file, and environment
//! variables prefixed `WORLDSERVER_`, using the same `config` +
//! `dotenvy` stack the teacher crate loads its own `AppConfig` with.

use serde::Deserialize;

use worldserver_domain::DEFAULT_EXPIRY_SECONDS;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_size: usize,
    pub default_expiry_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            default_expiry_seconds: DEFAULT_EXPIRY_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_workers: usize,
    pub max_predictions: usize,
    pub check_interval_seconds: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: 2,
            max_predictions: 3,
            check_interval_seconds: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldServerConfig {
    pub enabled: bool,
    pub cache: CacheConfig,
    pub engine: EngineConfig,
}

impl Default for WorldServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache: CacheConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl WorldServerConfig {
    /// Load configuration from `.env` plus any `WORLDSERVER_*`
    /// environment variables, falling back to the documented defaults
    /// for anything unset (spec.md §6).
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = WorldServerConfig::default();
        let built = config::Config::builder()
            .set_default("enabled", defaults.enabled)?
            .set_default("cache.max_size", defaults.cache.max_size as i64)?
            .set_default(
                "cache.default_expiry_seconds",
                defaults.cache.default_expiry_seconds as i64,
            )?
            .set_default("engine.max_workers", defaults.engine.max_workers as i64)?
            .set_default(
                "engine.max_predictions",
                defaults.engine.max_predictions as i64,
            )?
            .set_default(
                "engine.check_interval_seconds",
                defaults.engine.check_interval_seconds,
            )?
            .add_source(config::Environment::with_prefix("WORLDSERVER").separator("__"))
            .build()?;

        built.try_deserialize()
    }
}
