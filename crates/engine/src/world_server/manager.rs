//! The facade this crate exposes to a host game loop.
//!
//! Grounded on the original `WorldServerManager`: wires the cache,
//! predictor, anticipation engine, and collapse manager together behind
//! a handful of host-facing operations, with an `enabled` kill-switch
//! that short-circuits everything else. Unlike the original, there is
//! no module-level singleton — callers own their own instance and pass
//! it wherever it's needed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use worldserver_domain::{AnticipationMetrics, CollapseResult, LocationKey};

use crate::infrastructure::clock::ClockPort;
use crate::infrastructure::config::WorldServerConfig;
use crate::infrastructure::error::CollapseError;
use crate::infrastructure::metrics::SharedMetrics;
use crate::infrastructure::ports::{GameStateReader, LocationVisitWriter, SceneGenerator};

use super::anticipation::AnticipationEngine;
use super::cache::{CacheStats, PreGenerationCache};
use super::collapse::StateCollapseManager;
use super::predictor::LocationPredictor;

/// Snapshot returned by [`WorldServerManager::get_stats`].
#[derive(Debug, Clone)]
pub struct WorldServerStats {
    pub enabled: bool,
    pub metrics: AnticipationMetrics,
    pub cache_stats: CacheStats,
}

/// Top-level handle to the anticipation subsystem. Construct one per
/// game session and hold onto it for that session's lifetime.
pub struct WorldServerManager {
    enabled: bool,
    cache: Arc<PreGenerationCache>,
    engine: AnticipationEngine,
    collapse: StateCollapseManager,
    predictor: LocationPredictor,
    generator: Arc<dyn SceneGenerator>,
    clock: Arc<dyn ClockPort>,
    metrics: SharedMetrics,
    max_predictions: usize,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl WorldServerManager {
    pub fn new(
        config: WorldServerConfig,
        generator: Arc<dyn SceneGenerator>,
        reader: Arc<dyn GameStateReader>,
        visit_writer: Arc<dyn LocationVisitWriter>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let metrics = SharedMetrics::new();
        let cache = Arc::new(PreGenerationCache::new(
            config.cache.max_size,
            metrics.clone(),
            clock.clone(),
        ));

        let engine = AnticipationEngine::new(
            cache.clone(),
            LocationPredictor::new(reader.clone()),
            generator.clone(),
            clock.clone(),
            metrics.clone(),
            config.engine.max_workers,
            Duration::from_secs_f64(config.engine.check_interval_seconds),
            config.engine.max_predictions,
        );

        let collapse = StateCollapseManager::new(
            cache.clone(),
            generator.clone(),
            visit_writer,
            clock.clone(),
            metrics.clone(),
        );

        tracing::info!(
            enabled = config.enabled,
            cache_size = config.cache.max_size,
            "world server manager initialized"
        );

        Self {
            enabled: config.enabled,
            cache,
            engine,
            collapse,
            predictor: LocationPredictor::new(reader),
            generator,
            clock,
            metrics,
            max_predictions: config.engine.max_predictions,
            pending: Mutex::new(None),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn cache(&self) -> &Arc<PreGenerationCache> {
        &self.cache
    }

    pub fn engine(&self) -> &AnticipationEngine {
        &self.engine
    }

    /// Start the background anticipation loop. No-op if disabled.
    pub async fn start(&self, current_location: LocationKey) {
        if !self.enabled {
            return;
        }
        self.engine.start(current_location).await;
    }

    /// Trigger a one-shot round of background pre-generation for
    /// likely next locations. Intended to be called right after
    /// narrative is displayed, while the player is reading.
    ///
    /// Debounced: a call is skipped while a previous one is still in
    /// flight. `generator_override` lets a caller substitute a
    /// one-off generation strategy (e.g. a test double, or a
    /// higher-quality generator for a specific scene) without
    /// reconfiguring the manager.
    pub async fn trigger_anticipation(
        &self,
        current_location: &LocationKey,
        recent_actions: Option<&[String]>,
        generator_override: Option<Arc<dyn SceneGenerator>>,
    ) {
        if !self.enabled {
            return;
        }

        {
            let pending = self.pending.lock().await;
            if let Some(handle) = pending.as_ref() {
                if !handle.is_finished() {
                    tracing::debug!("skipping anticipation, previous still running");
                    return;
                }
            }
        }

        let predictions = self.predictor.predict(current_location, recent_actions, self.max_predictions);
        if predictions.is_empty() {
            tracing::debug!(location_key = %current_location, "no predictions");
            return;
        }

        tracing::info!(
            location_key = %current_location,
            count = predictions.len(),
            "starting anticipation"
        );
        self.metrics.record_prediction(predictions.len() as u64);

        let cache = self.cache.clone();
        let generator = generator_override.unwrap_or_else(|| self.generator.clone());
        let metrics = self.metrics.clone();
        let clock = self.clock.clone();

        let handle = tokio::spawn(async move {
            for prediction in predictions {
                let key = prediction.location_key().clone();
                if cache.contains(&key).await {
                    tracing::debug!(location_key = %key, "skipping, already cached");
                    continue;
                }

                let started_at = clock.now();
                metrics.record_generation_started();
                match generator.generate(&key).await {
                    Ok(scene) => {
                        let duration_ms = (clock.now() - started_at).num_milliseconds() as f64;
                        let scene = scene.with_provenance(prediction.probability(), prediction.reason());
                        cache.put(scene).await;
                        metrics.record_generation_completed(duration_ms);
                        tracing::info!(location_key = %key, "pre-generated");
                    }
                    Err(err) => {
                        metrics.record_generation_failed();
                        tracing::error!(location_key = %key, error = %err, "failed to pre-generate");
                    }
                }
            }
        });

        *self.pending.lock().await = Some(handle);
    }

    /// Check for usable pre-generated content before falling back to
    /// normal (synchronous) generation. Returns `None` when disabled
    /// or on a cache miss — in both cases the caller should generate
    /// normally.
    pub async fn check_pre_generated(
        &self,
        location_key: &LocationKey,
        turn: u64,
    ) -> Result<Option<CollapseResult>, CollapseError> {
        if !self.enabled {
            return Ok(None);
        }

        if !self.cache.contains(location_key).await {
            tracing::debug!(location_key = %location_key, "cache miss");
            return Ok(None);
        }

        tracing::info!(location_key = %location_key, "cache hit");
        let result = self.collapse.collapse_location(location_key, turn).await?;
        Ok(Some(result))
    }

    /// Invalidate one location, or every cached location when `None`.
    /// Returns the number of entries removed.
    pub async fn invalidate(&self, location_key: Option<&LocationKey>) -> usize {
        match location_key {
            Some(key) => usize::from(self.cache.invalidate(key).await),
            None => self.cache.clear().await,
        }
    }

    pub async fn get_stats(&self) -> WorldServerStats {
        WorldServerStats {
            enabled: self.enabled,
            metrics: self.metrics.snapshot(),
            cache_stats: self.cache.stats().await,
        }
    }

    /// Cancel any pending anticipation, stop the engine, and clear the
    /// cache. Call once, when the session ends.
    pub async fn shutdown(&self) {
        let pending = self.pending.lock().await.take();
        if let Some(handle) = pending {
            handle.abort();
        }
        self.engine.cleanup().await;
        tracing::info!("world server manager shutdown complete");
    }
}
