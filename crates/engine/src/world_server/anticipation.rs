//! Background engine that predicts and pre-generates scenes ahead of
//! the player.
//!
//! Grounded on the original `AnticipationEngine` (background loop,
//! per-location task tracking, thread-pool-bounded generation) but
//! recast onto `tokio`: the thread pool becomes a `Semaphore`-bounded
//! set of spawned tasks, and the loop's cancellation becomes an
//! `AbortHandle` plus a cooperative `running` flag.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;

use worldserver_domain::{
    AnticipationMetrics, AnticipationTask, GenerationStatus, LocationKey, PredictionReason,
    PreGeneratedScene,
};

use crate::infrastructure::clock::ClockPort;
use crate::infrastructure::metrics::SharedMetrics;
use crate::infrastructure::ports::SceneGenerator;

use super::cache::{CacheStats, PreGenerationCache};
use super::predictor::LocationPredictor;

/// Snapshot of engine state, for diagnostics and the manager's
/// `get_stats` surface.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub running: bool,
    pub current_location: Option<LocationKey>,
    pub cache_stats: CacheStats,
    pub tasks_by_status: HashMap<String, usize>,
    pub metrics: AnticipationMetrics,
}

fn status_label(status: GenerationStatus) -> &'static str {
    match status {
        GenerationStatus::Pending => "pending",
        GenerationStatus::InProgress => "in_progress",
        GenerationStatus::Completed => "completed",
        GenerationStatus::Failed => "failed",
        GenerationStatus::Expired => "expired",
        GenerationStatus::Cancelled => "cancelled",
    }
}

struct Inner {
    cache: Arc<PreGenerationCache>,
    predictor: LocationPredictor,
    generator: Arc<dyn SceneGenerator>,
    clock: Arc<dyn ClockPort>,
    metrics: SharedMetrics,
    max_workers: usize,
    check_interval: Duration,
    max_predictions: usize,

    running: AtomicBool,
    current_location: Mutex<Option<LocationKey>>,
    tasks: Mutex<HashMap<LocationKey, AnticipationTask>>,
    semaphore: Semaphore,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

/// Predicts likely next locations and pre-generates scenes for them in
/// the background, storing results in the shared cache. Cheaply
/// cloneable; every clone shares the same state.
#[derive(Clone)]
pub struct AnticipationEngine(Arc<Inner>);

impl AnticipationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: Arc<PreGenerationCache>,
        predictor: LocationPredictor,
        generator: Arc<dyn SceneGenerator>,
        clock: Arc<dyn ClockPort>,
        metrics: SharedMetrics,
        max_workers: usize,
        check_interval: Duration,
        max_predictions: usize,
    ) -> Self {
        Self(Arc::new(Inner {
            cache,
            predictor,
            generator,
            clock,
            metrics,
            max_workers,
            check_interval,
            max_predictions,
            running: AtomicBool::new(false),
            current_location: Mutex::new(None),
            tasks: Mutex::new(HashMap::new()),
            semaphore: Semaphore::new(max_workers.max(1)),
            loop_handle: Mutex::new(None),
        }))
    }

    pub fn cache(&self) -> &Arc<PreGenerationCache> {
        &self.0.cache
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.0.metrics
    }

    pub fn is_running(&self) -> bool {
        self.0.running.load(Ordering::SeqCst)
    }

    pub async fn current_location(&self) -> Option<LocationKey> {
        self.0.current_location.lock().await.clone()
    }

    /// Start the background anticipation loop at `current_location`.
    /// A no-op (with a warning log) if already running.
    pub async fn start(&self, current_location: LocationKey) {
        let already_running = self.0.running.swap(true, Ordering::SeqCst);
        if already_running {
            tracing::warn!("anticipation engine already running");
            return;
        }

        *self.0.current_location.lock().await = Some(current_location.clone());

        let engine = self.clone();
        let handle = tokio::spawn(async move { engine.anticipation_loop().await });
        *self.0.loop_handle.lock().await = Some(handle);

        tracing::info!(
            location_key = %current_location,
            max_workers = self.0.max_workers,
            check_interval_seconds = self.0.check_interval.as_secs_f64(),
            "anticipation engine started"
        );
    }

    /// Stop the loop and mark any still-in-progress tasks expired.
    pub async fn stop(&self) {
        let was_running = self.0.running.swap(false, Ordering::SeqCst);
        if !was_running {
            return;
        }

        let handle = self.0.loop_handle.lock().await.take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }

        let now = self.0.clock.now();
        let mut tasks = self.0.tasks.lock().await;
        for task in tasks.values_mut() {
            if task.status() == GenerationStatus::InProgress {
                task.mark_expired(now);
                self.0.metrics.record_generation_expired();
            }
        }

        tracing::info!("anticipation engine stopped");
    }

    /// Stop the loop and clear the cache. Call once, at shutdown.
    pub async fn cleanup(&self) {
        self.stop().await;
        self.0.cache.clear().await;
    }

    /// Record that the player moved, invalidating stale predictions and
    /// triggering an immediate anticipation cycle from the new location.
    pub async fn on_location_change(&self, new_location: LocationKey) {
        let old_location = {
            let mut guard = self.0.current_location.lock().await;
            let old = guard.clone();
            *guard = Some(new_location.clone());
            old
        };

        tracing::info!(
            old_location = ?old_location,
            new_location = %new_location,
            "location changed"
        );

        self.0.cache.invalidate_all_except(Some(&new_location)).await;

        {
            let now = self.0.clock.now();
            let mut tasks = self.0.tasks.lock().await;
            for task in tasks.values_mut() {
                if task.location_key() != &new_location && task.status() == GenerationStatus::InProgress {
                    task.mark_expired(now);
                    self.0.metrics.record_generation_expired();
                }
            }
            // Keep expired-but-still-in-flight tasks around: the worker
            // re-looks them up by key in `run_generation`/the completion
            // handler and relies on seeing `Expired` there to discard its
            // result instead of caching it.
            tasks.retain(|key, task| key == &new_location || task.status() == GenerationStatus::Expired);
        }

        if self.is_running() {
            let engine = self.clone();
            tokio::spawn(async move { engine.run_cycle().await });
        }
    }

    /// Look up a pre-generated scene without triggering generation.
    pub async fn get_pre_generated(&self, location_key: &LocationKey) -> Option<PreGeneratedScene> {
        self.0.cache.get(location_key).await
    }

    /// Generate a location immediately, bypassing prediction. Returns
    /// the cached scene if one is already fresh rather than
    /// regenerating it — this primes the cache, it does not override.
    pub async fn force_generate(&self, location_key: &LocationKey) -> Option<PreGeneratedScene> {
        if let Some(cached) = self.0.cache.get(location_key).await {
            return Some(cached);
        }

        tracing::info!(location_key = %location_key, "force generating scene");
        match self.0.generator.generate(location_key).await {
            Ok(scene) => {
                self.0.cache.put(scene.clone()).await;
                Some(scene)
            }
            Err(err) => {
                tracing::error!(location_key = %location_key, error = %err, "force generation failed");
                None
            }
        }
    }

    pub async fn status(&self) -> EngineStatus {
        let tasks_by_status = {
            let tasks = self.0.tasks.lock().await;
            let mut counts: HashMap<String, usize> = HashMap::new();
            for task in tasks.values() {
                *counts.entry(status_label(task.status()).to_string()).or_insert(0) += 1;
            }
            counts
        };

        EngineStatus {
            running: self.is_running(),
            current_location: self.current_location().await,
            cache_stats: self.0.cache.stats().await,
            tasks_by_status,
            metrics: self.0.metrics.snapshot(),
        }
    }

    async fn anticipation_loop(&self) {
        tracing::debug!("anticipation loop started");
        while self.0.running.load(Ordering::SeqCst) {
            self.run_cycle().await;
            tokio::time::sleep(self.0.check_interval).await;
        }
        tracing::debug!("anticipation loop ended");
    }

    async fn run_cycle(&self) {
        let Some(current) = self.current_location().await else {
            return;
        };

        let predictions = self.0.predictor.predict(&current, None, self.0.max_predictions);
        if predictions.is_empty() {
            return;
        }
        self.0.metrics.record_prediction(predictions.len() as u64);

        for prediction in predictions {
            let key = prediction.location_key().clone();

            if self.0.cache.contains(&key).await {
                tracing::debug!(location_key = %key, "skipping, already cached");
                continue;
            }

            let already_queued = {
                let tasks = self.0.tasks.lock().await;
                tasks.get(&key).map(|t| t.status().is_live()).unwrap_or(false)
            };
            if already_queued {
                tracing::debug!(location_key = %key, "skipping, already queued");
                continue;
            }

            self.queue_generation(key, prediction.probability(), prediction.reason())
                .await;
        }
    }

    async fn queue_generation(&self, location_key: LocationKey, priority: f64, reason: PredictionReason) {
        let now = self.0.clock.now();
        let task = AnticipationTask::new(location_key.clone(), priority, reason, now);
        self.0.tasks.lock().await.insert(location_key.clone(), task);

        tracing::info!(
            location_key = %location_key,
            priority,
            reason = ?reason,
            "queued generation"
        );

        let engine = self.clone();
        tokio::spawn(async move { engine.run_generation(location_key).await });
    }

    async fn run_generation(&self, location_key: LocationKey) {
        let Ok(_permit) = self.0.semaphore.acquire().await else {
            return;
        };

        {
            let tasks = self.0.tasks.lock().await;
            match tasks.get(&location_key) {
                Some(task) if task.status() == GenerationStatus::Expired => {
                    tracing::debug!(location_key = %location_key, "task expired before starting");
                    return;
                }
                Some(_) => {}
                None => return,
            }
        }

        let started_at = self.0.clock.now();
        {
            let mut tasks = self.0.tasks.lock().await;
            if let Some(task) = tasks.get_mut(&location_key) {
                task.mark_started(started_at);
            }
        }
        self.0.metrics.record_generation_started();
        tracing::info!(location_key = %location_key, "starting generation");

        match self.0.generator.generate(&location_key).await {
            Ok(scene) => {
                let expired_during_generation = {
                    let tasks = self.0.tasks.lock().await;
                    tasks
                        .get(&location_key)
                        .map(|t| t.status() == GenerationStatus::Expired)
                        .unwrap_or(false)
                };
                if expired_during_generation {
                    tracing::info!(location_key = %location_key, "generation completed but task expired");
                    return;
                }

                self.0.cache.put(scene.clone()).await;

                let completed_at = self.0.clock.now();
                let duration_ms = (completed_at - started_at).num_milliseconds() as f64;
                {
                    let mut tasks = self.0.tasks.lock().await;
                    if let Some(task) = tasks.get_mut(&location_key) {
                        task.mark_completed(scene, completed_at);
                    }
                }
                self.0.metrics.record_generation_completed(duration_ms);
                tracing::info!(location_key = %location_key, duration_ms, "generation completed");
            }
            Err(err) => {
                let completed_at = self.0.clock.now();
                {
                    let mut tasks = self.0.tasks.lock().await;
                    if let Some(task) = tasks.get_mut(&location_key) {
                        task.mark_failed(err.to_string(), completed_at);
                    }
                }
                self.0.metrics.record_generation_failed();
                tracing::error!(location_key = %location_key, error = %err, "generation failed");
            }
        }
    }
}
