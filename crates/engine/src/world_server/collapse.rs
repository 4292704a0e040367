//! Commits pre-generated (or, failing that, synchronously generated)
//! state the moment the player actually observes a location.
//!
//! Grounded on the original `StateCollapseManager`: a cache hit commits
//! instantly ("the wave function collapses"); a miss falls back to
//! generating inline, at the cost of the player waiting.

use std::collections::HashSet;

use tokio::sync::Mutex;

use worldserver_domain::{CollapseResult, LocationKey, NarratorManifest};

use crate::infrastructure::clock::ClockPort;
use crate::infrastructure::error::CollapseError;
use crate::infrastructure::metrics::SharedMetrics;
use crate::infrastructure::ports::{LocationVisitWriter, SceneGenerator};

use super::cache::PreGenerationCache;

/// Commits state when the player observes a location: fast path off
/// the pre-generation cache, slow path generating synchronously.
pub struct StateCollapseManager {
    cache: std::sync::Arc<PreGenerationCache>,
    generator: std::sync::Arc<dyn SceneGenerator>,
    visit_writer: std::sync::Arc<dyn LocationVisitWriter>,
    clock: std::sync::Arc<dyn ClockPort>,
    metrics: SharedMetrics,
    visited: Mutex<HashSet<LocationKey>>,
}

impl StateCollapseManager {
    pub fn new(
        cache: std::sync::Arc<PreGenerationCache>,
        generator: std::sync::Arc<dyn SceneGenerator>,
        visit_writer: std::sync::Arc<dyn LocationVisitWriter>,
        clock: std::sync::Arc<dyn ClockPort>,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            cache,
            generator,
            visit_writer,
            clock,
            metrics,
            visited: Mutex::new(HashSet::new()),
        }
    }

    /// Observe `location_key` on turn `turn`, committing whatever
    /// content applies. This is the subsystem's one entry point that
    /// can be slow (the synchronous-generation fallback); everything
    /// else in this crate is either instant or backgrounded.
    pub async fn collapse_location(
        &self,
        location_key: &LocationKey,
        turn: u64,
    ) -> Result<CollapseResult, CollapseError> {
        let start = self.clock.now();

        match self.cache.get(location_key).await {
            Some(mut scene) => {
                let age_seconds = scene.age_seconds(self.clock.now());
                let reason = scene.prediction_reason();
                scene.mark_committed();

                self.record_visit(location_key, turn).await?;
                self.cache.invalidate(location_key).await;

                let narrator_manifest = NarratorManifest::from_pre_generated(&scene, age_seconds);
                let latency_ms = (self.clock.now() - start).num_milliseconds() as f64;

                tracing::info!(
                    location_key = %location_key,
                    age_seconds,
                    latency_ms,
                    "collapse cache hit"
                );

                Ok(CollapseResult {
                    location_key: location_key.clone(),
                    narrator_manifest,
                    was_pre_generated: true,
                    latency_ms,
                    cache_age_seconds: Some(age_seconds),
                    prediction_reason: reason,
                    generation_time_ms: None,
                })
            }
            None => {
                self.metrics.record_cache_miss();
                tracing::info!(location_key = %location_key, "collapse cache miss, generating synchronously");

                let gen_start = self.clock.now();
                let scene = self.generator.generate(location_key).await?;
                let generation_time_ms = (self.clock.now() - gen_start).num_milliseconds() as f64;

                self.record_visit(location_key, turn).await?;

                let narrator_manifest = NarratorManifest::from_synchronous(&scene);
                let latency_ms = (self.clock.now() - start).num_milliseconds() as f64;

                tracing::info!(
                    location_key = %location_key,
                    generation_time_ms,
                    latency_ms,
                    "collapse synchronous generation"
                );

                Ok(CollapseResult {
                    location_key: location_key.clone(),
                    narrator_manifest,
                    was_pre_generated: false,
                    latency_ms,
                    cache_age_seconds: None,
                    prediction_reason: None,
                    generation_time_ms: Some(generation_time_ms),
                })
            }
        }
    }

    async fn record_visit(&self, location_key: &LocationKey, turn: u64) -> Result<(), CollapseError> {
        let first_visit = self.visited.lock().await.insert(location_key.clone());
        self.visit_writer.update_visit(location_key, turn, first_visit).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::error::{GenerationError, VisitWriteError};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use worldserver_domain::{NewScene, PreGeneratedScene};

    use async_trait::async_trait;
    use chrono::Utc;

    struct FakeGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SceneGenerator for FakeGenerator {
        async fn generate(&self, location_key: &LocationKey) -> Result<PreGeneratedScene, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GenerationError::Failed {
                    location_key: location_key.to_string(),
                    reason: "no budget".to_string(),
                });
            }
            Ok(PreGeneratedScene::new(NewScene {
                location_key: location_key.clone(),
                location_display_name: location_key.to_string(),
                scene_manifest: json!({"synchronous": true}),
                npcs_present: vec![],
                items_present: vec![],
                furniture: vec![],
                atmosphere: json!({}),
                generated_at: Utc::now(),
                generation_time_ms: 1.0,
            }))
        }
    }

    struct RecordingVisitWriter {
        visits: std::sync::Mutex<Vec<(LocationKey, u64, bool)>>,
        fail: bool,
    }

    #[async_trait]
    impl LocationVisitWriter for RecordingVisitWriter {
        async fn update_visit(
            &self,
            location_key: &LocationKey,
            turn: u64,
            first_visit: bool,
        ) -> Result<(), VisitWriteError> {
            if self.fail {
                return Err(VisitWriteError::Failed {
                    location_key: location_key.to_string(),
                    reason: "disk full".to_string(),
                });
            }
            self.visits
                .lock()
                .expect("visits mutex poisoned")
                .push((location_key.clone(), turn, first_visit));
            Ok(())
        }
    }

    fn harness(fail_generate: bool, fail_write: bool) -> (StateCollapseManager, Arc<PreGenerationCache>, Arc<FakeGenerator>, Arc<RecordingVisitWriter>) {
        let clock: Arc<dyn ClockPort> = Arc::new(ManualClock::new(Utc::now()));
        let metrics = SharedMetrics::new();
        let cache = Arc::new(PreGenerationCache::new(10, metrics.clone(), clock.clone()));
        let generator = Arc::new(FakeGenerator {
            calls: AtomicUsize::new(0),
            fail: fail_generate,
        });
        let visit_writer = Arc::new(RecordingVisitWriter {
            visits: std::sync::Mutex::new(Vec::new()),
            fail: fail_write,
        });
        let manager = StateCollapseManager::new(
            cache.clone(),
            generator.clone() as Arc<dyn SceneGenerator>,
            visit_writer.clone() as Arc<dyn LocationVisitWriter>,
            clock,
            metrics,
        );
        (manager, cache, generator, visit_writer)
    }

    #[tokio::test]
    async fn cache_hit_commits_without_generating() {
        let (manager, cache, generator, visit_writer) = harness(false, false);
        let key = LocationKey::new("shrine");
        cache
            .put(PreGeneratedScene::new(NewScene {
                location_key: key.clone(),
                location_display_name: "Shrine".to_string(),
                scene_manifest: json!({"pre_generated": true}),
                npcs_present: vec![],
                items_present: vec![],
                furniture: vec![],
                atmosphere: json!({}),
                generated_at: Utc::now(),
                generation_time_ms: 2.0,
            }))
            .await;

        let result = manager.collapse_location(&key, 1).await.expect("collapse succeeds");

        assert!(result.was_pre_generated);
        assert!(result.narrator_manifest.was_pre_generated);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(visit_writer.visits.lock().expect("poisoned").len(), 1);
        assert!(!cache.contains(&key).await, "consumed scene must leave the cache");
    }

    #[tokio::test]
    async fn cache_miss_generates_synchronously() {
        let (manager, _cache, generator, _visit_writer) = harness(false, false);
        let key = LocationKey::new("collapsed-mine");

        let result = manager.collapse_location(&key, 1).await.expect("collapse succeeds");

        assert!(!result.was_pre_generated);
        assert!(result.generation_time_ms.is_some());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn first_visit_flag_is_true_only_on_the_first_observation() {
        let (manager, _cache, _generator, visit_writer) = harness(false, false);
        let key = LocationKey::new("tavern");

        manager.collapse_location(&key, 1).await.expect("first collapse succeeds");
        manager.collapse_location(&key, 2).await.expect("second collapse succeeds");

        let visits = visit_writer.visits.lock().expect("poisoned");
        assert_eq!(visits[0], (key.clone(), 1, true));
        assert_eq!(visits[1], (key.clone(), 2, false));
    }

    #[tokio::test]
    async fn generation_failure_surfaces_as_collapse_error() {
        let (manager, _cache, _generator, _visit_writer) = harness(true, false);
        let result = manager.collapse_location(&LocationKey::new("nowhere"), 1).await;
        assert!(matches!(result, Err(CollapseError::Generation(_))));
    }

    #[tokio::test]
    async fn visit_write_failure_surfaces_as_collapse_error() {
        let (manager, _cache, _generator, _visit_writer) = harness(false, true);
        let result = manager.collapse_location(&LocationKey::new("nowhere"), 1).await;
        assert!(matches!(result, Err(CollapseError::VisitWrite(_))));
    }
}
