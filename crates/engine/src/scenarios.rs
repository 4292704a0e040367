//! End-to-end scenario tests exercising the cache, predictor,
//! anticipation engine, and collapse manager together, the way a host
//! game loop would drive them.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Notify;

    use worldserver_domain::LocationKey;

    use crate::infrastructure::clock::ClockPort;
    use crate::infrastructure::error::{GenerationError, VisitWriteError};
    use crate::infrastructure::metrics::SharedMetrics;
    use crate::infrastructure::ports::{GameStateReader, LocationVisitWriter, SceneGenerator};
    use crate::test_support::{manual_clock, scene_for};
    use crate::world_server::anticipation::AnticipationEngine;
    use crate::world_server::cache::PreGenerationCache;
    use crate::world_server::collapse::StateCollapseManager;
    use crate::world_server::predictor::LocationPredictor;
    use worldserver_domain::PreGeneratedScene;

    struct StubReader {
        exits: Vec<LocationKey>,
    }

    impl GameStateReader for StubReader {
        fn exits_from(&self, _location: &LocationKey) -> Vec<LocationKey> {
            self.exits.clone()
        }
        fn active_quest_target_locations(&self) -> Vec<LocationKey> {
            vec![]
        }
        fn recently_mentioned_locations(&self, _k: usize) -> Vec<LocationKey> {
            vec![]
        }
        fn player_home_location(&self) -> Option<LocationKey> {
            None
        }
        fn visit_counts(&self) -> Vec<(LocationKey, u64)> {
            vec![]
        }
        fn npc_current_location(&self, _npc_key: &str) -> Option<LocationKey> {
            None
        }
        fn recently_referenced_npcs(&self, _k: usize) -> Vec<String> {
            vec![]
        }
    }

    struct RecordingGenerator {
        calls: std::sync::Mutex<Vec<LocationKey>>,
    }

    #[async_trait]
    impl SceneGenerator for RecordingGenerator {
        async fn generate(&self, location_key: &LocationKey) -> Result<PreGeneratedScene, GenerationError> {
            self.calls.lock().expect("poisoned").push(location_key.clone());
            Ok(scene_for(&location_key.to_string(), Utc::now()))
        }
    }

    /// Blocks on a [`Notify`] for one specific location, so a test can
    /// hold a generation "in flight" until it chooses to release it.
    struct BlockingGenerator {
        blocked_location: LocationKey,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl SceneGenerator for BlockingGenerator {
        async fn generate(&self, location_key: &LocationKey) -> Result<PreGeneratedScene, GenerationError> {
            if location_key == &self.blocked_location {
                self.release.notified().await;
            }
            Ok(scene_for(&location_key.to_string(), Utc::now()))
        }
    }

    struct RecordingVisitWriter {
        visits: std::sync::Mutex<Vec<(LocationKey, u64, bool)>>,
    }

    #[async_trait]
    impl LocationVisitWriter for RecordingVisitWriter {
        async fn update_visit(&self, location_key: &LocationKey, turn: u64, first_visit: bool) -> Result<(), VisitWriteError> {
            self.visits
                .lock()
                .expect("poisoned")
                .push((location_key.clone(), turn, first_visit));
            Ok(())
        }
    }

    /// S1 — cache hit, fast path.
    #[tokio::test]
    async fn s1_cache_hit_fast_path() {
        let clock = manual_clock(Utc::now());
        let metrics = SharedMetrics::new();
        let cache = Arc::new(PreGenerationCache::new(10, metrics.clone(), clock.clone() as Arc<dyn ClockPort>));

        let generated_at = clock.now() - chrono::Duration::seconds(2);
        let scene = scene_for("tavern", generated_at)
            .with_provenance(0.9, worldserver_domain::PredictionReason::Adjacent);
        cache.put(scene).await;

        let generator = Arc::new(RecordingGenerator {
            calls: std::sync::Mutex::new(vec![]),
        });
        let visit_writer = Arc::new(RecordingVisitWriter {
            visits: std::sync::Mutex::new(vec![]),
        });

        let collapse = StateCollapseManager::new(
            cache.clone(),
            generator.clone() as Arc<dyn SceneGenerator>,
            visit_writer.clone() as Arc<dyn LocationVisitWriter>,
            clock.clone() as Arc<dyn ClockPort>,
            metrics.clone(),
        );

        let result = collapse
            .collapse_location(&LocationKey::new("tavern"), 5)
            .await
            .expect("collapse succeeds");

        assert!(result.was_pre_generated);
        assert!((result.cache_age_seconds.expect("age present") - 2.0).abs() < 0.1);
        assert_eq!(result.prediction_reason, Some(worldserver_domain::PredictionReason::Adjacent));
        assert!(result.narrator_manifest.was_pre_generated);
        assert!(!cache.contains(&LocationKey::new("tavern")).await);
        assert_eq!(generator.calls.lock().expect("poisoned").len(), 0);

        let visits = visit_writer.visits.lock().expect("poisoned");
        assert_eq!(visits.as_slice(), [(LocationKey::new("tavern"), 5, true)]);
    }

    /// S2 — cache miss, slow path.
    #[tokio::test]
    async fn s2_cache_miss_slow_path() {
        let clock = manual_clock(Utc::now());
        let metrics = SharedMetrics::new();
        let cache = Arc::new(PreGenerationCache::new(10, metrics.clone(), clock.clone() as Arc<dyn ClockPort>));

        let clock_for_generator = clock.clone();
        struct DelayedGenerator {
            clock: Arc<crate::infrastructure::clock::ManualClock>,
        }
        #[async_trait]
        impl SceneGenerator for DelayedGenerator {
            async fn generate(&self, location_key: &LocationKey) -> Result<PreGeneratedScene, GenerationError> {
                self.clock.advance(chrono::Duration::milliseconds(60));
                Ok(scene_for(&location_key.to_string(), self.clock.now()))
            }
        }
        let generator = Arc::new(DelayedGenerator { clock: clock_for_generator });
        let visit_writer = Arc::new(RecordingVisitWriter {
            visits: std::sync::Mutex::new(vec![]),
        });

        let collapse = StateCollapseManager::new(
            cache.clone(),
            generator as Arc<dyn SceneGenerator>,
            visit_writer.clone() as Arc<dyn LocationVisitWriter>,
            clock.clone() as Arc<dyn ClockPort>,
            metrics.clone(),
        );

        let result = collapse
            .collapse_location(&LocationKey::new("ruins"), 1)
            .await
            .expect("collapse succeeds");

        assert!(!result.was_pre_generated);
        assert!((result.generation_time_ms.expect("generation time present") - 60.0).abs() < 0.1);
        assert_eq!(metrics.snapshot().cache_misses, 1);

        let visits = visit_writer.visits.lock().expect("poisoned");
        assert_eq!(visits.as_slice(), [(LocationKey::new("ruins"), 1, true)]);
    }

    /// S3 — stale scene behaves as a cache miss, plus the stale entry
    /// is evicted as wasted.
    #[tokio::test]
    async fn s3_stale_scene_falls_back_and_counts_as_wasted() {
        let clock = manual_clock(Utc::now());
        let metrics = SharedMetrics::new();
        let cache = Arc::new(PreGenerationCache::new(10, metrics.clone(), clock.clone() as Arc<dyn ClockPort>));

        let generated_at = clock.now();
        cache.put(scene_for("tavern", generated_at)).await;
        clock.advance(chrono::Duration::seconds(400));

        let generator = Arc::new(RecordingGenerator {
            calls: std::sync::Mutex::new(vec![]),
        });
        let visit_writer = Arc::new(RecordingVisitWriter {
            visits: std::sync::Mutex::new(vec![]),
        });

        let collapse = StateCollapseManager::new(
            cache.clone(),
            generator.clone() as Arc<dyn SceneGenerator>,
            visit_writer as Arc<dyn LocationVisitWriter>,
            clock.clone() as Arc<dyn ClockPort>,
            metrics.clone(),
        );

        let result = collapse
            .collapse_location(&LocationKey::new("tavern"), 2)
            .await
            .expect("collapse succeeds");

        assert!(!result.was_pre_generated);
        assert_eq!(generator.calls.lock().expect("poisoned").len(), 1);
        assert_eq!(metrics.snapshot().generations_wasted, 1);
    }

    /// S4 — LRU eviction classifies waste correctly.
    #[tokio::test]
    async fn s4_lru_eviction_classifies_waste() {
        let clock = manual_clock(Utc::now());
        let metrics = SharedMetrics::new();
        let cache = PreGenerationCache::new(2, metrics.clone(), clock.clone() as Arc<dyn ClockPort>);

        cache.put(scene_for("loc1", clock.now())).await;
        cache.put(scene_for("loc2", clock.now())).await;
        cache.put(scene_for("loc3", clock.now())).await;

        assert!(!cache.contains(&LocationKey::new("loc1")).await);
        assert!(cache.contains(&LocationKey::new("loc2")).await);
        assert!(cache.contains(&LocationKey::new("loc3")).await);
        assert_eq!(metrics.snapshot().generations_wasted, 1);
    }

    /// S5 — on_location_change invalidates and filters in-flight tasks.
    #[tokio::test]
    async fn s5_on_location_change_invalidates_and_expires() {
        let clock = manual_clock(Utc::now());
        let metrics = SharedMetrics::new();
        let cache = Arc::new(PreGenerationCache::new(10, metrics.clone(), clock.clone() as Arc<dyn ClockPort>));

        cache.put(scene_for("tavern", clock.now())).await;
        cache.put(scene_for("market", clock.now())).await;

        let release = Arc::new(Notify::new());
        let generator = Arc::new(BlockingGenerator {
            blocked_location: LocationKey::new("forest"),
            release: release.clone(),
        });
        let reader = Arc::new(StubReader {
            exits: vec![LocationKey::new("forest")],
        });

        let engine = AnticipationEngine::new(
            cache.clone(),
            LocationPredictor::new(reader),
            generator as Arc<dyn SceneGenerator>,
            clock.clone() as Arc<dyn ClockPort>,
            metrics.clone(),
            2,
            Duration::from_secs(60),
            3,
        );

        engine.start(LocationKey::new("home")).await;
        // Let the spawned cycle reach the blocked generate() call.
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        clock.advance(chrono::Duration::milliseconds(50));

        engine.on_location_change(LocationKey::new("tavern")).await;

        assert!(engine.cache().contains(&LocationKey::new("tavern")).await);
        assert!(!engine.cache().contains(&LocationKey::new("market")).await);

        let status = engine.status().await;
        assert_eq!(status.tasks_by_status.get("expired").copied().unwrap_or(0), 1);

        release.notify_one();
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.generations_expired, 1);
        assert_eq!(snap.generations_completed, 0);

        engine.stop().await;
    }

    /// S6 — prediction dedup: an already-cached prediction is not
    /// regenerated.
    #[tokio::test]
    async fn s6_prediction_dedup_skips_cached_location() {
        let clock = manual_clock(Utc::now());
        let metrics = SharedMetrics::new();
        let cache = Arc::new(PreGenerationCache::new(10, metrics.clone(), clock.clone() as Arc<dyn ClockPort>));
        cache.put(scene_for("tavern", clock.now())).await;

        let generator = Arc::new(RecordingGenerator {
            calls: std::sync::Mutex::new(vec![]),
        });
        let reader = Arc::new(StubReader {
            exits: vec![LocationKey::new("tavern"), LocationKey::new("market")],
        });

        let engine = AnticipationEngine::new(
            cache.clone(),
            LocationPredictor::new(reader),
            generator.clone() as Arc<dyn SceneGenerator>,
            clock.clone() as Arc<dyn ClockPort>,
            metrics.clone(),
            2,
            Duration::from_secs(60),
            3,
        );

        engine.start(LocationKey::new("home")).await;
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        engine.stop().await;

        let calls = generator.calls.lock().expect("poisoned");
        assert_eq!(calls.as_slice(), [LocationKey::new("market")]);
    }
}
