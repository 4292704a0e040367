//! Bounded, TTL-aware, LRU-ordered, concurrency-safe store for
//! pre-generated scenes.
//!
//! Mirrors `wrldbldr-engine::infrastructure::cache::TtlCache` in shape
//! (a lock-guarded map behind an async API) but adds LRU eviction order
//! and eviction-reason classification, which the spec's waste-tracking
//! invariants require.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;

use worldserver_domain::{LocationKey, PreGeneratedScene};

use crate::infrastructure::clock::ClockPort;
use crate::infrastructure::metrics::SharedMetrics;

/// Why an entry left the cache. Drives the wasted-generation
/// classification in spec.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    Stale,
    Lru,
    Invalidated,
    BulkInvalidate,
    Clear,
    CleanupStale,
}

impl EvictReason {
    fn counts_as_wasted(self) -> bool {
        matches!(self, Self::Stale | Self::Lru | Self::CleanupStale)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Stale => "stale",
            Self::Lru => "lru",
            Self::Invalidated => "invalidated",
            Self::BulkInvalidate => "bulk_invalidate",
            Self::Clear => "clear",
            Self::CleanupStale => "cleanup_stale",
        }
    }
}

/// Per-entry diagnostic snapshot, for [`PreGenerationCache::stats`].
#[derive(Debug, Clone)]
pub struct CacheEntryStats {
    pub location_key: LocationKey,
    pub age_seconds: f64,
    pub remaining_ttl_seconds: f64,
    pub is_stale: bool,
    pub is_committed: bool,
    pub prediction_reason: Option<worldserver_domain::PredictionReason>,
}

/// Aggregate + per-entry cache diagnostics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub entries: Vec<CacheEntryStats>,
    pub metrics: worldserver_domain::AnticipationMetrics,
}

struct Inner {
    entries: HashMap<LocationKey, PreGeneratedScene>,
    /// LRU order: front = least recently used, back = most recently used.
    order: VecDeque<LocationKey>,
}

impl Inner {
    fn touch(&mut self, key: &LocationKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.clone());
    }

    fn remove(&mut self, key: &LocationKey) -> Option<PreGeneratedScene> {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.entries.remove(key)
    }
}

/// LRU cache for pre-generated scenes with TTL-based staleness.
///
/// All operations are serialized under a single `tokio::sync::Mutex`,
/// safe for concurrent access from anticipation workers and the game
/// loop (spec.md §4.1).
pub struct PreGenerationCache {
    inner: Mutex<Inner>,
    max_size: usize,
    metrics: SharedMetrics,
    clock: Arc<dyn ClockPort>,
    on_evict: Option<Box<dyn Fn(&PreGeneratedScene) + Send + Sync>>,
}

impl PreGenerationCache {
    pub fn new(max_size: usize, metrics: SharedMetrics, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_size,
            metrics,
            clock,
            on_evict: None,
        }
    }

    /// Attach an eviction callback. Production code can ignore this;
    /// tests use it to observe eviction traffic.
    pub fn with_on_evict(mut self, callback: impl Fn(&PreGeneratedScene) + Send + Sync + 'static) -> Self {
        self.on_evict = Some(Box::new(callback));
        self
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Returns a scene iff present and not stale, consuming it: a fresh
    /// hit removes the entry from the cache so `get` is the single
    /// atomic point where a scene is handed to a caller. Concurrent
    /// callers racing on the same key therefore see at most one hit; a
    /// second caller observes a miss rather than cloning an
    /// already-claimed scene. A stale hit is evicted (reason `stale`)
    /// and reported as `None`.
    pub async fn get(&self, key: &LocationKey) -> Option<PreGeneratedScene> {
        let start = self.clock.now();
        let mut guard = self.inner.lock().await;

        let is_stale = match guard.entries.get(key) {
            Some(scene) => scene.is_stale(self.clock.now()),
            None => {
                tracing::debug!(location_key = %key, "cache miss");
                return None;
            }
        };

        if is_stale {
            tracing::info!(location_key = %key, "cache entry stale, evicting");
            self.evict_locked(&mut guard, key, EvictReason::Stale);
            return None;
        }

        let scene = guard.remove(key);

        let latency_ms = (self.clock.now() - start).num_milliseconds() as f64;
        self.metrics.record_cache_hit(latency_ms);
        tracing::info!(location_key = %key, latency_ms, "cache hit");

        scene
    }

    /// Upsert a scene. If the key exists, replaces it in place and
    /// moves it to MRU without counting an eviction. Otherwise evicts
    /// the LRU entry while at capacity, then inserts at MRU.
    pub async fn put(&self, scene: PreGeneratedScene) {
        let mut guard = self.inner.lock().await;
        let key = scene.location_key().clone();

        if guard.entries.contains_key(&key) {
            guard.entries.insert(key.clone(), scene);
            guard.touch(&key);
            tracing::debug!(location_key = %key, "updated cache entry");
            return;
        }

        while guard.entries.len() >= self.max_size {
            let oldest = match guard.order.front().cloned() {
                Some(k) => k,
                None => break,
            };
            self.evict_locked(&mut guard, &oldest, EvictReason::Lru);
        }

        guard.order.push_back(key.clone());
        let size = guard.entries.len() + 1;
        guard.entries.insert(key.clone(), scene);
        tracing::info!(location_key = %key, size, max_size = self.max_size, "cached scene");
    }

    /// Remove a specific location. Returns whether it was present.
    pub async fn invalidate(&self, key: &LocationKey) -> bool {
        let mut guard = self.inner.lock().await;
        if guard.entries.contains_key(key) {
            self.evict_locked(&mut guard, key, EvictReason::Invalidated);
            true
        } else {
            false
        }
    }

    /// Remove every entry except `keep_key`. Returns the count removed.
    pub async fn invalidate_all_except(&self, keep_key: Option<&LocationKey>) -> usize {
        let mut guard = self.inner.lock().await;
        let to_remove: Vec<LocationKey> = guard
            .entries
            .keys()
            .filter(|k| Some(*k) != keep_key)
            .cloned()
            .collect();

        for key in &to_remove {
            self.evict_locked(&mut guard, key, EvictReason::BulkInvalidate);
        }

        tracing::info!(
            removed = to_remove.len(),
            kept = ?keep_key,
            "bulk invalidation"
        );
        to_remove.len()
    }

    /// Remove every entry. Returns the count removed.
    pub async fn clear(&self) -> usize {
        let mut guard = self.inner.lock().await;
        let keys: Vec<LocationKey> = guard.entries.keys().cloned().collect();
        let count = keys.len();
        for key in &keys {
            self.evict_locked(&mut guard, key, EvictReason::Clear);
        }
        count
    }

    /// Sweep-evict every stale entry. Returns the count removed.
    pub async fn cleanup_stale(&self) -> usize {
        let mut guard = self.inner.lock().await;
        let now = self.clock.now();
        let stale_keys: Vec<LocationKey> = guard
            .entries
            .iter()
            .filter(|(_, scene)| scene.is_stale(now))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &stale_keys {
            self.evict_locked(&mut guard, key, EvictReason::CleanupStale);
        }
        stale_keys.len()
    }

    /// Presence check that does not reorder the LRU list; stale entries
    /// report absent but are left in place (removal only happens via
    /// `get`/`cleanup_stale`).
    pub async fn contains(&self, key: &LocationKey) -> bool {
        let guard = self.inner.lock().await;
        match guard.entries.get(key) {
            Some(scene) => !scene.is_stale(self.clock.now()),
            None => false,
        }
    }

    /// All cached keys, LRU first.
    pub async fn keys(&self) -> Vec<LocationKey> {
        let guard = self.inner.lock().await;
        guard.order.iter().cloned().collect()
    }

    pub async fn stats(&self) -> CacheStats {
        let guard = self.inner.lock().await;
        let now = self.clock.now();
        let entries = guard
            .order
            .iter()
            .filter_map(|key| guard.entries.get(key).map(|scene| (key, scene)))
            .map(|(key, scene)| CacheEntryStats {
                location_key: key.clone(),
                age_seconds: scene.age_seconds(now),
                remaining_ttl_seconds: scene.remaining_ttl_seconds(now),
                is_stale: scene.is_stale(now),
                is_committed: scene.is_committed(),
                prediction_reason: scene.prediction_reason(),
            })
            .collect();

        CacheStats {
            size: guard.entries.len(),
            max_size: self.max_size,
            entries,
            metrics: self.metrics.snapshot(),
        }
    }

    /// Evict a scene. Caller must already hold `inner`'s lock.
    fn evict_locked(&self, guard: &mut Inner, key: &LocationKey, reason: EvictReason) {
        let Some(scene) = guard.remove(key) else {
            return;
        };

        if !scene.is_committed() && reason.counts_as_wasted() {
            self.metrics.record_generation_wasted();
            tracing::debug!(
                location_key = %key,
                reason = reason.as_str(),
                age_seconds = scene.age_seconds(self.clock.now()),
                "wasted generation"
            );
        }

        if let Some(callback) = &self.on_evict {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(&scene)));
            if result.is_err() {
                tracing::error!(location_key = %key, "eviction callback panicked");
            }
        }

        tracing::debug!(location_key = %key, reason = reason.as_str(), "evicted");
    }
}
