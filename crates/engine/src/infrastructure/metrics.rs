//! Shared, lock-guarded handle to [`AnticipationMetrics`].
//!
//! Metrics are mutated from the cache, the anticipation engine, and the
//! collapse manager, all potentially concurrently; a single mutex keeps
//! every update atomic without requiring per-counter atomics.

use std::sync::{Arc, Mutex};

use worldserver_domain::AnticipationMetrics;

#[derive(Clone, Default)]
pub struct SharedMetrics(Arc<Mutex<AnticipationMetrics>>);

impl SharedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> AnticipationMetrics {
        self.0.lock().expect("metrics mutex poisoned").clone()
    }

    pub fn record_prediction(&self, count: u64) {
        self.0.lock().expect("metrics mutex poisoned").record_prediction(count);
    }

    pub fn record_cache_hit(&self, latency_ms: f64) {
        self.0.lock().expect("metrics mutex poisoned").record_cache_hit(latency_ms);
    }

    pub fn record_cache_miss(&self) {
        self.0.lock().expect("metrics mutex poisoned").record_cache_miss();
    }

    pub fn record_generation_started(&self) {
        self.0
            .lock()
            .expect("metrics mutex poisoned")
            .record_generation_started();
    }

    pub fn record_generation_completed(&self, duration_ms: f64) {
        self.0
            .lock()
            .expect("metrics mutex poisoned")
            .record_generation_completed(duration_ms);
    }

    pub fn record_generation_failed(&self) {
        self.0
            .lock()
            .expect("metrics mutex poisoned")
            .record_generation_failed();
    }

    pub fn record_generation_expired(&self) {
        self.0
            .lock()
            .expect("metrics mutex poisoned")
            .record_generation_expired();
    }

    pub fn record_generation_wasted(&self) {
        self.0
            .lock()
            .expect("metrics mutex poisoned")
            .record_generation_wasted();
    }
}
