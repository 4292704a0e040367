//! Anticipation metrics: monotonic counters plus latency accumulators.
//!
//! All fields are additive and meant to be updated under a single lock
//! (see `worldserver-engine::infrastructure::metrics::SharedMetrics`);
//! this type itself has no synchronization and is the pure value half of
//! that split.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnticipationMetrics {
    pub predictions_made: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub generations_started: u64,
    pub generations_completed: u64,
    pub generations_failed: u64,
    pub generations_expired: u64,
    pub generations_wasted: u64,

    pub total_generation_time_ms: f64,
    pub total_cache_hit_latency_ms: f64,
}

impl AnticipationMetrics {
    pub fn record_prediction(&mut self, count: u64) {
        self.predictions_made += count;
    }

    pub fn record_cache_hit(&mut self, latency_ms: f64) {
        self.cache_hits += 1;
        self.total_cache_hit_latency_ms += latency_ms;
    }

    pub fn record_cache_miss(&mut self) {
        self.cache_misses += 1;
    }

    pub fn record_generation_started(&mut self) {
        self.generations_started += 1;
    }

    pub fn record_generation_completed(&mut self, duration_ms: f64) {
        self.generations_completed += 1;
        self.total_generation_time_ms += duration_ms;
    }

    pub fn record_generation_failed(&mut self) {
        self.generations_failed += 1;
    }

    pub fn record_generation_expired(&mut self) {
        self.generations_expired += 1;
    }

    pub fn record_generation_wasted(&mut self) {
        self.generations_wasted += 1;
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    pub fn waste_rate(&self) -> f64 {
        if self.generations_completed == 0 {
            0.0
        } else {
            self.generations_wasted as f64 / self.generations_completed as f64
        }
    }

    pub fn avg_generation_time_ms(&self) -> f64 {
        if self.generations_completed == 0 {
            0.0
        } else {
            self.total_generation_time_ms / self.generations_completed as f64
        }
    }

    pub fn avg_cache_hit_latency_ms(&self) -> f64 {
        if self.cache_hits == 0 {
            0.0
        } else {
            self.total_cache_hit_latency_ms / self.cache_hits as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_is_zero_with_no_observations() {
        assert_eq!(AnticipationMetrics::default().hit_rate(), 0.0);
    }

    #[test]
    fn hit_rate_computes_correctly() {
        let mut m = AnticipationMetrics::default();
        m.record_cache_hit(10.0);
        m.record_cache_hit(20.0);
        m.record_cache_miss();
        assert!((m.hit_rate() - (2.0 / 3.0)).abs() < 1e-9);
        assert_eq!(m.avg_cache_hit_latency_ms(), 15.0);
    }

    #[test]
    fn waste_rate_computes_against_completed() {
        let mut m = AnticipationMetrics::default();
        m.record_generation_completed(100.0);
        m.record_generation_completed(200.0);
        m.record_generation_wasted();
        assert_eq!(m.waste_rate(), 0.5);
        assert_eq!(m.avg_generation_time_ms(), 150.0);
    }

    #[test]
    fn generations_accounting_never_exceeds_started() {
        let mut m = AnticipationMetrics::default();
        m.record_generation_started();
        m.record_generation_started();
        m.record_generation_completed(1.0);
        m.record_generation_failed();
        assert!(
            m.generations_completed + m.generations_failed + m.generations_expired
                <= m.generations_started
        );
    }
}
