//! Pre-generated, uncommitted scene content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::location_key::LocationKey;
use crate::prediction::PredictionReason;

/// Default time-to-live for a cached scene, in seconds.
pub const DEFAULT_EXPIRY_SECONDS: u64 = 300;

/// A scene generated speculatively, ahead of the player observing it.
///
/// Owned by the cache while uncommitted; ownership transfers exclusively
/// to the collapse manager on consumption, at which point it is dropped
/// from the cache (see invariants in spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreGeneratedScene {
    location_key: LocationKey,
    location_display_name: String,

    /// Opaque structured payload the narrator subsystem interprets; this
    /// crate never inspects its shape beyond what's surfaced below.
    scene_manifest: Value,
    npcs_present: Vec<Value>,
    items_present: Vec<Value>,
    furniture: Vec<Value>,
    atmosphere: Value,

    generated_at: DateTime<Utc>,
    generation_time_ms: f64,
    expiry_seconds: u64,
    is_committed: bool,

    predicted_probability: Option<f64>,
    prediction_reason: Option<PredictionReason>,
}

/// Fields needed to construct a [`PreGeneratedScene`] fresh off a
/// generation call. Kept as its own struct (rather than a long
/// constructor argument list) because the scene-builder port produces
/// all of these at once.
pub struct NewScene {
    pub location_key: LocationKey,
    pub location_display_name: String,
    pub scene_manifest: Value,
    pub npcs_present: Vec<Value>,
    pub items_present: Vec<Value>,
    pub furniture: Vec<Value>,
    pub atmosphere: Value,
    pub generated_at: DateTime<Utc>,
    pub generation_time_ms: f64,
}

impl PreGeneratedScene {
    pub fn new(fields: NewScene) -> Self {
        Self {
            location_key: fields.location_key,
            location_display_name: fields.location_display_name,
            scene_manifest: fields.scene_manifest,
            npcs_present: fields.npcs_present,
            items_present: fields.items_present,
            furniture: fields.furniture,
            atmosphere: fields.atmosphere,
            generated_at: fields.generated_at,
            generation_time_ms: fields.generation_time_ms,
            expiry_seconds: DEFAULT_EXPIRY_SECONDS,
            is_committed: false,
            predicted_probability: None,
            prediction_reason: None,
        }
    }

    pub fn with_expiry_seconds(mut self, expiry_seconds: u64) -> Self {
        self.expiry_seconds = expiry_seconds;
        self
    }

    pub fn with_provenance(mut self, probability: f64, reason: PredictionReason) -> Self {
        self.predicted_probability = Some(probability);
        self.prediction_reason = Some(reason);
        self
    }

    pub fn location_key(&self) -> &LocationKey {
        &self.location_key
    }

    pub fn location_display_name(&self) -> &str {
        &self.location_display_name
    }

    pub fn scene_manifest(&self) -> &Value {
        &self.scene_manifest
    }

    pub fn npcs_present(&self) -> &[Value] {
        &self.npcs_present
    }

    pub fn items_present(&self) -> &[Value] {
        &self.items_present
    }

    pub fn furniture(&self) -> &[Value] {
        &self.furniture
    }

    pub fn atmosphere(&self) -> &Value {
        &self.atmosphere
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn generation_time_ms(&self) -> f64 {
        self.generation_time_ms
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    pub fn is_committed(&self) -> bool {
        self.is_committed
    }

    /// Marks this scene as consumed. Set exactly once, by the collapse
    /// manager, never by the cache.
    pub fn mark_committed(&mut self) {
        self.is_committed = true;
    }

    pub fn predicted_probability(&self) -> Option<f64> {
        self.predicted_probability
    }

    pub fn prediction_reason(&self) -> Option<PredictionReason> {
        self.prediction_reason
    }

    /// Age of this scene relative to `now`, in seconds. Never negative.
    pub fn age_seconds(&self, now: DateTime<Utc>) -> f64 {
        (now - self.generated_at).num_milliseconds().max(0) as f64 / 1000.0
    }

    /// Whether this scene has outlived its TTL, as of `now`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.age_seconds(now) > self.expiry_seconds as f64
    }

    /// Remaining time-to-live in seconds, floored at zero.
    pub fn remaining_ttl_seconds(&self, now: DateTime<Utc>) -> f64 {
        (self.expiry_seconds as f64 - self.age_seconds(now)).max(0.0)
    }
}
