//! The narrator manifest and the result of a state collapse.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::location_key::LocationKey;
use crate::prediction::PredictionReason;
use crate::scene::PreGeneratedScene;

/// The structured payload handed to the narrator subsystem so it knows
/// what entities it is allowed to reference in prose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarratorManifest {
    pub location_key: LocationKey,
    pub location_display_name: String,
    pub npcs: Vec<Value>,
    pub items: Vec<Value>,
    pub furniture: Vec<Value>,
    pub atmosphere: Value,
    pub scene_manifest: Value,
    pub was_pre_generated: bool,
    pub pre_generation_age_seconds: Option<f64>,
}

impl NarratorManifest {
    /// Build from a scene that was consumed off the pre-generation
    /// cache (the fast path).
    pub fn from_pre_generated(scene: &PreGeneratedScene, age_seconds: f64) -> Self {
        Self {
            location_key: scene.location_key().clone(),
            location_display_name: scene.location_display_name().to_string(),
            npcs: scene.npcs_present().to_vec(),
            items: scene.items_present().to_vec(),
            furniture: scene.furniture().to_vec(),
            atmosphere: scene.atmosphere().clone(),
            scene_manifest: scene.scene_manifest().clone(),
            was_pre_generated: true,
            pre_generation_age_seconds: Some(age_seconds),
        }
    }

    /// Build from a scene produced inline by the slow path — same
    /// shape, provenance flag flipped, no pre-generation age.
    pub fn from_synchronous(scene: &PreGeneratedScene) -> Self {
        Self {
            location_key: scene.location_key().clone(),
            location_display_name: scene.location_display_name().to_string(),
            npcs: scene.npcs_present().to_vec(),
            items: scene.items_present().to_vec(),
            furniture: scene.furniture().to_vec(),
            atmosphere: scene.atmosphere().clone(),
            scene_manifest: scene.scene_manifest().clone(),
            was_pre_generated: false,
            pre_generation_age_seconds: None,
        }
    }
}

/// Result of collapsing (observing) a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollapseResult {
    pub location_key: LocationKey,
    pub narrator_manifest: NarratorManifest,
    pub was_pre_generated: bool,
    pub latency_ms: f64,

    /// Populated on the fast path.
    pub cache_age_seconds: Option<f64>,
    pub prediction_reason: Option<PredictionReason>,

    /// Populated on the slow path.
    pub generation_time_ms: Option<f64>,
}
