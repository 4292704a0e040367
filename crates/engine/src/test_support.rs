//! Test-only builders and fakes shared across this crate's unit and
//! scenario tests. Not part of the public API; gated out of release
//! builds entirely.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use worldserver_domain::{LocationPrediction, NewScene, PredictionReason, PreGeneratedScene};

use crate::infrastructure::clock::ManualClock;

pub use crate::infrastructure::ports::{MockGameStateReader, MockLocationVisitWriter, MockSceneGenerator};

/// A minimal, otherwise-empty scene for a location, generated at `now`.
pub fn scene_for(location_key: &str, now: DateTime<Utc>) -> PreGeneratedScene {
    PreGeneratedScene::new(NewScene {
        location_key: location_key.into(),
        location_display_name: location_key.to_string(),
        scene_manifest: json!({}),
        npcs_present: vec![],
        items_present: vec![],
        furniture: vec![],
        atmosphere: json!({}),
        generated_at: now,
        generation_time_ms: 5.0,
    })
}

pub fn prediction(location_key: &str, probability: f64, reason: PredictionReason) -> LocationPrediction {
    LocationPrediction::new(location_key.into(), probability, reason)
        .expect("test fixture probability is always in range")
}

pub fn manual_clock(start: DateTime<Utc>) -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start))
}
