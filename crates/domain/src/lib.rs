//! # World Server Domain
//!
//! Pure data types for the anticipation subsystem: location identity,
//! ranked predictions, speculative scenes, background task tracking,
//! metrics, and the narrator-facing collapse result.
//!
//! No I/O, no async, no side effects — ports and orchestration live in
//! `worldserver-engine`.

extern crate self as worldserver_domain;

mod collapse;
mod error;
mod location_key;
mod metrics;
mod prediction;
mod scene;
mod task;

pub use collapse::{CollapseResult, NarratorManifest};
pub use error::PredictionError;
pub use location_key::LocationKey;
pub use metrics::AnticipationMetrics;
pub use prediction::{LocationPrediction, PredictionReason};
pub use scene::{NewScene, PreGeneratedScene, DEFAULT_EXPIRY_SECONDS};
pub use task::{AnticipationTask, GenerationStatus};
