//! Domain-level error types.
//!
//! These are construction-time validation errors, not infrastructure
//! failures — see `worldserver-engine`'s `infrastructure::error` for the
//! boundary errors the engine raises against its ports.

use thiserror::Error;

/// Raised when a [`crate::LocationPrediction`] is constructed with an
/// out-of-range probability. This is a programmer error: the caller
/// controls the probability it passes in.
#[derive(Debug, Error, PartialEq)]
pub enum PredictionError {
    #[error("probability must be within [0.0, 1.0], got {0}")]
    ProbabilityOutOfRange(f64),
}
