//! Location predictions — ranked candidates for the player's next
//! destination, produced by the predictor and consumed by the
//! anticipation engine.

use serde::{Deserialize, Serialize};

use crate::error::PredictionError;
use crate::location_key::LocationKey;

/// Why a location was ranked as a likely destination.
///
/// Order here doubles as the tie-break order used by the predictor when
/// two candidates land at the same probability (§4.2 of the spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionReason {
    Adjacent,
    QuestTarget,
    Mentioned,
    Home,
    Frequent,
    NpcLocation,
}

impl PredictionReason {
    /// Lower is higher priority in tie-breaks.
    pub fn tie_break_rank(self) -> u8 {
        match self {
            Self::Adjacent => 0,
            Self::QuestTarget => 1,
            Self::Mentioned => 2,
            Self::Home => 3,
            Self::Frequent => 4,
            Self::NpcLocation => 5,
        }
    }
}

/// A predicted next location with probability and provenance.
///
/// Immutable after construction: probability is validated once, at the
/// boundary, so nothing downstream needs to re-check it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPrediction {
    location_key: LocationKey,
    probability: f64,
    reason: PredictionReason,
    reason_detail: Option<String>,
}

impl LocationPrediction {
    /// Construct a prediction, validating that `probability` is within
    /// `[0.0, 1.0]`.
    pub fn new(
        location_key: LocationKey,
        probability: f64,
        reason: PredictionReason,
    ) -> Result<Self, PredictionError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(PredictionError::ProbabilityOutOfRange(probability));
        }
        Ok(Self {
            location_key,
            probability,
            reason,
            reason_detail: None,
        })
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.reason_detail = Some(detail.into());
        self
    }

    pub fn location_key(&self) -> &LocationKey {
        &self.location_key
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn reason(&self) -> PredictionReason {
        self.reason
    }

    pub fn reason_detail(&self) -> Option<&str> {
        self.reason_detail.as_deref()
    }
}
