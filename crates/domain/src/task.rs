//! Background generation task tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::location_key::LocationKey;
use crate::prediction::PredictionReason;
use crate::scene::PreGeneratedScene;

/// Lifecycle state of an [`AnticipationTask`].
///
/// State machine (spec.md §3):
/// `pending -> in_progress -> {completed, failed}`, with `expired`
/// reachable from either `pending` or `in_progress` when the player's
/// location changes out from under the prediction. All four of
/// `completed`, `failed`, `expired`, `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Expired,
    Cancelled,
}

impl GenerationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Expired | Self::Cancelled
        )
    }

    pub fn is_live(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

/// One unit of background speculative generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnticipationTask {
    location_key: LocationKey,
    priority: f64,
    prediction_reason: PredictionReason,

    status: GenerationStatus,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,

    error: Option<String>,
    #[serde(skip)]
    result: Option<PreGeneratedScene>,
}

impl AnticipationTask {
    pub fn new(
        location_key: LocationKey,
        priority: f64,
        prediction_reason: PredictionReason,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            location_key,
            priority,
            prediction_reason,
            status: GenerationStatus::Pending,
            created_at,
            started_at: None,
            completed_at: None,
            error: None,
            result: None,
        }
    }

    pub fn location_key(&self) -> &LocationKey {
        &self.location_key
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn prediction_reason(&self) -> PredictionReason {
        self.prediction_reason
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&PreGeneratedScene> {
        self.result.as_ref()
    }

    pub fn mark_started(&mut self, started_at: DateTime<Utc>) {
        self.status = GenerationStatus::InProgress;
        self.started_at = Some(started_at);
    }

    pub fn mark_completed(&mut self, result: PreGeneratedScene, completed_at: DateTime<Utc>) {
        self.status = GenerationStatus::Completed;
        self.completed_at = Some(completed_at);
        self.result = Some(result);
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, completed_at: DateTime<Utc>) {
        self.status = GenerationStatus::Failed;
        self.completed_at = Some(completed_at);
        self.error = Some(error.into());
    }

    /// Marks the task expired because the player's location changed
    /// before generation could be committed. The eventual result, if
    /// any, is discarded rather than cached.
    pub fn mark_expired(&mut self, completed_at: DateTime<Utc>) {
        self.status = GenerationStatus::Expired;
        self.completed_at = Some(completed_at);
    }

    /// Duration between start and completion, if both are recorded.
    pub fn duration_ms(&self) -> Option<f64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64),
            _ => None,
        }
    }
}
