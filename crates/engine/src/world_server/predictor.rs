//! Pure, synchronous prediction of the player's likely next location.

use std::collections::HashMap;
use std::sync::Arc;

use worldserver_domain::{LocationKey, LocationPrediction, PredictionReason};

use crate::infrastructure::ports::GameStateReader;

/// Default cap on predictions returned per cycle (spec.md §4.2).
pub const DEFAULT_MAX_PREDICTIONS: usize = 3;

// Base weights. Order here matches the ranking intent in spec.md §4.2;
// exact values are tunable but must preserve that intent.
const WEIGHT_ADJACENT: f64 = 0.9;
const WEIGHT_QUEST_TARGET: f64 = 0.8;
const WEIGHT_MENTIONED: f64 = 0.6;
const WEIGHT_HOME: f64 = 0.5;
const WEIGHT_FREQUENT: f64 = 0.4;
const WEIGHT_NPC_LOCATION: f64 = 0.3;

/// How many of the top frequently-visited locations to consider.
const FREQUENT_TOP_K: usize = 3;
/// How many recently mentioned locations / NPCs to consider.
const RECENT_WINDOW: usize = 5;

struct Candidate {
    weight: f64,
    reason: PredictionReason,
    detail: Option<String>,
}

/// Ranks likely next locations from topology, quest state, and recent
/// context. Pure and synchronous — an unknown `current_location` simply
/// yields no adjacency candidates, not an error (spec.md §4.2).
pub struct LocationPredictor {
    reader: Arc<dyn GameStateReader>,
}

impl LocationPredictor {
    pub fn new(reader: Arc<dyn GameStateReader>) -> Self {
        Self { reader }
    }

    /// Predict up to `max_n` likely next locations for `current_location`.
    ///
    /// `recent_actions` is accepted for parity with the port surface but
    /// the concrete "recently mentioned" signal is sourced from
    /// `GameStateReader::recently_mentioned_locations`, which already
    /// reflects recent narration; `recent_actions` is reserved for
    /// hosts that want to bias ranking from raw player input and is
    /// otherwise unused here.
    pub fn predict(
        &self,
        current_location: &LocationKey,
        _recent_actions: Option<&[String]>,
        max_n: usize,
    ) -> Vec<LocationPrediction> {
        let mut candidates: HashMap<LocationKey, Candidate> = HashMap::new();

        let mut consider = |key: LocationKey, weight: f64, reason: PredictionReason, detail: Option<String>| {
            if &key == current_location {
                return;
            }
            match candidates.get(&key) {
                Some(existing) if existing.weight >= weight => {}
                _ => {
                    candidates.insert(key, Candidate { weight, reason, detail });
                }
            }
        };

        for adjacent in self.reader.exits_from(current_location) {
            consider(adjacent, WEIGHT_ADJACENT, PredictionReason::Adjacent, None);
        }

        for target in self.reader.active_quest_target_locations() {
            consider(
                target,
                WEIGHT_QUEST_TARGET,
                PredictionReason::QuestTarget,
                Some("active quest objective".to_string()),
            );
        }

        for mentioned in self
            .reader
            .recently_mentioned_locations(RECENT_WINDOW)
        {
            consider(
                mentioned,
                WEIGHT_MENTIONED,
                PredictionReason::Mentioned,
                Some("mentioned in recent narration".to_string()),
            );
        }

        if let Some(home) = self.reader.player_home_location() {
            consider(home, WEIGHT_HOME, PredictionReason::Home, Some("player home".to_string()));
        }

        let mut visits = self.reader.visit_counts();
        visits.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let max_visits = visits.first().map(|(_, count)| *count).unwrap_or(0).max(1);
        for (key, count) in visits.into_iter().take(FREQUENT_TOP_K) {
            let weight = WEIGHT_FREQUENT * (count as f64 / max_visits as f64);
            consider(
                key,
                weight,
                PredictionReason::Frequent,
                Some(format!("visited {count} times this session")),
            );
        }

        for npc in self.reader.recently_referenced_npcs(RECENT_WINDOW) {
            if let Some(location) = self.reader.npc_current_location(&npc) {
                consider(
                    location,
                    WEIGHT_NPC_LOCATION,
                    PredictionReason::NpcLocation,
                    Some(format!("location of {npc}")),
                );
            }
        }

        let max_weight = candidates
            .values()
            .map(|c| c.weight)
            .fold(0.0_f64, f64::max);
        let scale = if max_weight > 1.0 { 1.0 / max_weight } else { 1.0 };

        let mut ranked: Vec<LocationPrediction> = candidates
            .into_iter()
            .map(|(key, candidate)| {
                let probability = (candidate.weight * scale).clamp(0.0, 1.0);
                let prediction = LocationPrediction::new(key, probability, candidate.reason)
                    .expect("predictor-computed probability is always within [0.0, 1.0]");
                match candidate.detail {
                    Some(detail) => prediction.with_detail(detail),
                    None => prediction,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.probability()
                .partial_cmp(&a.probability())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.reason().tie_break_rank().cmp(&b.reason().tie_break_rank()))
                .then_with(|| a.location_key().cmp(b.location_key()))
        });
        ranked.truncate(max_n);
        ranked
    }
}
