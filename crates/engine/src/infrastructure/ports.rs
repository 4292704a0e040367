//! Port traits the anticipation subsystem depends on.
//!
//! These are the only abstractions this crate defines. Everything else
//! — cache, predictor, engine, collapse manager — is concrete logic
//! wired against these traits, following the teacher crate's rule that
//! ports exist only at genuine external boundaries (scene generation,
//! game-state reads, visit persistence).

use async_trait::async_trait;

use worldserver_domain::{LocationKey, PreGeneratedScene};

use super::error::{GenerationError, VisitWriteError};

/// External capability that turns a location key into a fully built
/// scene. Implemented by the scene-building subsystem; this crate only
/// ever sees the port. Must be safe to call concurrently from multiple
/// workers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SceneGenerator: Send + Sync {
    async fn generate(&self, location_key: &LocationKey) -> Result<PreGeneratedScene, GenerationError>;
}

/// Synchronous, read-only view of game state that the predictor reads
/// from. Kept deliberately narrow and synchronous — prediction is a
/// pure function over already-loaded state, never an I/O call in its
/// own right (spec.md §6).
#[cfg_attr(test, mockall::automock)]
pub trait GameStateReader: Send + Sync {
    /// Locations directly reachable from `location` via an exit/edge.
    fn exits_from(&self, location: &LocationKey) -> Vec<LocationKey>;

    /// Locations referenced by any active, unfinished quest objective.
    fn active_quest_target_locations(&self) -> Vec<LocationKey>;

    /// Up to `k` locations named in recent dialogue/narration turns,
    /// most recent first.
    fn recently_mentioned_locations(&self, k: usize) -> Vec<LocationKey>;

    /// The player's home location, if one is defined.
    fn player_home_location(&self) -> Option<LocationKey>;

    /// Visit counts for every location visited this session.
    fn visit_counts(&self) -> Vec<(LocationKey, u64)>;

    /// Current location of an NPC, if known.
    fn npc_current_location(&self, npc_key: &str) -> Option<LocationKey>;

    /// Up to `k` NPC keys the player referenced recently, most recent
    /// first.
    fn recently_referenced_npcs(&self, k: usize) -> Vec<String>;
}

/// The one durable side effect the core performs: recording that a
/// location was visited. Exposed as a narrow port rather than a direct
/// store dependency so the collapse manager stays testable without a
/// database (spec.md §9, "Visit bookkeeping coupling").
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationVisitWriter: Send + Sync {
    async fn update_visit(
        &self,
        location_key: &LocationKey,
        turn: u64,
        first_visit: bool,
    ) -> Result<(), VisitWriteError>;
}
