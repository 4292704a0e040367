//! Anticipation subsystem: predicts where the player is headed next,
//! pre-generates scene content for those locations in the background,
//! and commits it the instant the player actually arrives.
//!
//! [`world_server::WorldServerManager`] is the entry point a host game
//! loop holds onto. Everything it needs from the host — scene
//! generation, game-state reads, visit persistence, the clock — comes
//! in through the traits in [`infrastructure::ports`] and
//! [`infrastructure::clock`].

pub mod infrastructure;
pub mod world_server;

#[cfg(test)]
mod scenarios;
#[cfg(test)]
mod test_support;

pub use infrastructure::clock::{ClockPort, SystemClock};
pub use infrastructure::config::{CacheConfig, EngineConfig, WorldServerConfig};
pub use infrastructure::error::{CollapseError, GenerationError, VisitWriteError};
pub use infrastructure::metrics::SharedMetrics;
pub use infrastructure::ports::{GameStateReader, LocationVisitWriter, SceneGenerator};
pub use world_server::{AnticipationEngine, PreGenerationCache, StateCollapseManager, WorldServerManager};
