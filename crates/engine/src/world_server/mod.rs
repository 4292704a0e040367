//! The anticipation subsystem's concrete business logic: cache,
//! predictor, background engine, collapse manager, and the facade that
//! wires them together for a host.

pub mod anticipation;
pub mod cache;
pub mod collapse;
pub mod manager;
pub mod predictor;

pub use anticipation::{AnticipationEngine, EngineStatus};
pub use cache::{CacheEntryStats, CacheStats, EvictReason, PreGenerationCache};
pub use collapse::StateCollapseManager;
pub use manager::{WorldServerManager, WorldServerStats};
pub use predictor::{LocationPredictor, DEFAULT_MAX_PREDICTIONS};
