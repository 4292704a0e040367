//! Boundary error types for the ports this crate depends on.

use thiserror::Error;

/// Raised by a [`crate::infrastructure::ports::SceneGenerator`] when a
/// scene cannot be produced. The core never inspects the cause beyond
/// logging it — scene generation is treated as an opaque operation
/// that may fail.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("scene generation failed for {location_key}: {reason}")]
    Failed { location_key: String, reason: String },
}

/// Raised by a [`crate::infrastructure::ports::LocationVisitWriter`].
#[derive(Debug, Error)]
pub enum VisitWriteError {
    #[error("failed to record visit for {location_key}: {reason}")]
    Failed { location_key: String, reason: String },
}

/// Error returned by [`crate::world_server::collapse::StateCollapseManager::collapse`].
///
/// This is the one error in the whole subsystem that propagates to the
/// host: the fast path never fails (a cache miss just falls through to
/// the slow path), and the slow path's only failure mode is generation
/// itself failing, which is a hard error per spec.md §7.
#[derive(Debug, Error)]
pub enum CollapseError {
    #[error("synchronous generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("failed to persist visit: {0}")]
    VisitWrite(#[from] VisitWriteError),
}
