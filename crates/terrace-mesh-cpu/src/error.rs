use terrace_map::{Deferred, GridCoord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// Height data not resident yet; the whole cut is retried later.
    #[error(transparent)]
    Deferred(#[from] Deferred),
    /// A single tile produced unusable geometry.
    #[error("degenerate geometry at tile ({}, {}): {reason}", tile.x, tile.y)]
    Degenerate { tile: GridCoord, reason: String },
    /// A build step broke one of its own invariants. Not recoverable.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

