//! Error types for world operations.

use meridian_common::{ChunkCoord, WorldId};
use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;

/// Top-level error type for world operations.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Persistence failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A chunk coordinate violates the configured world limits
    #[error("Chunk {coord} is outside the world limits")]
    OutsideLimits {
        /// Offending chunk coordinate
        coord: ChunkCoord,
    },

    /// No persisted state exists for the world
    #[error("World not found: {0}")]
    WorldNotFound(WorldId),
}

/// Result type alias for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
