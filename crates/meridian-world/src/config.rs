//! World subsystem configuration.

use std::time::Duration;

use meridian_common::WorldLimits;
use serde::{Deserialize, Serialize};

/// Configuration for the world subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Chunk edge length in tiles
    pub chunk_size: u32,
    /// Max Chebyshev distance (chunks) within which a chunk must be resident
    pub load_distance: u32,
    /// Chebyshev distance beyond which a resident chunk is evicted
    pub unload_distance: u32,
    /// Inner subset of the load radius serviced first on each tick.
    ///
    /// Ordering only: every chunk within `load_distance` is still loaded or
    /// generated on the same tick. The tick walks the desired set
    /// nearest-first, so chunks inside this radius are made resident before
    /// the outer ring regardless of this value.
    pub generate_distance: u32,
    /// Whether chunks are persisted at all; when false, eviction discards
    pub persist_chunks: bool,
    /// Whether dirty chunks are saved on a wall-clock interval
    pub auto_save: bool,
    /// Auto-save interval
    pub auto_save_interval: Duration,
    /// Tile diamond width in render-space units
    pub tile_width: f32,
    /// Tile diamond height in render-space units
    pub tile_height: f32,
    /// Optional bounds on the chunk grid; `None` per axis means unbounded
    pub world_limits: WorldLimits,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            load_distance: 2,
            unload_distance: 3,
            generate_distance: 1,
            persist_chunks: true,
            auto_save: true,
            auto_save_interval: Duration::from_secs(60),
            tile_width: 64.0,
            tile_height: 32.0,
            world_limits: WorldLimits::UNBOUNDED,
        }
    }
}

impl WorldConfig {
    /// Validates the distance ordering and chunk size.
    ///
    /// Requires `unload_distance >= load_distance >= generate_distance` so a
    /// chunk is never simultaneously wanted and evicted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.unload_distance < self.load_distance
            || self.load_distance < self.generate_distance
        {
            return Err(ConfigError::DistanceOrdering {
                generate: self.generate_distance,
                load: self.load_distance,
                unload: self.unload_distance,
            });
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Chunk size must be positive
    #[error("chunk_size must be positive")]
    ZeroChunkSize,
    /// Distances must satisfy unload >= load >= generate
    #[error(
        "distance thresholds must satisfy unload >= load >= generate \
         (got generate={generate}, load={load}, unload={unload})"
    )]
    DistanceOrdering {
        /// Configured generate distance
        generate: u32,
        /// Configured load distance
        load: u32,
        /// Configured unload distance
        unload: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(WorldConfig::default().validate().is_ok());
    }

    #[test]
    fn test_distance_ordering_enforced() {
        let config = WorldConfig {
            load_distance: 4,
            unload_distance: 3,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = WorldConfig {
            generate_distance: 3,
            load_distance: 2,
            unload_distance: 5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = WorldConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroChunkSize)));
    }
}
