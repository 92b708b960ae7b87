//! The generator seam.
//!
//! Terrain algorithms are external to this subsystem; the lifecycle manager
//! consumes a generator as an opaque callable. A deterministic noise-based
//! implementation is provided so unedited chunks can be regenerated from the
//! stored world seed instead of being persisted.

use meridian_common::ChunkCoord;
use noise::{NoiseFn, Perlin};

use crate::tile::{TerrainKind, Tile};

/// Fills a new chunk with tile data.
///
/// Must be deterministic per `(coord, seed)`: eviction relies on regenerating
/// unedited chunks bit-identically from the world seed.
pub trait ChunkGenerator: Send + Sync {
    /// Produces exactly `size * size` tiles in row-major order.
    fn generate(&self, coord: ChunkCoord, size: u32, seed: u64) -> Vec<Tile>;
}

impl<F> ChunkGenerator for F
where
    F: Fn(ChunkCoord, u32, u64) -> Vec<Tile> + Send + Sync,
{
    fn generate(&self, coord: ChunkCoord, size: u32, seed: u64) -> Vec<Tile> {
        self(coord, size, seed)
    }
}

/// Deterministic Perlin-noise terrain fill.
#[derive(Debug, Clone)]
pub struct SeededGenerator {
    /// Terrain scale (larger = smoother)
    pub terrain_scale: f64,
    /// Elevation units spanned by the full noise range
    pub elevation_scale: f64,
}

impl Default for SeededGenerator {
    fn default() -> Self {
        Self {
            terrain_scale: 100.0,
            elevation_scale: 50.0,
        }
    }
}

impl SeededGenerator {
    /// Converts a normalized height (0-1) to terrain.
    fn height_to_terrain(height: f64) -> TerrainKind {
        match height {
            h if h < 0.3 => TerrainKind::Water,
            h if h < 0.35 => TerrainKind::Sand,
            h if h < 0.6 => TerrainKind::Grass,
            h if h < 0.7 => TerrainKind::Dirt,
            h if h < 0.85 => TerrainKind::Stone,
            _ => TerrainKind::Snow,
        }
    }
}

impl ChunkGenerator for SeededGenerator {
    fn generate(&self, coord: ChunkCoord, size: u32, seed: u64) -> Vec<Tile> {
        let noise_seed = (seed ^ (seed >> 32)) as u32;
        let terrain_noise = Perlin::new(noise_seed);
        let detail_noise = Perlin::new(noise_seed.wrapping_add(1));

        let origin_x = f64::from(coord.x) * f64::from(size);
        let origin_y = f64::from(coord.y) * f64::from(size);

        let mut tiles = Vec::with_capacity((size * size) as usize);
        for y in 0..size {
            for x in 0..size {
                let wx = (origin_x + f64::from(x)) / self.terrain_scale;
                let wy = (origin_y + f64::from(y)) / self.terrain_scale;

                let height = terrain_noise.get([wx, wy]);
                let detail = detail_noise.get([wx * 4.0, wy * 4.0]) * 0.1;
                let combined = (height + detail + 1.0) / 2.0;

                let terrain = Self::height_to_terrain(combined);
                let elevation = (combined * self.elevation_scale) as i16;
                tiles.push(Tile::new(terrain, elevation));
            }
        }
        tiles
    }
}
