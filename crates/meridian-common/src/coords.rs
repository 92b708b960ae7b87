//! Coordinate types for grid, chunk, local, and render-space positions.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Tile-grid coordinate (integer address of a tile in the world).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct GridCoord {
    /// X coordinate on the tile grid
    pub x: i32,
    /// Y coordinate on the tile grid
    pub y: i32,
}

impl GridCoord {
    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Converts to the chunk coordinate containing this tile.
    ///
    /// Uses floor division, so negative coordinates map symmetrically:
    /// `(-1, -1)` with chunk size 16 lands in chunk `(-1, -1)`, never `(0, 0)`.
    #[must_use]
    pub const fn to_chunk_coord(self, chunk_size: u32) -> ChunkCoord {
        let size = chunk_size as i32;
        ChunkCoord {
            x: self.x.div_euclid(size),
            y: self.y.div_euclid(size),
        }
    }

    /// Converts to the local coordinate within the containing chunk.
    #[must_use]
    pub const fn to_local_coord(self, chunk_size: u32) -> LocalCoord {
        let size = chunk_size as i32;
        LocalCoord {
            x: self.x.rem_euclid(size) as u16,
            y: self.y.rem_euclid(size) as u16,
        }
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the top-left grid coordinate of this chunk.
    #[must_use]
    pub const fn to_grid_coord(self, chunk_size: u32) -> GridCoord {
        let size = chunk_size as i32;
        GridCoord {
            x: self.x * size,
            y: self.y * size,
        }
    }

    /// Chebyshev distance to another chunk coordinate.
    #[must_use]
    pub const fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        if dx > dy { dx } else { dy }
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Local coordinate within a chunk (0 to chunk_size-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct LocalCoord {
    /// X coordinate within chunk
    pub x: u16,
    /// Y coordinate within chunk
    pub y: u16,
}

impl LocalCoord {
    /// Creates a new local coordinate.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Converts to linear index for array access.
    #[must_use]
    pub const fn to_index(self, chunk_size: u32) -> usize {
        (self.y as usize) * (chunk_size as usize) + (self.x as usize)
    }

    /// Creates from linear index.
    #[must_use]
    pub const fn from_index(index: usize, chunk_size: u32) -> Self {
        let size = chunk_size as usize;
        Self {
            x: (index % size) as u16,
            y: (index / size) as u16,
        }
    }
}

/// Continuous render-space position (isometric projection target).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct WorldPoint {
    /// X position in render space
    pub x: f32,
    /// Y position in render space
    pub y: f32,
}

impl WorldPoint {
    /// Creates a new render-space point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Fractional grid position produced by the inverse isometric projection.
///
/// Callers needing an integer tile address must pick a resolution policy
/// explicitly: placement previews use [`GridPointF::round`] (centers on the
/// closest tile), movement and containment tests use [`GridPointF::floor`].
/// Neither is authoritative; the choice belongs to the call site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct GridPointF {
    /// Fractional X coordinate on the tile grid
    pub x: f32,
    /// Fractional Y coordinate on the tile grid
    pub y: f32,
}

impl GridPointF {
    /// Creates a new fractional grid position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Rounds to the nearest tile address.
    #[must_use]
    pub fn round(self) -> GridCoord {
        GridCoord::new(self.x.round() as i32, self.y.round() as i32)
    }

    /// Floors to the containing tile address.
    #[must_use]
    pub fn floor(self) -> GridCoord {
        GridCoord::new(self.x.floor() as i32, self.y.floor() as i32)
    }
}
