//! The isometric coordinate transform.
//!
//! Pure conversions between the integer tile grid, continuous isometric
//! render space, and the chunk grid partitioning the world. Stateless beyond
//! fixed configuration; none of these conversions can fail.

use serde::{Deserialize, Serialize};

use crate::coords::{ChunkCoord, GridCoord, GridPointF, LocalCoord, WorldPoint};

/// Optional per-axis bounds on the chunk grid. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldLimits {
    /// Minimum chunk X coordinate, inclusive
    pub min_x: Option<i32>,
    /// Maximum chunk X coordinate, inclusive
    pub max_x: Option<i32>,
    /// Minimum chunk Y coordinate, inclusive
    pub min_y: Option<i32>,
    /// Maximum chunk Y coordinate, inclusive
    pub max_y: Option<i32>,
}

impl WorldLimits {
    /// Unbounded on every axis.
    pub const UNBOUNDED: Self = Self {
        min_x: None,
        max_x: None,
        min_y: None,
        max_y: None,
    };

    /// Returns whether the chunk coordinate violates any configured limit.
    #[must_use]
    pub fn excludes(&self, coord: ChunkCoord) -> bool {
        if self.min_x.is_some_and(|min| coord.x < min) {
            return true;
        }
        if self.max_x.is_some_and(|max| coord.x > max) {
            return true;
        }
        if self.min_y.is_some_and(|min| coord.y < min) {
            return true;
        }
        self.max_y.is_some_and(|max| coord.y > max)
    }
}

/// Fixed-configuration transform between grid, render, and chunk space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTransform {
    /// Tile diamond width in render-space units
    pub tile_width: f32,
    /// Tile diamond height in render-space units
    pub tile_height: f32,
    /// Chunk edge length in tiles
    pub chunk_size: u32,
    /// Optional world bounds on the chunk grid
    pub limits: WorldLimits,
}

impl CoordinateTransform {
    /// Creates a new transform.
    #[must_use]
    pub const fn new(
        tile_width: f32,
        tile_height: f32,
        chunk_size: u32,
        limits: WorldLimits,
    ) -> Self {
        Self {
            tile_width,
            tile_height,
            chunk_size,
            limits,
        }
    }

    /// Projects a tile address into isometric render space.
    ///
    /// `iso_x = (gx - gy) * w/2`, `iso_y = (gx + gy) * h/2`. Exact inverse of
    /// [`CoordinateTransform::world_to_grid`] up to floating-point rounding.
    #[must_use]
    pub fn grid_to_world(&self, grid: GridCoord) -> WorldPoint {
        let gx = grid.x as f32;
        let gy = grid.y as f32;
        WorldPoint::new(
            (gx - gy) * (self.tile_width * 0.5),
            (gx + gy) * (self.tile_height * 0.5),
        )
    }

    /// Unprojects a render-space position to a fractional grid position.
    ///
    /// Integer tile addresses are obtained via [`GridPointF::round`] or
    /// [`GridPointF::floor`], chosen per call site.
    #[must_use]
    pub fn world_to_grid(&self, world: WorldPoint) -> GridPointF {
        let a = world.x / (self.tile_width * 0.5);
        let b = world.y / (self.tile_height * 0.5);
        GridPointF::new((a + b) * 0.5, (b - a) * 0.5)
    }

    /// Returns the chunk coordinate containing a tile address.
    #[must_use]
    pub const fn grid_to_chunk(&self, grid: GridCoord) -> ChunkCoord {
        grid.to_chunk_coord(self.chunk_size)
    }

    /// Returns the top-left tile address of a chunk. Left-inverse of
    /// [`CoordinateTransform::grid_to_chunk`].
    #[must_use]
    pub const fn chunk_to_grid(&self, chunk: ChunkCoord) -> GridCoord {
        chunk.to_grid_coord(self.chunk_size)
    }

    /// Returns the local coordinate of a tile within its chunk.
    #[must_use]
    pub const fn grid_to_local(&self, grid: GridCoord) -> LocalCoord {
        grid.to_local_coord(self.chunk_size)
    }

    /// Returns whether the chunk violates any configured world limit.
    /// Excluded chunks are never generated or loaded.
    #[must_use]
    pub fn chunk_outside_limits(&self, chunk: ChunkCoord) -> bool {
        self.limits.excludes(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn transform() -> CoordinateTransform {
        CoordinateTransform::new(64.0, 32.0, 16, WorldLimits::UNBOUNDED)
    }

    #[test]
    fn test_iso_projection() {
        let t = transform();
        assert_eq!(t.grid_to_world(GridCoord::new(0, 0)), WorldPoint::new(0.0, 0.0));
        // One step east on the grid moves half a tile right and down.
        assert_eq!(t.grid_to_world(GridCoord::new(1, 0)), WorldPoint::new(32.0, 16.0));
        // One step south mirrors it to the left.
        assert_eq!(t.grid_to_world(GridCoord::new(0, 1)), WorldPoint::new(-32.0, 16.0));
        assert_eq!(t.grid_to_world(GridCoord::new(1, 1)), WorldPoint::new(0.0, 32.0));
    }

    #[test]
    fn test_world_to_grid_inverse() {
        let t = transform();
        for &(x, y) in &[(0, 0), (1, 0), (0, 1), (-5, 7), (123, -456), (-1000, -1000)] {
            let grid = GridCoord::new(x, y);
            let back = t.world_to_grid(t.grid_to_world(grid));
            assert!((back.x - x as f32).abs() < 1e-3, "x: {x} -> {}", back.x);
            assert!((back.y - y as f32).abs() < 1e-3, "y: {y} -> {}", back.y);
        }
    }

    #[test]
    fn test_chunk_addressing_negative() {
        let t = transform();
        assert_eq!(t.grid_to_chunk(GridCoord::new(-1, -1)), ChunkCoord::new(-1, -1));
        assert_eq!(t.chunk_to_grid(ChunkCoord::new(-1, -1)), GridCoord::new(-16, -16));
    }

    #[test]
    fn test_limits_excludes() {
        let limits = WorldLimits {
            min_x: Some(-2),
            max_x: Some(2),
            min_y: None,
            max_y: Some(10),
        };
        let t = CoordinateTransform::new(64.0, 32.0, 16, limits);
        assert!(!t.chunk_outside_limits(ChunkCoord::new(0, 0)));
        assert!(!t.chunk_outside_limits(ChunkCoord::new(-2, -9999)));
        assert!(t.chunk_outside_limits(ChunkCoord::new(-3, 0)));
        assert!(t.chunk_outside_limits(ChunkCoord::new(3, 0)));
        assert!(t.chunk_outside_limits(ChunkCoord::new(0, 11)));
    }

    #[test]
    fn test_unbounded_excludes_nothing() {
        let t = transform();
        assert!(!t.chunk_outside_limits(ChunkCoord::new(i32::MAX, i32::MIN)));
    }

    proptest! {
        #[test]
        fn prop_world_to_grid_inverts_projection(
            x in -50_000i32..50_000,
            y in -50_000i32..50_000,
        ) {
            let t = transform();
            let back = t.world_to_grid(t.grid_to_world(GridCoord::new(x, y)));
            prop_assert!((back.x - x as f32).abs() < 0.01);
            prop_assert!((back.y - y as f32).abs() < 0.01);
        }

        #[test]
        fn prop_chunk_contains_grid(
            x in -1_000_000i32..1_000_000,
            y in -1_000_000i32..1_000_000,
        ) {
            let t = transform();
            let chunk = t.grid_to_chunk(GridCoord::new(x, y));
            let origin = t.chunk_to_grid(chunk);
            prop_assert!(origin.x <= x && x < origin.x + 16);
            prop_assert!(origin.y <= y && y < origin.y + 16);
        }
    }
}
