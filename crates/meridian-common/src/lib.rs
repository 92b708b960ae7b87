//! # Meridian Common
//!
//! Common types and shared abstractions for the Meridian world engine.
//!
//! This crate provides foundational types used across all Meridian subsystems:
//! - Coordinate types (grid, chunk, local, render-space)
//! - The isometric coordinate transform
//! - ID types (`WorldId`, `StructureId`, `EntityId`)
//! - Schema version information for persisted formats

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod ids;
pub mod transform;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::ids::*;
    pub use crate::transform::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_chunk_conversion() {
        let grid = GridCoord::new(100, 200);
        let chunk = grid.to_chunk_coord(32);
        let local = grid.to_local_coord(32);

        assert_eq!(chunk, ChunkCoord::new(3, 6));
        assert_eq!(local, LocalCoord::new(4, 8));
    }

    #[test]
    fn test_entity_id_generation() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_version_compatibility() {
        let v1 = SchemaVersion::new(1, 0, 0);
        let v2 = SchemaVersion::new(1, 1, 0);
        let v3 = SchemaVersion::new(2, 0, 0);

        assert!(v1.can_read(&v2));
        assert!(!v1.can_read(&v3));
    }
}
