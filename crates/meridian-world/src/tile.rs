//! Tile data model.

use meridian_common::{EntityId, StructureId};
use serde::{Deserialize, Serialize};

/// Terrain classification of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Open water
    Water,
    /// Beach sand
    Sand,
    /// Grassland
    Grass,
    /// Bare dirt
    Dirt,
    /// Exposed rock
    Stone,
    /// Snowy peaks
    Snow,
}

impl TerrainKind {
    /// Whether this terrain is walkable by default.
    #[must_use]
    pub const fn default_walkable(self) -> bool {
        !matches!(self, Self::Water)
    }
}

/// What occupies a tile, with explicit ownership.
///
/// A tile owns at most one structure reference. Entities are transient: the
/// tile holds only their identifiers, the entities themselves are owned by a
/// separate registry and are never persisted with the chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileOccupant {
    /// Nothing on the tile
    #[default]
    Empty,
    /// A placed structure, owned by this tile
    Structure(StructureId),
    /// Transient entities currently on the tile (identifiers only)
    Entities(Vec<EntityId>),
}

/// A single cell of the world grid, exclusively owned by its chunk.
///
/// Created at generation or load time; mutated only through accessors that
/// mark the owning chunk dirty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Terrain classification
    pub terrain: TerrainKind,
    /// Height above sea level, in elevation units
    pub elevation: i16,
    /// Whether actors may enter this tile
    pub walkable: bool,
    /// Current occupant
    pub occupant: TileOccupant,
}

impl Tile {
    /// Creates a tile with terrain-default walkability and no occupant.
    #[must_use]
    pub const fn new(terrain: TerrainKind, elevation: i16) -> Self {
        Self {
            terrain,
            elevation,
            walkable: terrain.default_walkable(),
            occupant: TileOccupant::Empty,
        }
    }

    /// Returns the structure reference, if one is placed here.
    #[must_use]
    pub fn structure(&self) -> Option<StructureId> {
        match self.occupant {
            TileOccupant::Structure(id) => Some(id),
            _ => None,
        }
    }

    /// Returns the transient entity IDs on this tile.
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        match &self.occupant {
            TileOccupant::Entities(ids) => ids,
            _ => &[],
        }
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::new(TerrainKind::Grass, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_not_walkable_by_default() {
        assert!(!Tile::new(TerrainKind::Water, 0).walkable);
        assert!(Tile::new(TerrainKind::Grass, 0).walkable);
    }

    #[test]
    fn test_occupant_accessors() {
        let mut tile = Tile::default();
        assert_eq!(tile.structure(), None);
        assert!(tile.entities().is_empty());

        tile.occupant = TileOccupant::Structure(StructureId::new(7));
        assert_eq!(tile.structure(), Some(StructureId::new(7)));

        let id = EntityId::new();
        tile.occupant = TileOccupant::Entities(vec![id]);
        assert_eq!(tile.structure(), None);
        assert_eq!(tile.entities(), &[id]);
    }
}
