//! Chunk data structure and serialization.

use meridian_common::{ChunkCoord, LocalCoord, MagicBytes, SchemaVersion, StructureId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tile::{Tile, TileOccupant};

/// Chunk errors.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// Serialization failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
    /// Deserialization failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
    /// Invalid magic bytes
    #[error("Invalid chunk format")]
    InvalidFormat,
    /// Version mismatch
    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version
        actual: String,
    },
    /// Declared chunk size does not match configuration
    #[error("Chunk size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Configured chunk size
        expected: u32,
        /// Size declared by the record
        actual: u32,
    },
    /// Compression failed
    #[error("Compression failed: {0}")]
    CompressionFailed(String),
}

/// Result type for chunk operations.
pub type ChunkResult<T> = Result<T, ChunkError>;

/// Compression tag for lz4 tile payloads, the only supported scheme.
const COMPRESSION_LZ4: u8 = 1;

/// Chunk header for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkHeader {
    /// Magic bytes for format identification
    pub magic: [u8; 4],
    /// Schema version
    pub version: SchemaVersion,
    /// Chunk X coordinate
    pub x: i32,
    /// Chunk Y coordinate
    pub y: i32,
    /// Chunk edge length in tiles
    pub size: u32,
    /// Compression type (0 = none, 1 = lz4)
    pub compression: u8,
}

impl ChunkHeader {
    /// Creates a new header.
    #[must_use]
    pub fn new(coord: ChunkCoord, size: u32) -> Self {
        Self {
            magic: MagicBytes::CHUNK.0,
            version: SchemaVersion::CHUNK_RECORD,
            x: coord.x,
            y: coord.y,
            size,
            compression: COMPRESSION_LZ4,
        }
    }

    /// Validates the header.
    pub fn validate(&self) -> ChunkResult<()> {
        if self.magic != MagicBytes::CHUNK.0 {
            return Err(ChunkError::InvalidFormat);
        }
        if !SchemaVersion::CHUNK_RECORD.can_read(&self.version) {
            return Err(ChunkError::VersionMismatch {
                expected: SchemaVersion::CHUNK_RECORD.to_string(),
                actual: self.version.to_string(),
            });
        }
        Ok(())
    }
}

/// Persisted form of a single tile.
///
/// Entity occupancy is transient and deliberately absent: only the structure
/// reference survives a save/load cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TileRecord {
    terrain: crate::tile::TerrainKind,
    elevation: i16,
    walkable: bool,
    structure: Option<u64>,
}

impl TileRecord {
    fn from_tile(tile: &Tile) -> Self {
        Self {
            terrain: tile.terrain,
            elevation: tile.elevation,
            walkable: tile.walkable,
            structure: tile.structure().map(StructureId::raw),
        }
    }

    fn into_tile(self) -> Tile {
        Tile {
            terrain: self.terrain,
            elevation: self.elevation,
            walkable: self.walkable,
            occupant: match self.structure {
                Some(id) => TileOccupant::Structure(StructureId::new(id)),
                None => TileOccupant::Empty,
            },
        }
    }
}

/// A square block of tiles; the unit of loading, unloading, and persistence.
#[derive(Debug)]
pub struct Chunk {
    /// Chunk coordinate
    coord: ChunkCoord,
    /// Chunk edge length in tiles
    size: u32,
    /// Tile data (size x size tiles, row-major, no holes once loaded)
    tiles: Vec<Tile>,
    /// Whether the tile grid is fully populated
    loaded: bool,
    /// Whether the chunk has unsaved mutations since the last successful write
    dirty: bool,
}

impl Chunk {
    /// Creates a chunk from a fully populated tile grid.
    ///
    /// The resulting chunk is loaded and clean; freshly generated chunks are
    /// persisted only once mutated.
    pub fn from_tiles(coord: ChunkCoord, size: u32, tiles: Vec<Tile>) -> ChunkResult<Self> {
        let expected = (size * size) as usize;
        if tiles.len() != expected {
            return Err(ChunkError::DeserializationFailed(format!(
                "tile count mismatch: expected {expected}, got {}",
                tiles.len()
            )));
        }
        Ok(Self {
            coord,
            size,
            tiles,
            loaded: true,
            dirty: false,
        })
    }

    /// Returns the chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Returns the chunk edge length in tiles.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Returns whether the tile grid is fully populated.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Returns whether the chunk has unsaved mutations.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the chunk as dirty.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Marks the chunk as clean. Called only after a successful write.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Gets a tile at local coordinates. Out-of-bounds is not an error.
    #[must_use]
    pub fn get_tile(&self, local: LocalCoord) -> Option<&Tile> {
        if u32::from(local.x) >= self.size || u32::from(local.y) >= self.size {
            return None;
        }
        self.tiles.get(local.to_index(self.size))
    }

    /// Gets a mutable tile at local coordinates, marking the chunk dirty.
    pub fn get_tile_mut(&mut self, local: LocalCoord) -> Option<&mut Tile> {
        if u32::from(local.x) >= self.size || u32::from(local.y) >= self.size {
            return None;
        }
        let index = local.to_index(self.size);
        let tile = self.tiles.get_mut(index);
        if tile.is_some() {
            self.dirty = true;
        }
        tile
    }

    /// Replaces a tile at local coordinates. Returns false out of bounds.
    pub fn set_tile(&mut self, local: LocalCoord, tile: Tile) -> bool {
        if u32::from(local.x) >= self.size || u32::from(local.y) >= self.size {
            return false;
        }
        let index = local.to_index(self.size);
        if let Some(slot) = self.tiles.get_mut(index) {
            *slot = tile;
            self.dirty = true;
            return true;
        }
        false
    }

    /// Places a structure on a tile. Returns false out of bounds.
    pub fn set_structure(&mut self, local: LocalCoord, id: StructureId) -> bool {
        if let Some(tile) = self.get_tile_mut(local) {
            tile.occupant = TileOccupant::Structure(id);
            return true;
        }
        false
    }

    /// Clears whatever occupies a tile. Returns false out of bounds.
    pub fn clear_occupant(&mut self, local: LocalCoord) -> bool {
        if let Some(tile) = self.get_tile_mut(local) {
            tile.occupant = TileOccupant::Empty;
            return true;
        }
        false
    }

    /// Returns a slice of all tiles.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Serializes the chunk to bytes.
    ///
    /// Identical in-memory state always serializes identically.
    pub fn serialize(&self) -> ChunkResult<Vec<u8>> {
        let header = ChunkHeader::new(self.coord, self.size);

        let header_bytes = bincode::serialize(&header)
            .map_err(|e| ChunkError::SerializationFailed(e.to_string()))?;

        let records: Vec<TileRecord> = self.tiles.iter().map(TileRecord::from_tile).collect();
        let tile_bytes = bincode::serialize(&records)
            .map_err(|e| ChunkError::SerializationFailed(e.to_string()))?;

        let compressed = lz4_flex::compress_prepend_size(&tile_bytes);

        let mut result = Vec::with_capacity(header_bytes.len() + compressed.len() + 4);
        result.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        result.extend_from_slice(&header_bytes);
        result.extend_from_slice(&compressed);

        Ok(result)
    }

    /// Deserializes a chunk from bytes.
    ///
    /// Fails when the declared chunk size does not match `expected_size` or
    /// the record does not contain exactly `size * size` tiles. Deserialized
    /// chunks come back loaded and clean.
    pub fn deserialize(bytes: &[u8], expected_size: u32) -> ChunkResult<Self> {
        if bytes.len() < 8 {
            return Err(ChunkError::DeserializationFailed("data too short".into()));
        }

        let header_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if bytes.len() < 4 + header_len {
            return Err(ChunkError::DeserializationFailed(
                "header length mismatch".into(),
            ));
        }

        let header: ChunkHeader = bincode::deserialize(&bytes[4..4 + header_len])
            .map_err(|e| ChunkError::DeserializationFailed(e.to_string()))?;
        header.validate()?;

        if header.size != expected_size {
            return Err(ChunkError::SizeMismatch {
                expected: expected_size,
                actual: header.size,
            });
        }

        if header.compression != COMPRESSION_LZ4 {
            return Err(ChunkError::InvalidFormat);
        }

        let compressed = &bytes[4 + header_len..];
        let tile_bytes = lz4_flex::decompress_size_prepended(compressed)
            .map_err(|e| ChunkError::CompressionFailed(e.to_string()))?;

        let records: Vec<TileRecord> = bincode::deserialize(&tile_bytes)
            .map_err(|e| ChunkError::DeserializationFailed(e.to_string()))?;

        let expected_count = (header.size * header.size) as usize;
        if records.len() != expected_count {
            return Err(ChunkError::DeserializationFailed(format!(
                "tile count mismatch: expected {expected_count}, got {}",
                records.len()
            )));
        }

        let tiles = records.into_iter().map(TileRecord::into_tile).collect();

        Ok(Self {
            coord: ChunkCoord::new(header.x, header.y),
            size: header.size,
            tiles,
            loaded: true,
            dirty: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TerrainKind;
    use proptest::prelude::*;

    fn test_chunk(size: u32) -> Chunk {
        let tiles = vec![Tile::default(); (size * size) as usize];
        Chunk::from_tiles(ChunkCoord::new(3, -7), size, tiles).expect("valid tile grid")
    }

    #[test]
    fn test_from_tiles_rejects_wrong_count() {
        let tiles = vec![Tile::default(); 10];
        assert!(Chunk::from_tiles(ChunkCoord::new(0, 0), 16, tiles).is_err());
    }

    #[test]
    fn test_round_trip_preserves_tiles() {
        let mut chunk = test_chunk(8);
        chunk.set_tile(
            LocalCoord::new(2, 5),
            Tile {
                terrain: TerrainKind::Stone,
                elevation: 42,
                walkable: false,
                occupant: TileOccupant::Structure(StructureId::new(99)),
            },
        );
        chunk.set_tile(LocalCoord::new(0, 0), Tile::new(TerrainKind::Water, -3));

        let bytes = chunk.serialize().expect("serialize");
        let restored = Chunk::deserialize(&bytes, 8).expect("deserialize");

        assert_eq!(restored.coord(), chunk.coord());
        assert_eq!(restored.tiles(), chunk.tiles());
        assert!(restored.is_loaded());
        assert!(!restored.is_dirty());
    }

    #[test]
    fn test_entities_not_persisted() {
        let mut chunk = test_chunk(4);
        let id = meridian_common::EntityId::new();
        chunk
            .get_tile_mut(LocalCoord::new(1, 1))
            .expect("in bounds")
            .occupant = TileOccupant::Entities(vec![id]);

        let bytes = chunk.serialize().expect("serialize");
        let restored = Chunk::deserialize(&bytes, 4).expect("deserialize");
        let tile = restored.get_tile(LocalCoord::new(1, 1)).expect("in bounds");
        assert_eq!(tile.occupant, TileOccupant::Empty);
    }

    #[test]
    fn test_serialization_deterministic() {
        let chunk = test_chunk(8);
        assert_eq!(
            chunk.serialize().expect("serialize"),
            chunk.serialize().expect("serialize")
        );
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let chunk = test_chunk(8);
        let bytes = chunk.serialize().expect("serialize");
        assert!(matches!(
            Chunk::deserialize(&bytes, 16),
            Err(ChunkError::SizeMismatch {
                expected: 16,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_unknown_compression_rejected() {
        let chunk = test_chunk(4);
        let mut bytes = chunk.serialize().expect("serialize");
        let header_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        // The compression tag is the header's final byte.
        bytes[3 + header_len] = 9;
        assert!(matches!(
            Chunk::deserialize(&bytes, 4),
            Err(ChunkError::InvalidFormat)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(Chunk::deserialize(&[0u8; 3], 16).is_err());
        assert!(Chunk::deserialize(&[0xAB; 128], 16).is_err());
    }

    #[test]
    fn test_mutation_marks_dirty() {
        let mut chunk = test_chunk(4);
        assert!(!chunk.is_dirty());
        chunk.set_structure(LocalCoord::new(0, 0), StructureId::new(1));
        assert!(chunk.is_dirty());
        chunk.mark_clean();
        chunk.clear_occupant(LocalCoord::new(0, 0));
        assert!(chunk.is_dirty());
    }

    #[test]
    fn test_out_of_bounds_is_none_not_error() {
        let chunk = test_chunk(4);
        assert!(chunk.get_tile(LocalCoord::new(4, 0)).is_none());
        assert!(chunk.get_tile(LocalCoord::new(0, 4)).is_none());
        assert!(chunk.get_tile(LocalCoord::new(3, 3)).is_some());
    }

    #[test]
    fn test_out_of_bounds_set_does_not_dirty() {
        let mut chunk = test_chunk(4);
        assert!(!chunk.set_tile(LocalCoord::new(9, 9), Tile::default()));
        assert!(!chunk.is_dirty());
    }

    fn arb_tile() -> impl Strategy<Value = Tile> {
        (
            prop_oneof![
                Just(TerrainKind::Water),
                Just(TerrainKind::Sand),
                Just(TerrainKind::Grass),
                Just(TerrainKind::Dirt),
                Just(TerrainKind::Stone),
                Just(TerrainKind::Snow),
            ],
            any::<i16>(),
            any::<bool>(),
            proptest::option::of(any::<u64>()),
        )
            .prop_map(|(terrain, elevation, walkable, structure)| Tile {
                terrain,
                elevation,
                walkable,
                occupant: match structure {
                    Some(id) => TileOccupant::Structure(StructureId::new(id)),
                    None => TileOccupant::Empty,
                },
            })
    }

    proptest! {
        #[test]
        fn prop_round_trip_identity(tiles in proptest::collection::vec(arb_tile(), 16)) {
            let chunk = Chunk::from_tiles(ChunkCoord::new(-2, 9), 4, tiles)
                .expect("valid tile grid");
            let bytes = chunk.serialize().expect("serialize");
            let restored = Chunk::deserialize(&bytes, 4).expect("deserialize");
            prop_assert_eq!(restored.tiles(), chunk.tiles());
        }
    }
}
