//! Durable key-value persistence for chunks and world metadata.
//!
//! Keys are namespaced per world id with signed chunk coordinates encoded as
//! decimal integers joined by `_`. The encoding is collision-free: the world
//! id is percent-encoded so it contributes no `/` (or `.` path components) to
//! the key, and in a number `-` only ever leads and `_` cannot appear.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use meridian_common::{ChunkCoord, WorldId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::chunk::Chunk;
use crate::metadata::WorldMetadata;

/// Persistence errors. A missing record is not an error; loads return
/// `Ok(None)` and callers fall back to generation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A persisted record failed validation. Treated as not-found by the
    /// lifecycle manager, which regenerates the chunk.
    #[error("Malformed record: {0}")]
    Malformed(String),
    /// The backing store could not complete the I/O. The chunk stays dirty
    /// and resident so the write can be retried.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Percent-encodes a world id into a single key segment.
///
/// Everything outside `[A-Za-z0-9-]` becomes `%XX`, so an id containing `/`
/// cannot nest inside another world's prefix and an id containing `..`
/// cannot traverse out of a file store's root directory.
fn encode_world_id(world: &WorldId) -> String {
    let mut encoded = String::with_capacity(world.as_str().len());
    for byte in world.as_str().bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' => encoded.push(char::from(byte)),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

/// Returns the storage key for a chunk record.
#[must_use]
pub fn chunk_key(world: &WorldId, coord: ChunkCoord) -> String {
    format!(
        "worlds/{}/chunks/{}_{}",
        encode_world_id(world),
        coord.x,
        coord.y
    )
}

/// Returns the storage key for a world's metadata record.
#[must_use]
pub fn metadata_key(world: &WorldId) -> String {
    format!("worlds/{}/world.meta", encode_world_id(world))
}

/// Returns the key prefix owning everything persisted for a world.
#[must_use]
pub fn world_prefix(world: &WorldId) -> String {
    format!("worlds/{}/", encode_world_id(world))
}

/// A durable key-value backing store for chunk and metadata records.
///
/// Implementations may complete I/O immediately (in-memory) or against a
/// slow medium; the lifecycle manager serializes operations per coordinate
/// and guards completions with sequence tokens, so either is safe.
pub trait ChunkStore: Send + Sync {
    /// Writes a chunk record, overwriting any prior value. Idempotent.
    fn save_chunk(&self, world: &WorldId, chunk: &Chunk) -> StoreResult<()>;

    /// Reads a chunk record. `Ok(None)` when no record exists.
    fn load_chunk(
        &self,
        world: &WorldId,
        coord: ChunkCoord,
        expected_size: u32,
    ) -> StoreResult<Option<Chunk>>;

    /// Writes the world metadata record, overwriting any prior value.
    fn save_world_metadata(&self, meta: &WorldMetadata) -> StoreResult<()>;

    /// Reads the world metadata record. `Ok(None)` when no record exists.
    fn load_world_metadata(&self, world: &WorldId) -> StoreResult<Option<WorldMetadata>>;

    /// Best-effort removal of every key under the world's prefix. Never
    /// fails on partial removal; returns the number of records removed.
    fn delete_world(&self, world: &WorldId) -> usize;
}

fn decode_chunk(bytes: &[u8], expected_size: u32) -> StoreResult<Chunk> {
    Chunk::deserialize(bytes, expected_size).map_err(|e| StoreError::Malformed(e.to_string()))
}

fn encode_chunk(chunk: &Chunk) -> StoreResult<Vec<u8>> {
    chunk
        .serialize()
        .map_err(|e| StoreError::Unavailable(e.to_string()))
}

/// In-memory store backed by a concurrent map.
///
/// Primarily for tests and ephemeral worlds. The availability switch lets
/// tests simulate a failing backing store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, Vec<u8>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the backing store going down (or coming back).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of records held.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Overwrites a raw record, bypassing serialization. Test hook for
    /// planting corrupt data.
    pub fn put_raw(&self, key: String, bytes: Vec<u8>) {
        self.records.insert(key, bytes);
    }

    /// Reads a raw record.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.records.get(key).map(|r| r.value().clone())
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".into()));
        }
        Ok(())
    }
}

impl ChunkStore for MemoryStore {
    fn save_chunk(&self, world: &WorldId, chunk: &Chunk) -> StoreResult<()> {
        self.check_available()?;
        let bytes = encode_chunk(chunk)?;
        self.records.insert(chunk_key(world, chunk.coord()), bytes);
        Ok(())
    }

    fn load_chunk(
        &self,
        world: &WorldId,
        coord: ChunkCoord,
        expected_size: u32,
    ) -> StoreResult<Option<Chunk>> {
        self.check_available()?;
        match self.records.get(&chunk_key(world, coord)) {
            Some(record) => decode_chunk(record.value(), expected_size).map(Some),
            None => Ok(None),
        }
    }

    fn save_world_metadata(&self, meta: &WorldMetadata) -> StoreResult<()> {
        self.check_available()?;
        let bytes = serde_json::to_vec(meta).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        self.records.insert(metadata_key(&meta.world_id), bytes);
        Ok(())
    }

    fn load_world_metadata(&self, world: &WorldId) -> StoreResult<Option<WorldMetadata>> {
        self.check_available()?;
        match self.records.get(&metadata_key(world)) {
            Some(record) => serde_json::from_slice(record.value())
                .map(Some)
                .map_err(|e| StoreError::Malformed(e.to_string())),
            None => Ok(None),
        }
    }

    fn delete_world(&self, world: &WorldId) -> usize {
        let prefix = world_prefix(world);
        let before = self.records.len();
        self.records.retain(|key, _| !key.starts_with(&prefix));
        before - self.records.len()
    }
}

/// File-backed store: one file per record under a root directory, with the
/// storage key as the relative path.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a file store rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn write_record(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(format!("mkdir failed: {e}")))?;
        }
        std::fs::write(&path, bytes)
            .map_err(|e| StoreError::Unavailable(format!("write failed: {e}")))?;
        debug!("Wrote record {key} ({} bytes)", bytes.len());
        Ok(())
    }

    fn read_record(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        match std::fs::read(self.key_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Unavailable(format!("read failed: {e}"))),
        }
    }

    fn count_files(dir: &Path) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return 0;
        };
        entries
            .flatten()
            .map(|entry| {
                let path = entry.path();
                if path.is_dir() {
                    Self::count_files(&path)
                } else {
                    1
                }
            })
            .sum()
    }
}

impl ChunkStore for FileStore {
    fn save_chunk(&self, world: &WorldId, chunk: &Chunk) -> StoreResult<()> {
        let bytes = encode_chunk(chunk)?;
        self.write_record(&chunk_key(world, chunk.coord()), &bytes)
    }

    fn load_chunk(
        &self,
        world: &WorldId,
        coord: ChunkCoord,
        expected_size: u32,
    ) -> StoreResult<Option<Chunk>> {
        match self.read_record(&chunk_key(world, coord))? {
            Some(bytes) => decode_chunk(&bytes, expected_size).map(Some),
            None => Ok(None),
        }
    }

    fn save_world_metadata(&self, meta: &WorldMetadata) -> StoreResult<()> {
        let bytes =
            serde_json::to_vec_pretty(meta).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        self.write_record(&metadata_key(&meta.world_id), &bytes)
    }

    fn load_world_metadata(&self, world: &WorldId) -> StoreResult<Option<WorldMetadata>> {
        match self.read_record(&metadata_key(world))? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Malformed(e.to_string())),
            None => Ok(None),
        }
    }

    fn delete_world(&self, world: &WorldId) -> usize {
        let dir = self.root.join("worlds").join(encode_world_id(world));
        let removed = Self::count_files(&dir);
        if let Err(e) = std::fs::remove_dir_all(&dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Partial delete of world {world}: {e}");
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Tile;
    use meridian_common::LocalCoord;

    fn chunk_at(x: i32, y: i32) -> Chunk {
        let tiles = vec![Tile::default(); 16];
        Chunk::from_tiles(ChunkCoord::new(x, y), 4, tiles).expect("valid tile grid")
    }

    #[test]
    fn test_key_scheme_collision_free() {
        let world = WorldId::new("w1");
        // Signs cannot migrate between coordinates.
        assert_ne!(
            chunk_key(&world, ChunkCoord::new(1, -23)),
            chunk_key(&world, ChunkCoord::new(-1, 23))
        );
        assert_ne!(
            chunk_key(&world, ChunkCoord::new(12, 3)),
            chunk_key(&world, ChunkCoord::new(1, 23))
        );
        assert_eq!(chunk_key(&world, ChunkCoord::new(1, -23)), "worlds/w1/chunks/1_-23");
    }

    #[test]
    fn test_world_id_with_separator_stays_namespaced() {
        let store = MemoryStore::new();
        let outer = WorldId::new("a");
        let nested = WorldId::new("a/chunks/0");
        store
            .save_world_metadata(&WorldMetadata::new(nested.clone(), 1))
            .expect("save");
        store
            .save_world_metadata(&WorldMetadata::new(outer.clone(), 2))
            .expect("save");

        // Deleting "a" must not reach into "a/chunks/0".
        assert_eq!(store.delete_world(&outer), 1);
        assert!(store
            .load_world_metadata(&nested)
            .expect("load")
            .is_some());
    }

    #[test]
    fn test_file_store_world_id_cannot_escape_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        let world = WorldId::new("../escapee");
        store
            .save_world_metadata(&WorldMetadata::new(world.clone(), 1))
            .expect("save");

        assert!(store
            .load_world_metadata(&world)
            .expect("load")
            .is_some());
        // The record lands under the root, not beside it.
        assert!(!dir.path().join("escapee").exists());
        assert_eq!(store.delete_world(&world), 1);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        let world = WorldId::new("test");
        let mut chunk = chunk_at(0, 0);
        chunk.set_structure(LocalCoord::new(1, 1), meridian_common::StructureId::new(5));

        store.save_chunk(&world, &chunk).expect("save");
        let loaded = store
            .load_chunk(&world, ChunkCoord::new(0, 0), 4)
            .expect("load")
            .expect("present");
        assert_eq!(loaded.tiles(), chunk.tiles());
    }

    #[test]
    fn test_memory_store_not_found_is_none() {
        let store = MemoryStore::new();
        let world = WorldId::new("test");
        let loaded = store
            .load_chunk(&world, ChunkCoord::new(9, 9), 4)
            .expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_memory_store_unavailable() {
        let store = MemoryStore::new();
        let world = WorldId::new("test");
        store.set_unavailable(true);
        assert!(matches!(
            store.save_chunk(&world, &chunk_at(0, 0)),
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        store.save_chunk(&world, &chunk_at(0, 0)).expect("save");
    }

    #[test]
    fn test_memory_store_corrupt_record_is_malformed() {
        let store = MemoryStore::new();
        let world = WorldId::new("test");
        store.put_raw(chunk_key(&world, ChunkCoord::new(0, 0)), vec![0xAB; 64]);
        assert!(matches!(
            store.load_chunk(&world, ChunkCoord::new(0, 0), 4),
            Err(StoreError::Malformed(_))
        ));
    }

    #[test]
    fn test_memory_store_delete_world_scoped() {
        let store = MemoryStore::new();
        let w1 = WorldId::new("one");
        let w2 = WorldId::new("two");
        store.save_chunk(&w1, &chunk_at(0, 0)).expect("save");
        store.save_chunk(&w1, &chunk_at(1, 0)).expect("save");
        store.save_chunk(&w2, &chunk_at(0, 0)).expect("save");

        assert_eq!(store.delete_world(&w1), 2);
        assert_eq!(store.record_count(), 1);
        assert_eq!(store.delete_world(&w1), 0);
    }

    #[test]
    fn test_metadata_round_trip() {
        let store = MemoryStore::new();
        let world = WorldId::new("meta");
        let meta = WorldMetadata::new(world.clone(), 1234);
        store.save_world_metadata(&meta).expect("save");
        let loaded = store
            .load_world_metadata(&world)
            .expect("load")
            .expect("present");
        assert_eq!(loaded, meta);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        let world = WorldId::new("disk");
        let chunk = chunk_at(-3, 7);

        store.save_chunk(&world, &chunk).expect("save");
        let loaded = store
            .load_chunk(&world, ChunkCoord::new(-3, 7), 4)
            .expect("load")
            .expect("present");
        assert_eq!(loaded.tiles(), chunk.tiles());

        assert!(store
            .load_chunk(&world, ChunkCoord::new(0, 0), 4)
            .expect("load")
            .is_none());
    }

    #[test]
    fn test_file_store_delete_world() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        let world = WorldId::new("doomed");
        store.save_chunk(&world, &chunk_at(0, 0)).expect("save");
        store
            .save_world_metadata(&WorldMetadata::new(world.clone(), 1))
            .expect("save");

        assert_eq!(store.delete_world(&world), 2);
        assert!(store
            .load_world_metadata(&world)
            .expect("load")
            .is_none());
        // Deleting again is a harmless no-op.
        assert_eq!(store.delete_world(&world), 0);
    }
}
