//! Chunk lifecycle management: residency, streaming, and eviction.
//!
//! The manager owns a single arena of every chunk coordinate touched this
//! session. Residency transitions happen on [`ChunkManager::tick`], driven by
//! the tracked actor's grid position: chunks inside the load radius are made
//! resident (loaded from the store, or generated when no record exists), and
//! resident chunks beyond the unload radius are persisted if dirty and then
//! evicted. Per-coordinate sequence tokens make stale load completions
//! inapplicable; saves are never discarded.

use std::sync::Arc;
use std::time::Instant;

use ahash::{AHashMap, AHashSet};
use meridian_common::{ChunkCoord, CoordinateTransform, GridCoord, WorldId};
use tracing::{debug, info, warn};

use crate::chunk::Chunk;
use crate::config::WorldConfig;
use crate::error::{WorldError, WorldResult};
use crate::generation::ChunkGenerator;
use crate::metadata::WorldMetadata;
use crate::store::{ChunkStore, StoreError};
use crate::tile::Tile;

/// Residency of a registered chunk coordinate.
#[derive(Debug)]
enum Residency {
    /// Known but not held in memory; a re-entry reloads or regenerates.
    Absent,
    /// Held in memory with a fully populated tile grid.
    Resident(Box<Chunk>),
}

/// Arena slot for one chunk coordinate.
///
/// `seq` is bumped on every load or unload request; a load completion
/// carrying a stale token is discarded, so a load that finishes after a
/// newer unload for the same coordinate can never resurrect the chunk.
#[derive(Debug)]
struct ChunkEntry {
    residency: Residency,
    seq: u64,
}

impl ChunkEntry {
    const fn new() -> Self {
        Self {
            residency: Residency::Absent,
            seq: 0,
        }
    }

    const fn is_resident(&self) -> bool {
        matches!(self.residency, Residency::Resident(_))
    }
}

/// Lifecycle counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerStats {
    /// Chunks filled by the generator
    pub generated: u64,
    /// Chunks restored from the store
    pub loaded: u64,
    /// Chunks evicted from memory
    pub evicted: u64,
    /// Successful chunk writes
    pub saved: u64,
    /// Failed chunk writes (chunk kept resident and dirty)
    pub save_failures: u64,
    /// Loads that failed because the store was unavailable
    pub load_failures: u64,
    /// Persisted records that failed validation and were regenerated
    pub malformed_records: u64,
    /// Auto-save sweeps performed
    pub auto_saves: u64,
}

/// Owns the chunk registry and performs generate/load/evict transitions.
pub struct ChunkManager {
    config: WorldConfig,
    transform: CoordinateTransform,
    world_id: WorldId,
    store: Arc<dyn ChunkStore>,
    generator: Box<dyn ChunkGenerator>,
    /// Every coordinate touched this session; the single owning arena.
    registry: AHashMap<ChunkCoord, ChunkEntry>,
    /// Keys into the arena that are resident and within the load radius.
    active: AHashSet<ChunkCoord>,
    metadata: WorldMetadata,
    last_auto_save: Instant,
    stats: ManagerStats,
}

impl ChunkManager {
    /// Creates a manager for the given world.
    pub fn new(
        config: WorldConfig,
        world_id: WorldId,
        seed: u64,
        store: Arc<dyn ChunkStore>,
        generator: Box<dyn ChunkGenerator>,
    ) -> WorldResult<Self> {
        config.validate()?;
        let transform = CoordinateTransform::new(
            config.tile_width,
            config.tile_height,
            config.chunk_size,
            config.world_limits,
        );
        let metadata = WorldMetadata::new(world_id.clone(), seed);
        Ok(Self {
            config,
            transform,
            world_id,
            store,
            generator,
            registry: AHashMap::new(),
            active: AHashSet::new(),
            metadata,
            last_auto_save: Instant::now(),
            stats: ManagerStats::default(),
        })
    }

    /// Returns the coordinate transform.
    #[must_use]
    pub const fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Returns the world metadata.
    #[must_use]
    pub const fn metadata(&self) -> &WorldMetadata {
        &self.metadata
    }

    /// Returns the lifecycle counters.
    #[must_use]
    pub const fn stats(&self) -> &ManagerStats {
        &self.stats
    }

    /// Returns whether a chunk is currently resident.
    #[must_use]
    pub fn is_resident(&self, coord: ChunkCoord) -> bool {
        self.registry.get(&coord).is_some_and(ChunkEntry::is_resident)
    }

    /// Returns the number of resident chunks.
    #[must_use]
    pub fn resident_count(&self) -> usize {
        self.registry.values().filter(|e| e.is_resident()).count()
    }

    /// Returns the number of registered coordinates (resident or not).
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the coordinates of the active set (resident, within the load
    /// radius of the last tick).
    pub fn active_chunks(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.active.iter().copied()
    }

    /// Drives residency from the tracked actor's grid position.
    ///
    /// Desired chunks are processed nearest-first so the generate radius is
    /// handled before the rest of the load radius.
    pub fn tick(&mut self, tracked: GridCoord) {
        let center = self.transform.grid_to_chunk(tracked);
        let load = self.config.load_distance as i32;

        let mut desired = Vec::with_capacity(((load * 2 + 1) * (load * 2 + 1)) as usize);
        for dy in -load..=load {
            for dx in -load..=load {
                desired.push(ChunkCoord::new(center.x + dx, center.y + dy));
            }
        }
        desired.sort_by_key(|coord| coord.chebyshev_distance(center));

        for coord in desired {
            if self.is_resident(coord) {
                continue;
            }
            if self.transform.chunk_outside_limits(coord) {
                continue;
            }
            if let Err(e) = self.load_or_generate(coord) {
                self.stats.load_failures += 1;
                warn!("Chunk {coord} unavailable, retrying next tick: {e}");
            }
        }

        let to_evict: Vec<ChunkCoord> = self
            .registry
            .iter()
            .filter(|(coord, entry)| {
                entry.is_resident()
                    && coord.chebyshev_distance(center) > self.config.unload_distance
            })
            .map(|(coord, _)| *coord)
            .collect();
        for coord in to_evict {
            self.evict(coord);
        }

        self.active.clear();
        for (coord, entry) in &self.registry {
            if entry.is_resident() && coord.chebyshev_distance(center) <= self.config.load_distance
            {
                self.active.insert(*coord);
            }
        }
    }

    /// Gets the tile at a grid position, if its chunk is resident.
    /// Never triggers a load.
    #[must_use]
    pub fn get_tile(&self, grid: GridCoord) -> Option<&Tile> {
        let entry = self.registry.get(&self.transform.grid_to_chunk(grid))?;
        match &entry.residency {
            Residency::Resident(chunk) => chunk.get_tile(self.transform.grid_to_local(grid)),
            Residency::Absent => None,
        }
    }

    /// Gets the tile at a grid position mutably, marking the owning chunk
    /// dirty. Never triggers a load.
    pub fn get_tile_mut(&mut self, grid: GridCoord) -> Option<&mut Tile> {
        let local = self.transform.grid_to_local(grid);
        let entry = self
            .registry
            .get_mut(&self.transform.grid_to_chunk(grid))?;
        match &mut entry.residency {
            Residency::Resident(chunk) => chunk.get_tile_mut(local),
            Residency::Absent => None,
        }
    }

    /// Returns the resident chunk at a coordinate.
    #[must_use]
    pub fn get_chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        match &self.registry.get(&coord)?.residency {
            Residency::Resident(chunk) => Some(chunk),
            Residency::Absent => None,
        }
    }

    /// Loads or generates a chunk synchronously, ignoring distance
    /// thresholds. Idempotent; used by edits that must guarantee chunk
    /// existence outside the streaming radius. World limits still apply.
    pub fn get_or_create_chunk(&mut self, coord: ChunkCoord) -> WorldResult<&mut Chunk> {
        if self.transform.chunk_outside_limits(coord) {
            return Err(WorldError::OutsideLimits { coord });
        }
        if !self.is_resident(coord) {
            self.load_or_generate(coord)?;
        }
        match self
            .registry
            .get_mut(&coord)
            .map(|entry| &mut entry.residency)
        {
            Some(Residency::Resident(chunk)) => Ok(chunk),
            // load_or_generate either returned an error above or left the
            // chunk resident; an absent entry here means the store failed.
            _ => Err(WorldError::Store(StoreError::Unavailable(format!(
                "chunk {coord} could not be made resident"
            )))),
        }
    }

    /// Persists metadata and every dirty resident chunk.
    ///
    /// Failures are surfaced: this is the user-triggered save path, unlike
    /// the silently retried auto-save. Chunks saved before a failure stay
    /// clean; the failing chunk stays dirty and resident.
    pub fn save_world(&mut self) -> WorldResult<usize> {
        // The timestamp only advances in memory once the write lands.
        let mut metadata = self.metadata.clone();
        metadata.touch();
        self.store.save_world_metadata(&metadata)?;
        self.metadata = metadata;

        let mut saved = 0;
        let mut failure: Option<StoreError> = None;
        for (coord, entry) in &mut self.registry {
            let Residency::Resident(chunk) = &mut entry.residency else {
                continue;
            };
            if !chunk.is_dirty() {
                continue;
            }
            match self.store.save_chunk(&self.world_id, chunk) {
                Ok(()) => {
                    chunk.mark_clean();
                    saved += 1;
                    self.stats.saved += 1;
                }
                Err(e) => {
                    warn!("Failed to save chunk {coord}: {e}");
                    self.stats.save_failures += 1;
                    failure = Some(e);
                }
            }
        }
        info!("Saved {saved} chunks for world {}", self.world_id);
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(saved),
        }
    }

    /// Restores world metadata from the store.
    ///
    /// The resident set is cleared first so two worlds never mix under one
    /// id; subsequent ticks stream chunks back in.
    pub fn load_world(&mut self) -> WorldResult<()> {
        self.registry.clear();
        self.active.clear();
        let meta = self
            .store
            .load_world_metadata(&self.world_id)?
            .ok_or_else(|| WorldError::WorldNotFound(self.world_id.clone()))?;
        info!("Loaded world {} (seed {})", meta.world_id, meta.seed);
        self.metadata = meta;
        Ok(())
    }

    /// Replaces the metadata and discards all in-memory state. Used when a
    /// world is (re)generated under this manager.
    pub fn reset_world(&mut self, metadata: WorldMetadata) {
        self.registry.clear();
        self.active.clear();
        self.metadata = metadata;
        self.stats = ManagerStats::default();
    }

    /// Runs an auto-save sweep when the wall-clock interval has elapsed.
    /// Failures are logged and retried on the next interval, never surfaced.
    pub fn maybe_auto_save(&mut self) {
        if !self.config.auto_save || !self.config.persist_chunks {
            return;
        }
        if self.last_auto_save.elapsed() < self.config.auto_save_interval {
            return;
        }
        self.last_auto_save = Instant::now();
        self.stats.auto_saves += 1;
        if let Err(e) = self.save_world() {
            warn!("Auto-save failed, will retry: {e}");
        }
    }

    /// Requests a load for a coordinate, returning the sequence token the
    /// completion must present.
    fn begin_load(&mut self, coord: ChunkCoord) -> u64 {
        let entry = self.registry.entry(coord).or_insert_with(ChunkEntry::new);
        entry.seq += 1;
        entry.seq
    }

    /// Applies a load completion. Returns false when the token is stale or
    /// the slot is already resident; the completed chunk is then dropped.
    fn apply_load(&mut self, coord: ChunkCoord, token: u64, chunk: Chunk) -> bool {
        let Some(entry) = self.registry.get_mut(&coord) else {
            return false;
        };
        if entry.seq != token || entry.is_resident() {
            debug!("Discarding stale load completion for {coord}");
            return false;
        }
        entry.residency = Residency::Resident(Box::new(chunk));
        true
    }

    /// Loads a chunk from the store, falling back to generation on a missing
    /// or malformed record. `Unavailable` propagates; the caller decides
    /// whether that is a retry (tick) or a hard failure (explicit edits).
    fn load_or_generate(&mut self, coord: ChunkCoord) -> Result<(), StoreError> {
        let token = self.begin_load(coord);

        if self.config.persist_chunks {
            match self
                .store
                .load_chunk(&self.world_id, coord, self.config.chunk_size)
            {
                Ok(Some(chunk)) => {
                    debug!("Loaded chunk {coord} from store");
                    if self.apply_load(coord, token, chunk) {
                        self.stats.loaded += 1;
                    }
                    return Ok(());
                }
                Ok(None) => {}
                Err(StoreError::Malformed(e)) => {
                    // The corrupt record stays in the store untouched until a
                    // successful save of the regenerated chunk overwrites it.
                    warn!("Malformed record for chunk {coord}, regenerating: {e}");
                    self.stats.malformed_records += 1;
                }
                Err(e @ StoreError::Unavailable(_)) => return Err(e),
            }
        }

        let tiles = self
            .generator
            .generate(coord, self.config.chunk_size, self.metadata.seed);
        match Chunk::from_tiles(coord, self.config.chunk_size, tiles) {
            Ok(chunk) => {
                debug!("Generated chunk {coord}");
                if self.apply_load(coord, token, chunk) {
                    self.stats.generated += 1;
                }
            }
            Err(e) => warn!("Generator produced an invalid chunk for {coord}: {e}"),
        }
        Ok(())
    }

    /// Evicts a resident chunk, saving it first when dirty.
    ///
    /// A failed save keeps the chunk resident and dirty for retry on the
    /// next tick; a lost write would corrupt the chunk's durable state.
    fn evict(&mut self, coord: ChunkCoord) {
        let Some(entry) = self.registry.get_mut(&coord) else {
            return;
        };
        let Residency::Resident(chunk) = &mut entry.residency else {
            return;
        };

        if chunk.is_dirty() && self.config.persist_chunks {
            match self.store.save_chunk(&self.world_id, chunk) {
                Ok(()) => {
                    chunk.mark_clean();
                    self.stats.saved += 1;
                }
                Err(e) => {
                    warn!("Eviction save failed for chunk {coord}, keeping resident: {e}");
                    self.stats.save_failures += 1;
                    return;
                }
            }
        }

        // Invalidate any in-flight load before releasing the memory.
        entry.seq += 1;
        entry.residency = Residency::Absent;
        self.active.remove(&coord);
        self.stats.evicted += 1;
        debug!("Evicted chunk {coord}");
    }
}

impl std::fmt::Debug for ChunkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkManager")
            .field("world_id", &self.world_id)
            .field("registered", &self.registry.len())
            .field("resident", &self.resident_count())
            .field("active", &self.active.len())
            .finish_non_exhaustive()
    }
}
