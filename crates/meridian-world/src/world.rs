//! World facade: the single entry point for consumers.
//!
//! Wraps the chunk lifecycle manager and the coordinate transform behind one
//! surface so callers never touch chunk residency directly. Tile edits route
//! through [`ChunkManager::get_or_create_chunk`] and therefore work anywhere
//! within the world limits, resident or not.

use std::sync::Arc;

use meridian_common::{ChunkCoord, CoordinateTransform, GridCoord, GridPointF, StructureId, WorldId, WorldPoint};
use tracing::{debug, info};

use crate::config::WorldConfig;
use crate::error::WorldResult;
use crate::generation::ChunkGenerator;
use crate::manager::{ChunkManager, ManagerStats};
use crate::metadata::WorldMetadata;
use crate::store::ChunkStore;
use crate::tile::Tile;

/// Options for (re)generating a world.
#[derive(Debug, Clone, Copy)]
pub struct GenerateWorldOptions {
    /// Seed that determines all procedural terrain
    pub seed: u64,
    /// Delete any previously persisted records for this world id first
    pub clear_storage: bool,
}

/// The world subsystem facade.
pub struct World {
    manager: ChunkManager,
    store: Arc<dyn ChunkStore>,
    world_id: WorldId,
}

impl World {
    /// Creates a world over the given store and generator. The world starts
    /// with seed 0; call [`World::generate_world`] or
    /// [`World::load_world_state`] before streaming.
    pub fn new(
        config: WorldConfig,
        world_id: WorldId,
        store: Arc<dyn ChunkStore>,
        generator: Box<dyn ChunkGenerator>,
    ) -> WorldResult<Self> {
        let manager = ChunkManager::new(
            config,
            world_id.clone(),
            0,
            Arc::clone(&store),
            generator,
        )?;
        Ok(Self {
            manager,
            store,
            world_id,
        })
    }

    /// Returns the world id.
    #[must_use]
    pub const fn world_id(&self) -> &WorldId {
        &self.world_id
    }

    /// Returns the world metadata.
    #[must_use]
    pub const fn metadata(&self) -> &WorldMetadata {
        self.manager.metadata()
    }

    /// Returns the lifecycle counters.
    #[must_use]
    pub const fn stats(&self) -> &ManagerStats {
        self.manager.stats()
    }

    /// Returns the underlying chunk manager.
    #[must_use]
    pub const fn manager(&self) -> &ChunkManager {
        &self.manager
    }

    /// Advances the world one frame: streams chunks around the tracked
    /// position and runs the auto-save sweep when its interval has elapsed.
    pub fn update(&mut self, tracked: GridCoord) {
        self.manager.tick(tracked);
        self.manager.maybe_auto_save();
    }

    /// Gets the tile at a grid position, if its chunk is resident.
    #[must_use]
    pub fn get_tile(&self, grid: GridCoord) -> Option<&Tile> {
        self.manager.get_tile(grid)
    }

    /// Loads or generates the chunk at a coordinate, ignoring distance
    /// thresholds. World limits still apply.
    pub fn get_or_create_chunk(&mut self, coord: ChunkCoord) -> WorldResult<&mut crate::chunk::Chunk> {
        self.manager.get_or_create_chunk(coord)
    }

    /// Sets walkability at a grid position, loading or generating the chunk
    /// if needed.
    pub fn set_walkable(&mut self, grid: GridCoord, walkable: bool) -> WorldResult<()> {
        let (coord, local) = self.split(grid);
        let chunk = self.manager.get_or_create_chunk(coord)?;
        if let Some(tile) = chunk.get_tile_mut(local) {
            tile.walkable = walkable;
        }
        Ok(())
    }

    /// Places a structure at a grid position, loading or generating the
    /// chunk if needed. Replaces any existing occupant.
    pub fn place_structure(&mut self, grid: GridCoord, id: StructureId) -> WorldResult<()> {
        let (coord, local) = self.split(grid);
        let chunk = self.manager.get_or_create_chunk(coord)?;
        chunk.set_structure(local, id);
        debug!("Placed structure {} at {grid}", id.raw());
        Ok(())
    }

    /// Clears the occupant at a grid position, loading or generating the
    /// chunk if needed.
    pub fn clear_tile(&mut self, grid: GridCoord) -> WorldResult<()> {
        let (coord, local) = self.split(grid);
        let chunk = self.manager.get_or_create_chunk(coord)?;
        chunk.clear_occupant(local);
        Ok(())
    }

    /// Returns the coordinate transform.
    #[must_use]
    pub const fn transform(&self) -> &CoordinateTransform {
        self.manager.transform()
    }

    /// Projects a grid position to render space.
    #[must_use]
    pub fn grid_to_world(&self, grid: GridCoord) -> WorldPoint {
        self.manager.transform().grid_to_world(grid)
    }

    /// Unprojects a render-space point to fractional grid coordinates.
    /// The caller picks [`GridPointF::round`] or [`GridPointF::floor`].
    #[must_use]
    pub fn world_to_grid(&self, point: WorldPoint) -> GridPointF {
        self.manager.transform().world_to_grid(point)
    }

    /// Returns the chunk containing a grid position.
    #[must_use]
    pub fn grid_to_chunk(&self, grid: GridCoord) -> ChunkCoord {
        self.manager.transform().grid_to_chunk(grid)
    }

    /// Persists metadata and every dirty resident chunk, returning the
    /// number of chunks written. Failures are surfaced to the caller.
    pub fn save_world_state(&mut self) -> WorldResult<usize> {
        self.manager.save_world()
    }

    /// Restores world metadata from the store, clearing all in-memory chunks
    /// first. Subsequent [`World::update`] calls stream chunks back in.
    pub fn load_world_state(&mut self) -> WorldResult<()> {
        self.manager.load_world()
    }

    /// Deletes every persisted record for this world id, returning the
    /// number of records removed. In-memory state is untouched.
    pub fn clear_saved_data(&mut self) -> usize {
        let removed = self.store.delete_world(&self.world_id);
        info!("Cleared {removed} saved records for world {}", self.world_id);
        removed
    }

    /// (Re)generates the world from a seed: discards all in-memory chunks,
    /// installs fresh metadata, and persists it. With `clear_storage` set,
    /// previously saved records for this id are deleted first.
    pub fn generate_world(&mut self, opts: GenerateWorldOptions) -> WorldResult<()> {
        if opts.clear_storage {
            let removed = self.store.delete_world(&self.world_id);
            debug!("Removed {removed} stale records before regeneration");
        }
        let metadata = WorldMetadata::new(self.world_id.clone(), opts.seed);
        if self.manager.config().persist_chunks {
            self.store.save_world_metadata(&metadata)?;
        }
        info!("Generated world {} with seed {}", self.world_id, opts.seed);
        self.manager.reset_world(metadata);
        Ok(())
    }

    fn split(&self, grid: GridCoord) -> (ChunkCoord, meridian_common::LocalCoord) {
        let transform = self.manager.transform();
        (transform.grid_to_chunk(grid), transform.grid_to_local(grid))
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("world_id", &self.world_id)
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}
