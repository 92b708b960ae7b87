//! Procedural world state: chunked tile storage, streaming, and persistence.
//!
//! The world is an unbounded 2D tile grid partitioned into fixed-size square
//! chunks. Chunks are generated deterministically from a world seed, streamed
//! in and out of memory around a tracked position, and persisted through a
//! pluggable key-value store. Consumers interact through [`World`]; the
//! residency machinery in [`manager`] is internal policy.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use meridian_common::{GridCoord, WorldId};
//! use meridian_world::{
//!     GenerateWorldOptions, MemoryStore, SeededGenerator, World, WorldConfig,
//! };
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut world = World::new(
//!     WorldConfig::default(),
//!     WorldId::new("overworld"),
//!     store,
//!     Box::new(SeededGenerator::default()),
//! )
//! .unwrap();
//! world
//!     .generate_world(GenerateWorldOptions { seed: 42, clear_storage: false })
//!     .unwrap();
//! world.update(GridCoord::new(0, 0));
//! assert!(world.get_tile(GridCoord::new(0, 0)).is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

pub mod chunk;
pub mod config;
pub mod error;
pub mod generation;
pub mod manager;
pub mod metadata;
pub mod store;
pub mod tile;
pub mod world;

pub use chunk::{Chunk, ChunkError, ChunkHeader};
pub use config::{ConfigError, WorldConfig};
pub use error::{WorldError, WorldResult};
pub use generation::{ChunkGenerator, SeededGenerator};
pub use manager::{ChunkManager, ManagerStats};
pub use metadata::WorldMetadata;
pub use store::{ChunkStore, FileStore, MemoryStore, StoreError, StoreResult};
pub use tile::{TerrainKind, Tile, TileOccupant};
pub use world::{GenerateWorldOptions, World};

/// Commonly used types.
pub mod prelude {
    pub use crate::chunk::Chunk;
    pub use crate::config::WorldConfig;
    pub use crate::error::{WorldError, WorldResult};
    pub use crate::generation::{ChunkGenerator, SeededGenerator};
    pub use crate::store::{ChunkStore, FileStore, MemoryStore};
    pub use crate::tile::{TerrainKind, Tile, TileOccupant};
    pub use crate::world::{GenerateWorldOptions, World};
    pub use meridian_common::prelude::*;
}
