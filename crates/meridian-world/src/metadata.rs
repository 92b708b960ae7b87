//! World-level metadata.

use chrono::{DateTime, Utc};
use meridian_common::WorldId;
use serde::{Deserialize, Serialize};

/// One record per world, created on first generation and updated on every
/// save. Timestamps serialize as RFC 3339 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMetadata {
    /// World identifier
    pub world_id: WorldId,
    /// Generation seed; unedited chunks are regenerated from it
    pub seed: u64,
    /// When the world was first generated
    pub created_at: DateTime<Utc>,
    /// When the world was last successfully saved
    pub last_saved_at: DateTime<Utc>,
}

impl WorldMetadata {
    /// Creates metadata for a freshly generated world.
    #[must_use]
    pub fn new(world_id: WorldId, seed: u64) -> Self {
        let now = Utc::now();
        Self {
            world_id,
            seed,
            created_at: now,
            last_saved_at: now,
        }
    }

    /// Updates the last-saved timestamp.
    pub fn touch(&mut self) {
        self.last_saved_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_advances_last_saved() {
        let mut meta = WorldMetadata::new(WorldId::new("test"), 42);
        let created = meta.created_at;
        meta.touch();
        assert!(meta.last_saved_at >= created);
        assert_eq!(meta.created_at, created);
    }

    #[test]
    fn test_json_round_trip() {
        let meta = WorldMetadata::new(WorldId::new("alpha"), 7);
        let json = serde_json::to_string(&meta).expect("serialize");
        // Timestamps persist as RFC 3339 strings.
        assert!(json.contains("created_at"));
        let back: WorldMetadata = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, meta);
    }
}
