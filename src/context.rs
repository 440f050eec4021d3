//! Per search view of the terrain.
use bevy::math::IVec3;

use crate::{block::BlockState, cache::PathTypeCache, path_type::PathType, terrain::Terrain};

/// Binds the terrain, the optional world level [`PathTypeCache`] and the searching agent's
/// block position for one pathfinding run.
///
/// Ephemeral terrain (previews, tests, regions that aren't part of a persistent world) is
/// evaluated without a cache.
pub struct PathfindingContext<'a> {
    terrain: &'a dyn Terrain,
    cache: Option<&'a mut PathTypeCache>,
    mob_position: IVec3,
}

impl<'a> PathfindingContext<'a> {
    pub fn new(
        terrain: &'a dyn Terrain,
        cache: Option<&'a mut PathTypeCache>,
        mob_position: IVec3,
    ) -> Self {
        PathfindingContext {
            terrain,
            cache,
            mob_position,
        }
    }

    /// Context without a shared cache.
    pub fn uncached(terrain: &'a dyn Terrain, mob_position: IVec3) -> Self {
        Self::new(terrain, None, mob_position)
    }

    /// Baseline classification of a single position, served from the cache when present.
    #[inline]
    pub fn path_type_from_state(&mut self, x: i32, y: i32, z: i32) -> PathType {
        let pos = IVec3::new(x, y, z);
        match self.cache.as_deref_mut() {
            Some(cache) => cache.get_or_compute(self.terrain, pos),
            None => self.terrain.path_type_from_state(pos),
        }
    }

    pub fn block_state(&self, pos: IVec3) -> BlockState {
        self.terrain.block_state(pos)
    }

    pub fn terrain(&self) -> &'a dyn Terrain {
        self.terrain
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Block position of the agent when the context was created.
    pub fn mob_position(&self) -> IVec3 {
        self.mob_position
    }
}
