//! A persistent world owning its terrain and the shared [`PathTypeCache`].
use bevy::math::IVec3;

use crate::{
    block::BlockState,
    cache::PathTypeCache,
    context::PathfindingContext,
    terrain::{TerrainError, VoxelTerrain},
};

/// Terrain plus the path type cache every search in it shares.
///
/// All block writes go through [`VoxelWorld::set_block`] so the cache never serves a
/// classification from before the change.
#[derive(Clone, Debug)]
pub struct VoxelWorld {
    terrain: VoxelTerrain,
    cache: PathTypeCache,
}

impl VoxelWorld {
    pub fn new(terrain: VoxelTerrain) -> Self {
        VoxelWorld {
            terrain,
            cache: PathTypeCache::new(),
        }
    }

    pub fn terrain(&self) -> &VoxelTerrain {
        &self.terrain
    }

    pub fn path_type_cache(&self) -> &PathTypeCache {
        &self.cache
    }

    /// Replaces a block and invalidates its cached path type.
    pub fn set_block(
        &mut self,
        pos: IVec3,
        state: impl Into<BlockState>,
    ) -> Result<BlockState, TerrainError> {
        let previous = self.terrain.set_block(pos, state)?;
        self.cache.invalidate(pos);
        Ok(previous)
    }

    /// Opens a cached [`PathfindingContext`] for an agent standing in `mob_position`.
    pub fn context(&mut self, mob_position: IVec3) -> PathfindingContext<'_> {
        PathfindingContext::new(&self.terrain, Some(&mut self.cache), mob_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_type::PathType;
    use bevy::math::UVec3;

    #[test]
    fn test_set_block_invalidates_cache() {
        let mut world = VoxelWorld::new(VoxelTerrain::new(UVec3::new(4, 4, 4), IVec3::ZERO));
        let pos = IVec3::new(1, 1, 1);

        assert_eq!(world.context(pos).path_type_from_state(1, 1, 1), PathType::Open);
        assert_eq!(world.path_type_cache().get(pos), Some(PathType::Open));

        world.set_block(pos, BlockState::WATER).unwrap();
        assert_eq!(world.path_type_cache().get(pos), None);
        assert_eq!(world.context(pos).path_type_from_state(1, 1, 1), PathType::Water);
    }
}
