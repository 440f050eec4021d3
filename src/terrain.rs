//! The terrain accessor consumed by node evaluation and the baseline block classification.
use bevy::math::{IVec3, UVec3};
use ndarray::Array3;
use thiserror::Error;

use crate::{
    agent::Aabb,
    block::{BlockKind, BlockState, Fluid, PathComputation},
    path_type::PathType,
};

/// Read access to the blocks of a world.
///
/// Implementations must accept any coordinate, positions outside the loaded area should
/// return a block that classifies as [`PathType::Blocked`] (or air) rather than panic.
pub trait Terrain {
    /// Returns the block at the given position.
    fn block_state(&self, pos: IVec3) -> BlockState;

    /// Returns the fluid at the given position.
    fn fluid_state(&self, pos: IVec3) -> Fluid {
        self.block_state(pos).fluid()
    }

    /// Lowest buildable y level.
    fn min_build_height(&self) -> i32;

    /// Surface level of oceans.
    fn sea_level(&self) -> i32;

    /// Classifies a single position without looking at its surroundings.
    /// Override to plug in a different block to [`PathType`] mapping.
    fn path_type_from_state(&self, pos: IVec3) -> PathType {
        classify_block(&self.block_state(pos))
    }
}

/// Baseline block to [`PathType`] mapping.
pub fn classify_block(state: &BlockState) -> PathType {
    match state.kind {
        BlockKind::Air => PathType::Open,
        BlockKind::Trapdoor | BlockKind::LilyPad | BlockKind::BigDripleaf => PathType::Trapdoor,
        BlockKind::PowderSnow => PathType::PowderSnow,
        BlockKind::Cactus | BlockKind::SweetBerryBush => PathType::DamageOther,
        BlockKind::Honey => PathType::StickyHoney,
        BlockKind::Cocoa => PathType::Cocoa,
        BlockKind::WitherRose | BlockKind::PointedDripstone => PathType::DamageCautious,
        _ if state.fluid() == Fluid::Lava => PathType::Lava,
        _ if state.is_burning() => PathType::DamageFire,
        BlockKind::Door { open: true, .. } => PathType::DoorOpen,
        BlockKind::Door { wooden: true, .. } => PathType::DoorWoodClosed,
        BlockKind::Door { .. } => PathType::DoorIronClosed,
        BlockKind::Rail => PathType::Rail,
        BlockKind::Leaves => PathType::Leaves,
        BlockKind::Fence | BlockKind::Wall | BlockKind::FenceGate { open: false } => {
            PathType::Fence
        }
        _ if !state.is_pathfindable(PathComputation::Land) => PathType::Blocked,
        _ if state.fluid() == Fluid::Water => PathType::Water,
        _ => PathType::Open,
    }
}

/// Height an agent standing in `pos` rests at, the top of the collision box below it.
pub fn floor_level(terrain: &dyn Terrain, pos: IVec3) -> f64 {
    let below = pos - IVec3::Y;
    below.y as f64 + terrain.block_state(below).collision_height()
}

/// Tests whether any block collision box intersects `aabb`.
pub fn has_collisions(terrain: &dyn Terrain, aabb: &Aabb) -> bool {
    let min = aabb.min.floor().as_ivec3();
    let max = aabb.max.floor().as_ivec3();

    // Fences and walls reach half a block into the cell above them.
    for x in min.x..=max.x {
        for y in (min.y - 1)..=max.y {
            for z in min.z..=max.z {
                let pos = IVec3::new(x, y, z);
                let state = terrain.block_state(pos);
                if !state.has_collision() {
                    continue;
                }
                let height = state.collision_height();

                let block = Aabb::new(
                    pos.as_dvec3(),
                    pos.as_dvec3() + bevy::math::DVec3::new(1.0, height, 1.0),
                );
                if aabb.intersects(&block) {
                    return true;
                }
            }
        }
    }

    false
}

#[derive(Debug, Error, PartialEq)]
pub enum TerrainError {
    #[error("position {0} is outside the terrain bounds")]
    OutOfBounds(IVec3),
}

/// Dense block storage for a box of the world.
///
/// Reads outside the box return a solid block so agents never path out of it.
#[derive(Clone, Debug)]
pub struct VoxelTerrain {
    blocks: Array3<BlockState>,
    origin: IVec3,
    sea_level: i32,
}

impl VoxelTerrain {
    /// Creates an air filled terrain of the given size with its minimum corner at `origin`.
    pub fn new(dimensions: UVec3, origin: IVec3) -> Self {
        VoxelTerrain {
            blocks: Array3::from_elem(
                (
                    dimensions.x as usize,
                    dimensions.y as usize,
                    dimensions.z as usize,
                ),
                BlockState::AIR,
            ),
            origin,
            sea_level: origin.y,
        }
    }

    pub fn with_sea_level(mut self, sea_level: i32) -> Self {
        self.sea_level = sea_level;
        self
    }

    pub fn dimensions(&self) -> UVec3 {
        let shape = self.blocks.shape();
        UVec3::new(shape[0] as u32, shape[1] as u32, shape[2] as u32)
    }

    pub fn origin(&self) -> IVec3 {
        self.origin
    }

    pub fn in_bounds(&self, pos: IVec3) -> bool {
        self.index(pos).is_some()
    }

    /// Returns the block at `pos` if it is inside the terrain.
    pub fn block(&self, pos: IVec3) -> Option<BlockState> {
        self.index(pos).map(|index| self.blocks[index])
    }

    /// Replaces the block at `pos`, returning the previous one.
    pub fn set_block(
        &mut self,
        pos: IVec3,
        state: impl Into<BlockState>,
    ) -> Result<BlockState, TerrainError> {
        let index = self.index(pos).ok_or(TerrainError::OutOfBounds(pos))?;
        Ok(std::mem::replace(&mut self.blocks[index], state.into()))
    }

    /// Sets every block in the inclusive box `min..=max`.
    pub fn fill(
        &mut self,
        min: IVec3,
        max: IVec3,
        state: impl Into<BlockState>,
    ) -> Result<(), TerrainError> {
        let state = state.into();
        for pos in [min, max] {
            if !self.in_bounds(pos) {
                return Err(TerrainError::OutOfBounds(pos));
            }
        }

        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    self.set_block(IVec3::new(x, y, z), state)?;
                }
            }
        }

        Ok(())
    }

    fn index(&self, pos: IVec3) -> Option<[usize; 3]> {
        let local = pos - self.origin;
        let shape = self.blocks.shape();
        if local.cmplt(IVec3::ZERO).any()
            || local.x as usize >= shape[0]
            || local.y as usize >= shape[1]
            || local.z as usize >= shape[2]
        {
            return None;
        }

        Some([local.x as usize, local.y as usize, local.z as usize])
    }
}

impl Terrain for VoxelTerrain {
    fn block_state(&self, pos: IVec3) -> BlockState {
        self.block(pos).unwrap_or(BlockState::SOLID)
    }

    fn min_build_height(&self) -> i32 {
        self.origin.y
    }

    fn sea_level(&self) -> i32 {
        self.sea_level
    }
}
