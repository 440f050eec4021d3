//! World level [`PathTypeCache`].
use bevy::{math::IVec3, prelude::Resource};

use crate::{path_type::PathType, terrain::Terrain};

const CACHE_SIZE: usize = 4096;
const CACHE_MASK: u64 = CACHE_SIZE as u64 - 1;

/// Packs a block position into 64 bits: 26 bits of x, 26 bits of z and 12 bits of y.
#[inline]
pub fn pack_pos(pos: IVec3) -> i64 {
    ((pos.x as i64 & 0x3FF_FFFF) << 38) | ((pos.z as i64 & 0x3FF_FFFF) << 12) | (pos.y as i64 & 0xFFF)
}

/// Fast 64 bit mix, spreads neighbouring positions over the table.
#[inline]
fn mix(value: i64) -> u64 {
    let h = (value as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let h = h ^ (h >> 32);
    h ^ (h >> 16)
}

#[inline]
fn slot(packed: i64) -> usize {
    (mix(packed) & CACHE_MASK) as usize
}

/// Direct mapped cache of [`Terrain::path_type_from_state`] results, shared by every search in a world.
///
/// Each position maps to exactly one of 4096 slots, a write evicts whatever held the slot.
/// Entries never expire on their own: the owner of the world must call
/// [`PathTypeCache::invalidate`] whenever a block changes.
#[derive(Resource, Clone)]
pub struct PathTypeCache {
    positions: Box<[i64]>,
    path_types: Box<[Option<PathType>]>,
}

impl Default for PathTypeCache {
    fn default() -> Self {
        PathTypeCache {
            positions: vec![0; CACHE_SIZE].into_boxed_slice(),
            path_types: vec![None; CACHE_SIZE].into_boxed_slice(),
        }
    }
}

impl std::fmt::Debug for PathTypeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathTypeCache")
            .field("occupied", &self.len())
            .finish()
    }
}

impl PathTypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn capacity(&self) -> usize {
        CACHE_SIZE
    }

    /// Number of slots currently holding a value.
    pub fn len(&self) -> usize {
        self.path_types.iter().filter(|path_type| path_type.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached value for `pos` if its slot currently holds it.
    pub fn get(&self, pos: IVec3) -> Option<PathType> {
        let packed = pack_pos(pos);
        let index = slot(packed);
        if self.positions[index] == packed {
            self.path_types[index]
        } else {
            None
        }
    }

    /// Returns the cached path type of `pos`, classifying it through `terrain` on a miss.
    pub fn get_or_compute(&mut self, terrain: &dyn Terrain, pos: IVec3) -> PathType {
        if let Some(path_type) = self.get(pos) {
            return path_type;
        }

        let packed = pack_pos(pos);
        let index = slot(packed);
        let path_type = terrain.path_type_from_state(pos);
        self.positions[index] = packed;
        self.path_types[index] = Some(path_type);
        path_type
    }

    /// Drops the entry for `pos`. Leaves the slot alone if another position owns it.
    pub fn invalidate(&mut self, pos: IVec3) {
        let packed = pack_pos(pos);
        let index = slot(packed);
        if self.positions[index] == packed {
            self.path_types[index] = None;
        }
    }

    pub fn clear(&mut self) {
        self.positions.fill(0);
        self.path_types.fill(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        block::{BlockKind, BlockState},
        terrain::VoxelTerrain,
    };
    use bevy::math::UVec3;

    fn terrain() -> VoxelTerrain {
        let mut terrain = VoxelTerrain::new(UVec3::new(100, 4, 100), IVec3::ZERO);
        terrain
            .fill(IVec3::ZERO, IVec3::new(99, 0, 99), BlockState::SOLID)
            .unwrap();
        terrain
    }

    /// Finds two positions sharing a slot, 10000 candidates over 4096 slots always collide.
    fn colliding_pair() -> (IVec3, IVec3) {
        let mut owners = rustc_hash::FxHashMap::default();
        for x in 0..100 {
            for z in 0..100 {
                let pos = IVec3::new(x, 1, z);
                if let Some(&other) = owners.get(&slot(pack_pos(pos))) {
                    return (other, pos);
                }
                owners.insert(slot(pack_pos(pos)), pos);
            }
        }
        unreachable!("pigeonhole")
    }

    #[test]
    fn test_pack_pos_negative_coordinates() {
        assert_ne!(pack_pos(IVec3::new(-1, 0, 0)), pack_pos(IVec3::new(1, 0, 0)));
        assert_ne!(pack_pos(IVec3::new(0, -1, 0)), pack_pos(IVec3::new(0, 1, 0)));
        assert_eq!(pack_pos(IVec3::ZERO), 0);
    }

    #[test]
    fn test_get_or_compute() {
        let terrain = terrain();
        let mut cache = PathTypeCache::new();

        assert_eq!(cache.get(IVec3::new(3, 0, 3)), None);
        assert_eq!(
            cache.get_or_compute(&terrain, IVec3::new(3, 0, 3)),
            PathType::Blocked
        );
        assert_eq!(cache.get(IVec3::new(3, 0, 3)), Some(PathType::Blocked));
    }

    #[test]
    fn test_origin_is_not_a_hit_on_an_empty_cache() {
        // Slots start out holding the packed origin, but no value.
        let cache = PathTypeCache::new();
        assert_eq!(cache.get(IVec3::ZERO), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_then_recompute() {
        let mut terrain = terrain();
        let mut cache = PathTypeCache::new();
        let pos = IVec3::new(5, 1, 5);

        assert_eq!(cache.get_or_compute(&terrain, pos), PathType::Open);

        terrain.set_block(pos, BlockState::LAVA).unwrap();
        // Stale until invalidated.
        assert_eq!(cache.get_or_compute(&terrain, pos), PathType::Open);

        cache.invalidate(pos);
        assert_eq!(cache.get(pos), None);
        assert_eq!(
            cache.get_or_compute(&terrain, pos),
            terrain.path_type_from_state(pos)
        );
        assert_eq!(cache.get(pos), Some(PathType::Lava));
    }

    #[test]
    fn test_invalidate_ignores_collisions() {
        let terrain = terrain();
        let mut cache = PathTypeCache::new();
        let (first, second) = colliding_pair();

        cache.get_or_compute(&terrain, second);
        cache.invalidate(first);
        assert_eq!(cache.get(second), Some(PathType::Open));
    }

    #[test]
    fn test_collision_forces_recompute() {
        let mut terrain = terrain();
        let mut cache = PathTypeCache::new();
        let (first, second) = colliding_pair();
        terrain.set_block(second, BlockKind::Honey).unwrap();

        assert_eq!(cache.get_or_compute(&terrain, first), PathType::Open);
        assert_eq!(
            cache.get_or_compute(&terrain, second),
            PathType::StickyHoney
        );
        // The second write evicted the first position.
        assert_eq!(cache.get(first), None);
        assert_eq!(cache.get_or_compute(&terrain, first), PathType::Open);
    }

    #[test]
    fn test_overfilled_cache_never_returns_foreign_entries() {
        let mut terrain = terrain();
        let positions: Vec<IVec3> = (0..100)
            .flat_map(|x| (0..50).map(move |z| IVec3::new(x, 1, z)))
            .collect();
        assert_eq!(positions.len(), 5000);

        for (i, pos) in positions.iter().enumerate() {
            if i % 7 == 0 {
                terrain.set_block(*pos, BlockState::WATER).unwrap();
            }
        }

        let mut cache = PathTypeCache::new();
        for pos in &positions {
            cache.get_or_compute(&terrain, *pos);
        }

        let mut hits = 0;
        for pos in &positions {
            if let Some(path_type) = cache.get(*pos) {
                hits += 1;
                assert_eq!(path_type, terrain.path_type_from_state(*pos));
            }
            assert_eq!(
                cache.get_or_compute(&terrain, *pos),
                terrain.path_type_from_state(*pos)
            );
        }

        assert!(hits < positions.len());
        assert!(cache.len() <= cache.capacity());
    }
}
