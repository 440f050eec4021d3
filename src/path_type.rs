//! `PathType` classification of a single voxel and the per-agent malus table.
use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

/// Traversal characteristics of one block position.
///
/// Each variant has a default malus, agents may override it through their [`MalusTable`].
/// A negative malus means the agent can't enter positions of that type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumCount, EnumIter, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PathType {
    #[default]
    Blocked,
    Open,
    Walkable,
    WalkableDoor,
    Trapdoor,
    PowderSnow,
    DangerPowderSnow,
    Fence,
    Lava,
    Water,
    WaterBorder,
    Rail,
    UnpassableRail,
    DangerFire,
    DamageFire,
    DangerOther,
    DamageOther,
    DoorOpen,
    DoorWoodClosed,
    DoorIronClosed,
    Breach,
    Leaves,
    StickyHoney,
    Cocoa,
    DamageCautious,
    DangerTrapdoor,
}

impl PathType {
    pub fn default_malus(self) -> f32 {
        match self {
            PathType::Blocked => -1.0,
            PathType::Open => 0.0,
            PathType::Walkable => 0.0,
            PathType::WalkableDoor => 0.0,
            PathType::Trapdoor => 0.0,
            PathType::PowderSnow => -1.0,
            PathType::DangerPowderSnow => 0.0,
            PathType::Fence => -1.0,
            PathType::Lava => -1.0,
            PathType::Water => 8.0,
            PathType::WaterBorder => 8.0,
            PathType::Rail => 0.0,
            PathType::UnpassableRail => -1.0,
            PathType::DangerFire => 8.0,
            PathType::DamageFire => 16.0,
            PathType::DangerOther => 8.0,
            PathType::DamageOther => -1.0,
            PathType::DoorOpen => 0.0,
            PathType::DoorWoodClosed => -1.0,
            PathType::DoorIronClosed => -1.0,
            PathType::Breach => 4.0,
            PathType::Leaves => -1.0,
            PathType::StickyHoney => 8.0,
            PathType::Cocoa => 0.0,
            PathType::DamageCautious => 0.0,
            PathType::DangerTrapdoor => 0.0,
        }
    }

    /// Blocks an agent collides with only partially, a narrow agent may still bump into them.
    pub fn has_partial_collision(self) -> bool {
        matches!(
            self,
            PathType::Fence | PathType::DoorWoodClosed | PathType::DoorIronClosed
        )
    }

    fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// Per-agent traversal penalties keyed by [`PathType`].
#[derive(Clone, Debug, PartialEq)]
pub struct MalusTable {
    malus: [f32; PathType::COUNT],
}

impl Default for MalusTable {
    fn default() -> Self {
        let mut malus = [0.0; PathType::COUNT];
        for path_type in PathType::iter() {
            malus[path_type as usize] = path_type.default_malus();
        }
        MalusTable { malus }
    }
}

impl MalusTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, path_type: PathType) -> f32 {
        self.malus[path_type as usize]
    }

    pub fn set(&mut self, path_type: PathType, malus: f32) {
        self.malus[path_type as usize] = malus;
    }

    /// Builder style [`MalusTable::set`].
    pub fn with(mut self, path_type: PathType, malus: f32) -> Self {
        self.set(path_type, malus);
        self
    }

    /// True when the agent may enter positions of this type.
    #[inline]
    pub fn is_passable(&self, path_type: PathType) -> bool {
        self.get(path_type) >= 0.0
    }
}

/// Set of path types, iterated in declaration order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathTypeSet(u32);

impl PathTypeSet {
    pub fn insert(&mut self, path_type: PathType) {
        self.0 |= path_type.bit();
    }

    pub fn contains(&self, path_type: PathType) -> bool {
        self.0 & path_type.bit() != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = PathType> + '_ {
        PathType::iter().filter(move |path_type| self.contains(*path_type))
    }
}
