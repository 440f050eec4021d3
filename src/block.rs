//! Block and fluid values read by path type classification.

/// Fluid occupying a block position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Fluid {
    #[default]
    Empty,
    Water,
    Lava,
}

impl Fluid {
    pub fn is_empty(self) -> bool {
        matches!(self, Fluid::Empty)
    }
}

/// Movement medium a block is tested against, see [`BlockState::is_pathfindable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathComputation {
    Land,
    Water,
    Air,
}

/// The families of blocks that navigation can tell apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlockKind {
    #[default]
    Air,
    /// Any full, opaque cube (stone, dirt, planks...).
    Solid,
    /// Bottom half slab.
    Slab,
    Carpet,
    Fence,
    Wall,
    FenceGate {
        open: bool,
    },
    Door {
        open: bool,
        /// Wooden doors can be opened by hand, iron doors can't.
        wooden: bool,
    },
    Trapdoor,
    LilyPad,
    BigDripleaf,
    Rail,
    Leaves,
    Fire,
    Magma,
    Campfire {
        lit: bool,
    },
    Cactus,
    SweetBerryBush,
    Honey,
    Cocoa,
    PowderSnow,
    WitherRose,
    PointedDripstone,
    Water,
    Lava,
}

/// A block placed in the terrain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockState {
    pub kind: BlockKind,
    /// Set for non-fluid blocks that also hold a water source.
    pub waterlogged: bool,
}

impl BlockState {
    pub const AIR: BlockState = BlockState::new(BlockKind::Air);
    pub const SOLID: BlockState = BlockState::new(BlockKind::Solid);
    pub const WATER: BlockState = BlockState::new(BlockKind::Water);
    pub const LAVA: BlockState = BlockState::new(BlockKind::Lava);

    pub const fn new(kind: BlockKind) -> Self {
        BlockState {
            kind,
            waterlogged: false,
        }
    }

    /// Returns a copy of this block holding a water source.
    pub const fn waterlogged(self) -> Self {
        BlockState {
            kind: self.kind,
            waterlogged: true,
        }
    }

    pub fn is_air(&self) -> bool {
        matches!(self.kind, BlockKind::Air)
    }

    pub fn fluid(&self) -> Fluid {
        match self.kind {
            BlockKind::Water => Fluid::Water,
            BlockKind::Lava => Fluid::Lava,
            _ if self.waterlogged => Fluid::Water,
            _ => Fluid::Empty,
        }
    }

    /// Height of the top face of the collision box, 0.0 when the block has no collision.
    /// Shapes are approximated by a single box covering the whole block footprint.
    pub fn collision_height(&self) -> f64 {
        match self.kind {
            BlockKind::Air
            | BlockKind::Water
            | BlockKind::Lava
            | BlockKind::Rail
            | BlockKind::Fire
            | BlockKind::SweetBerryBush
            | BlockKind::PowderSnow
            | BlockKind::WitherRose => 0.0,
            BlockKind::FenceGate { open: true } | BlockKind::Door { open: true, .. } => 0.0,
            BlockKind::Solid | BlockKind::Leaves | BlockKind::Magma => 1.0,
            BlockKind::Door { open: false, .. } => 1.0,
            BlockKind::Fence | BlockKind::Wall | BlockKind::FenceGate { open: false } => 1.5,
            BlockKind::Slab => 0.5,
            BlockKind::Carpet => 0.0625,
            BlockKind::Trapdoor => 0.1875,
            BlockKind::LilyPad => 0.09375,
            BlockKind::BigDripleaf => 0.9375,
            BlockKind::Campfire { .. } => 0.4375,
            BlockKind::Cactus | BlockKind::Honey => 0.9375,
            BlockKind::Cocoa => 0.75,
            BlockKind::PointedDripstone => 0.6875,
        }
    }

    pub fn has_collision(&self) -> bool {
        self.collision_height() > 0.0
    }

    /// True when the collision box fills the whole block.
    pub fn is_full_block(&self) -> bool {
        self.collision_height() == 1.0
            && !matches!(self.kind, BlockKind::Door { .. } | BlockKind::Leaves)
    }

    /// Whether an agent moving through `medium` can occupy this block.
    pub fn is_pathfindable(&self, medium: PathComputation) -> bool {
        match self.kind {
            BlockKind::Water => true,
            BlockKind::Lava => false,
            BlockKind::Door { open, .. } | BlockKind::FenceGate { open } => match medium {
                PathComputation::Land | PathComputation::Air => open,
                PathComputation::Water => self.waterlogged,
            },
            BlockKind::Campfire { .. } => false,
            BlockKind::Air => true,
            _ => match medium {
                PathComputation::Land | PathComputation::Air => !self.is_full_block(),
                PathComputation::Water => self.fluid() == Fluid::Water,
            },
        }
    }

    /// Blocks that set agents on fire.
    pub fn is_burning(&self) -> bool {
        matches!(
            self.kind,
            BlockKind::Fire | BlockKind::Lava | BlockKind::Magma | BlockKind::Campfire { lit: true }
        )
    }
}

impl From<BlockKind> for BlockState {
    fn from(kind: BlockKind) -> Self {
        BlockState::new(kind)
    }
}
