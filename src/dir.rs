use bevy::math::IVec3;

/// The six block faces. Y is up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    DOWN = 0,
    UP = 1,
    NORTH = 2,
    SOUTH = 3,
    WEST = 4,
    EAST = 5,
}

pub use self::Direction::*;

impl Direction {
    pub fn all() -> std::iter::Copied<std::slice::Iter<'static, Direction>> {
        [DOWN, UP, NORTH, SOUTH, WEST, EAST].iter().copied()
    }

    /// Horizontal directions in clockwise order starting from south.
    pub fn horizontal() -> std::iter::Copied<std::slice::Iter<'static, Direction>> {
        [SOUTH, WEST, NORTH, EAST].iter().copied()
    }

    pub fn vector(self) -> IVec3 {
        match self {
            DOWN => IVec3::new(0, -1, 0),
            UP => IVec3::new(0, 1, 0),
            NORTH => IVec3::new(0, 0, -1),
            SOUTH => IVec3::new(0, 0, 1),
            WEST => IVec3::new(-1, 0, 0),
            EAST => IVec3::new(1, 0, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            DOWN => UP,
            UP => DOWN,
            NORTH => SOUTH,
            SOUTH => NORTH,
            WEST => EAST,
            EAST => WEST,
        }
    }

    /// Rotates a horizontal direction clockwise around the Y axis.
    pub fn clockwise(self) -> Direction {
        match self {
            NORTH => EAST,
            EAST => SOUTH,
            SOUTH => WEST,
            WEST => NORTH,
            _ => panic!("Not a horizontal direction"),
        }
    }

    /// Index into a four element array of horizontal directions.
    pub fn horizontal_index(self) -> usize {
        match self {
            SOUTH => 0,
            WEST => 1,
            NORTH => 2,
            EAST => 3,
            _ => panic!("Not a horizontal direction"),
        }
    }
}
