//! Snapshot of the agent a path is computed for.
use bevy::math::{DVec3, IVec3};

use crate::{block::Fluid, path_type::MalusTable};

/// Axis aligned box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    const EPSILON: f64 = 1.0e-7;

    pub fn new(min: DVec3, max: DVec3) -> Self {
        Aabb {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Mean edge length.
    pub fn average_size(&self) -> f64 {
        let size = self.size();
        (size.x + size.y + size.z) / 3.0
    }

    pub fn inflate(&self, amount: DVec3) -> Self {
        Aabb::new(self.min - amount, self.max + amount)
    }

    pub fn translate(&self, offset: DVec3) -> Self {
        Aabb::new(self.min + offset, self.max + offset)
    }

    /// Overlap test, boxes that only share a face don't intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x - Self::EPSILON
            && self.max.x > other.min.x + Self::EPSILON
            && self.min.y < other.max.y - Self::EPSILON
            && self.max.y > other.min.y + Self::EPSILON
            && self.min.z < other.max.z - Self::EPSILON
            && self.max.z > other.min.z + Self::EPSILON
    }

    /// Bit pattern usable as a hash key.
    pub(crate) fn key(&self) -> [u64; 6] {
        [
            self.min.x.to_bits(),
            self.min.y.to_bits(),
            self.min.z.to_bits(),
            self.max.x.to_bits(),
            self.max.y.to_bits(),
            self.max.z.to_bits(),
        ]
    }
}

/// The state of a mobile agent at the moment a search starts.
///
/// Evaluators only read this value, so the same snapshot can drive repeated searches
/// without touching a live entity.
#[derive(Clone, Debug)]
pub struct Agent {
    /// Center of the agent's feet.
    pub position: DVec3,
    /// Bounding box width, also used for depth.
    pub width: f32,
    pub height: f32,
    /// Height the agent can walk up without jumping.
    pub max_up_step: f32,
    pub in_water: bool,
    pub on_ground: bool,
    /// Blocks the agent is willing to drop.
    pub max_fall_distance: i32,
    /// Fluid the agent can stand on top of, if any.
    pub stands_on: Option<Fluid>,
    /// Seeds random start node sampling.
    pub seed: u64,
    pub malus: MalusTable,
}

impl Default for Agent {
    fn default() -> Self {
        Agent {
            position: DVec3::ZERO,
            width: 0.6,
            height: 1.8,
            max_up_step: 0.6,
            in_water: false,
            on_ground: true,
            max_fall_distance: 3,
            stands_on: None,
            seed: 0,
            malus: MalusTable::default(),
        }
    }
}

impl Agent {
    /// An agent of the given size standing at `position`.
    pub fn new(position: DVec3, width: f32, height: f32) -> Self {
        Agent {
            position,
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_malus(mut self, malus: MalusTable) -> Self {
        self.malus = malus;
        self
    }

    pub fn with_max_up_step(mut self, max_up_step: f32) -> Self {
        self.max_up_step = max_up_step;
        self
    }

    pub fn in_water(mut self, in_water: bool) -> Self {
        self.in_water = in_water;
        self
    }

    pub fn on_ground(mut self, on_ground: bool) -> Self {
        self.on_ground = on_ground;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn bounding_box(&self) -> Aabb {
        let half = self.width as f64 / 2.0;
        Aabb::new(
            DVec3::new(self.position.x - half, self.position.y, self.position.z - half),
            DVec3::new(
                self.position.x + half,
                self.position.y + self.height as f64,
                self.position.z + half,
            ),
        )
    }

    /// The block containing the agent's feet.
    pub fn block_position(&self) -> IVec3 {
        self.position.floor().as_ivec3()
    }

    pub fn can_stand_on_fluid(&self, fluid: Fluid) -> bool {
        !fluid.is_empty() && self.stands_on == Some(fluid)
    }
}
