//! This module defines the `Path` component returned by a search.
use bevy::math::IVec3;
use bevy::prelude::Component;

use crate::path_type::PathType;

/// One step of a [`Path`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub pos: IVec3,
    pub path_type: PathType,
    pub cost_malus: f32,
}

/// The result of a [`crate::pathfind::PathFinder`] search.
///
/// A path always starts at the agent's start node. When the target couldn't be reached it
/// ends at the node that got closest, see [`Path::reached`].
///
/// Followers walk it with [`Path::next`] and [`Path::advance`].
#[derive(Debug, Clone, Component)]
pub struct Path {
    points: Vec<PathPoint>,
    target: IVec3,
    reached: bool,
    cost: f32,
    next_index: usize,
}

impl Path {
    /// Create a new path
    /// # Arguments
    /// * `points` - The steps from start to end
    /// * `target` - The position that was searched for
    /// * `reached` - Whether the last step is within accuracy of `target`
    /// * `cost` - Accumulated cost of the last step
    pub fn new(points: Vec<PathPoint>, target: IVec3, reached: bool, cost: f32) -> Self {
        Path {
            points,
            target,
            reached,
            cost,
            next_index: 0,
        }
    }

    /// Returns true if the path contains the given position
    pub fn is_position_in_path(&self, pos: IVec3) -> bool {
        self.points.iter().any(|point| point.pos == pos)
    }

    /// All steps, including the ones already walked.
    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    /// Step positions in order.
    pub fn positions(&self) -> impl Iterator<Item = IVec3> + '_ {
        self.points.iter().map(|point| point.pos)
    }

    pub fn target(&self) -> IVec3 {
        self.target
    }

    pub fn reached(&self) -> bool {
        self.reached
    }

    /// Returns the movement cost of the path
    pub fn cost(&self) -> f32 {
        self.cost
    }

    /// Manhattan distance from the last step to the target, `f32::MAX` for an empty path.
    pub fn distance_to_target(&self) -> f32 {
        self.points.last().map_or(f32::MAX, |point| {
            let delta = (self.target - point.pos).abs();
            (delta.x + delta.y + delta.z) as f32
        })
    }

    pub fn end(&self) -> Option<&PathPoint> {
        self.points.last()
    }

    /// Returns the length of the path
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the path is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the next position to walk to without consuming it.
    pub fn next(&self) -> Option<IVec3> {
        self.points.get(self.next_index).map(|point| point.pos)
    }

    /// Marks the next position as walked.
    pub fn advance(&mut self) {
        if self.next_index < self.points.len() {
            self.next_index += 1;
        }
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Returns true once every step has been walked.
    pub fn is_done(&self) -> bool {
        self.next_index >= self.points.len()
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points && self.target == other.target
    }
}

impl IntoIterator for Path {
    type Item = PathPoint;
    type IntoIter = std::vec::IntoIter<PathPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}
