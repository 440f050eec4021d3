//! Fully aquatic movement.
use bevy::math::IVec3;
use rustc_hash::FxHashMap;

use crate::{
    agent::Agent,
    block::{Fluid, PathComputation},
    cache::pack_pos,
    context::PathfindingContext,
    dir::Direction,
    evaluator::{push_neighbor, Capabilities, EvaluatorBase, NavError, NodeEvaluator},
    node::Target,
    path_type::PathType,
    NodeId,
};

/// Extra cost of breaching the surface into open air.
const BREACH_MALUS: f32 = 8.0;

/// Node evaluator for agents that live in water.
#[derive(Debug)]
pub struct SwimNodeEvaluator {
    base: EvaluatorBase,
    allow_breaching: bool,
    path_types: FxHashMap<i64, PathType>,
}

impl Default for SwimNodeEvaluator {
    fn default() -> Self {
        Self::new(false)
    }
}

impl SwimNodeEvaluator {
    /// `allow_breaching` lets the agent leave the water for the air right above it.
    pub fn new(allow_breaching: bool) -> Self {
        SwimNodeEvaluator {
            base: EvaluatorBase::new(Capabilities::default()),
            allow_breaching,
            path_types: FxHashMap::default(),
        }
    }

    pub fn allows_breaching(&self) -> bool {
        self.allow_breaching
    }

    fn cached_path_type(
        &mut self,
        context: &mut PathfindingContext,
        x: i32,
        y: i32,
        z: i32,
    ) -> PathType {
        let key = pack_pos(IVec3::new(x, y, z));
        if let Some(path_type) = self.path_types.get(&key) {
            return *path_type;
        }

        let path_type = self.path_type(context, x, y, z);
        self.path_types.insert(key, path_type);
        path_type
    }

    fn find_accepted_node(
        &mut self,
        context: &mut PathfindingContext,
        pos: IVec3,
    ) -> Option<NodeId> {
        let path_type = self.cached_path_type(context, pos.x, pos.y, pos.z);
        if !(path_type == PathType::Water || (self.allow_breaching && path_type == PathType::Breach))
        {
            return None;
        }

        let mut malus = self.base.malus(path_type);
        if malus < 0.0 {
            return None;
        }
        if context.terrain().fluid_state(pos).is_empty() {
            malus += BREACH_MALUS;
        }

        let id = self.base.node(pos.x, pos.y, pos.z);
        let node = &mut self.base.nodes[id];
        node.path_type = path_type;
        node.cost_malus = node.cost_malus.max(malus);
        Some(id)
    }

    fn is_node_valid(&self, node: Option<NodeId>) -> bool {
        node.is_some_and(|id| !self.base.nodes[id].closed)
    }

    fn has_malus(&self, node: Option<NodeId>) -> bool {
        node.is_some_and(|id| self.base.nodes[id].cost_malus >= 0.0)
    }
}

impl NodeEvaluator for SwimNodeEvaluator {
    fn base(&self) -> &EvaluatorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EvaluatorBase {
        &mut self.base
    }

    fn prepare(&mut self, agent: &Agent) {
        self.base.prepare(agent);
        self.path_types.clear();
    }

    fn done(&mut self) {
        self.path_types.clear();
        self.base.done();
    }

    fn start(&mut self, _context: &mut PathfindingContext) -> Result<NodeId, NavError> {
        let aabb = self.base.agent()?.bounding_box();
        Ok(self.base.node(
            aabb.min.x.floor() as i32,
            (aabb.min.y + 0.5).floor() as i32,
            aabb.min.z.floor() as i32,
        ))
    }

    fn target(&mut self, x: f64, y: f64, z: f64) -> Target {
        self.base.target_at(x, y, z)
    }

    fn neighbors(
        &mut self,
        context: &mut PathfindingContext,
        node: NodeId,
        out: &mut [NodeId],
    ) -> usize {
        let pos = self.base.nodes[node].pos();
        let mut count = 0;
        let mut faces = [None; 6];

        for direction in Direction::all() {
            let neighbor = self.find_accepted_node(context, pos + direction.vector());
            faces[direction as usize] = neighbor;
            if self.is_node_valid(neighbor) {
                if let Some(neighbor) = neighbor {
                    push_neighbor(out, &mut count, neighbor);
                }
            }
        }

        for direction in Direction::horizontal() {
            let clockwise = direction.clockwise();
            if !self.has_malus(faces[direction as usize])
                || !self.has_malus(faces[clockwise as usize])
            {
                continue;
            }

            let diagonal =
                self.find_accepted_node(context, pos + direction.vector() + clockwise.vector());
            if self.is_node_valid(diagonal) {
                if let Some(diagonal) = diagonal {
                    push_neighbor(out, &mut count, diagonal);
                }
            }
        }

        count
    }

    /// Water only if every block of the footprint is water. Air in the footprint makes the
    /// position a breach point, anything else blocks it.
    fn path_type_of_mob(
        &self,
        context: &mut PathfindingContext,
        x: i32,
        y: i32,
        z: i32,
        _agent: &Agent,
    ) -> PathType {
        let (width, height, depth) = self.base.footprint();
        let mut breach = false;

        for i in x..x + width {
            for j in y..y + height {
                for k in z..z + depth {
                    let state = context.block_state(IVec3::new(i, j, k));
                    let fluid = state.fluid();
                    if fluid.is_empty()
                        && state.is_air()
                        && state.is_pathfindable(PathComputation::Water)
                    {
                        breach = true;
                    } else if fluid != Fluid::Water || !state.is_pathfindable(PathComputation::Water)
                    {
                        return PathType::Blocked;
                    }
                }
            }
        }

        if breach {
            PathType::Breach
        } else if width > 0 && height > 0 && depth > 0 {
            PathType::Water
        } else {
            PathType::Blocked
        }
    }

    fn path_type(&self, context: &mut PathfindingContext, x: i32, y: i32, z: i32) -> PathType {
        match self.base.agent.as_ref() {
            Some(agent) => self.path_type_of_mob(context, x, y, z, agent),
            None => PathType::Blocked,
        }
    }
}
