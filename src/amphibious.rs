//! Agents equally at home walking and swimming.
use bevy::math::IVec3;
use rustc_hash::FxHashSet;

use crate::{
    agent::Agent,
    context::PathfindingContext,
    dir::Direction,
    evaluator::{push_neighbor, Capabilities, EvaluatorBase, NavError, NodeEvaluator},
    node::Target,
    path_type::PathType,
    walk::{ground_path_type, WalkNodeEvaluator},
    NodeId,
};

/// Water that touches a collidable block on any face is a shoreline.
pub fn amphibious_path_type(context: &mut PathfindingContext, x: i32, y: i32, z: i32) -> PathType {
    let path_type = context.path_type_from_state(x, y, z);
    if path_type != PathType::Water {
        return ground_path_type(context, x, y, z);
    }

    let pos = IVec3::new(x, y, z);
    for direction in Direction::all() {
        let side = pos + direction.vector();
        if context.path_type_from_state(side.x, side.y, side.z) == PathType::Blocked {
            return PathType::WaterBorder;
        }
    }

    PathType::Water
}

/// Walks on land and moves freely through water, including straight up and down.
#[derive(Debug)]
pub struct AmphibiousNodeEvaluator {
    walk: WalkNodeEvaluator,
    prefers_shallow_swimming: bool,
    deep_water_penalized: FxHashSet<NodeId>,
}

impl Default for AmphibiousNodeEvaluator {
    fn default() -> Self {
        Self::new(false)
    }
}

impl AmphibiousNodeEvaluator {
    pub fn new(prefers_shallow_swimming: bool) -> Self {
        Self::with_capabilities(prefers_shallow_swimming, Capabilities::default())
    }

    pub fn with_capabilities(prefers_shallow_swimming: bool, capabilities: Capabilities) -> Self {
        AmphibiousNodeEvaluator {
            walk: WalkNodeEvaluator::new(capabilities)
                .with_rule(amphibious_path_type)
                .with_water_as_floor(),
            prefers_shallow_swimming,
            deep_water_penalized: FxHashSet::default(),
        }
    }

    pub fn prefers_shallow_swimming(&self) -> bool {
        self.prefers_shallow_swimming
    }

    /// Water more than ten blocks below sea level costs one more to cross. Applied once per
    /// node so repeated expansion reports the same malus.
    fn penalize_deep_water(&mut self, context: &PathfindingContext, nodes: &[NodeId]) {
        if !self.prefers_shallow_swimming {
            return;
        }

        let deep = context.terrain().sea_level() - 10;
        for id in nodes {
            let node = &mut self.walk.base_mut().nodes[*id];
            if node.path_type == PathType::Water
                && node.y < deep
                && self.deep_water_penalized.insert(*id)
            {
                node.cost_malus += 1.0;
            }
        }
    }
}

impl NodeEvaluator for AmphibiousNodeEvaluator {
    fn base(&self) -> &EvaluatorBase {
        self.walk.base()
    }

    fn base_mut(&mut self) -> &mut EvaluatorBase {
        self.walk.base_mut()
    }

    fn prepare(&mut self, agent: &Agent) {
        self.walk.prepare(agent);
        self.deep_water_penalized.clear();

        let base = self.walk.base_mut();
        base.set_malus(PathType::Water, 0.0);
        base.set_malus(PathType::Walkable, 6.0);
        base.set_malus(PathType::WaterBorder, 4.0);
    }

    fn done(&mut self) {
        self.deep_water_penalized.clear();
        self.walk.done();
    }

    fn start(&mut self, context: &mut PathfindingContext) -> Result<NodeId, NavError> {
        let agent = self.walk.base().agent()?;
        if !agent.in_water {
            return self.walk.start(context);
        }

        let aabb = agent.bounding_box();
        let pos = IVec3::new(
            aabb.min.x.floor() as i32,
            (aabb.min.y + 0.5).floor() as i32,
            aabb.min.z.floor() as i32,
        );
        Ok(self.walk.start_node(context, pos))
    }

    fn target(&mut self, x: f64, y: f64, z: f64) -> Target {
        self.walk.base_mut().target_at(x, y + 0.5, z)
    }

    fn neighbors(
        &mut self,
        context: &mut PathfindingContext,
        node: NodeId,
        out: &mut [NodeId],
    ) -> usize {
        let mut count = self.walk.neighbors(context, node, out);

        let pos = self.walk.base().nodes[node].pos();
        let limit = self.walk.step_limit(context, pos);
        let origin_type = self.walk.cached_path_type(context, pos.x, pos.y, pos.z);
        let floor_level = self.walk.floor_level(context, pos);

        let up = self.walk.find_accepted_node(
            context,
            pos.x,
            pos.y + 1,
            pos.z,
            (limit - 1).max(0),
            floor_level,
            Direction::UP,
            origin_type,
        );
        let down = self.walk.find_accepted_node(
            context,
            pos.x,
            pos.y - 1,
            pos.z,
            limit,
            floor_level,
            Direction::DOWN,
            origin_type,
        );

        if self.is_vertical_neighbor_valid(up, node) {
            if let Some(up) = up {
                push_neighbor(out, &mut count, up);
            }
        }
        if self.is_vertical_neighbor_valid(down, node) && origin_type != PathType::Trapdoor {
            if let Some(down) = down {
                push_neighbor(out, &mut count, down);
            }
        }

        self.penalize_deep_water(context, &out[..count]);
        count
    }

    fn path_type_of_mob(
        &self,
        context: &mut PathfindingContext,
        x: i32,
        y: i32,
        z: i32,
        agent: &Agent,
    ) -> PathType {
        self.walk.path_type_of_mob(context, x, y, z, agent)
    }

    fn path_type(&self, context: &mut PathfindingContext, x: i32, y: i32, z: i32) -> PathType {
        amphibious_path_type(context, x, y, z)
    }
}

impl AmphibiousNodeEvaluator {
    fn is_vertical_neighbor_valid(&self, neighbor: Option<NodeId>, node: NodeId) -> bool {
        self.walk.is_neighbor_valid(neighbor, node)
            && neighbor.is_some_and(|id| self.walk.base().nodes[id].path_type == PathType::Water)
    }
}
