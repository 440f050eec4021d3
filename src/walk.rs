//! Ground locomotion: walking, stepping, jumping onto blocks and dropping down.
//!
//! The free functions here are the classification rules shared with the other evaluators.
use bevy::math::{DVec3, IVec3};
use rustc_hash::FxHashMap;

use crate::{
    agent::{Aabb, Agent},
    block::{Fluid, PathComputation},
    cache::pack_pos,
    context::PathfindingContext,
    dir::Direction,
    evaluator::{push_neighbor, Capabilities, EvaluatorBase, NavError, NodeEvaluator},
    node::Target,
    path_type::{PathType, PathTypeSet},
    terrain, NodeId,
};

/// Classifies one block position for an evaluator, see [`ground_path_type`].
pub type PathTypeRule = fn(&mut PathfindingContext, i32, i32, i32) -> PathType;

/// Classifies a position for ground movement.
///
/// Air directly above a hazard or a special surface takes on that surface's type, air above
/// solid ground becomes [`PathType::Walkable`] unless a hazard is adjacent.
pub fn ground_path_type(context: &mut PathfindingContext, x: i32, y: i32, z: i32) -> PathType {
    let path_type = context.path_type_from_state(x, y, z);
    if path_type != PathType::Open || y < context.terrain().min_build_height() + 1 {
        return path_type;
    }

    match context.path_type_from_state(x, y - 1, z) {
        PathType::Open | PathType::Water | PathType::Lava | PathType::Walkable => PathType::Open,
        PathType::DamageFire => PathType::DamageFire,
        PathType::DamageOther => PathType::DamageOther,
        PathType::StickyHoney => PathType::StickyHoney,
        PathType::PowderSnow => PathType::DangerPowderSnow,
        PathType::DamageCautious => PathType::DamageCautious,
        PathType::Trapdoor => PathType::DangerTrapdoor,
        _ => check_neighbour_blocks(context, x, y, z, PathType::Walkable),
    }
}

/// Downgrades `path_type` to a danger type when a hazard is in the 3x3x3 neighbourhood,
/// ignoring the vertical column through the position itself.
pub fn check_neighbour_blocks(
    context: &mut PathfindingContext,
    x: i32,
    y: i32,
    z: i32,
    path_type: PathType,
) -> PathType {
    for i in -1..=1 {
        for j in -1..=1 {
            for k in -1..=1 {
                if i == 0 && k == 0 {
                    continue;
                }

                match context.path_type_from_state(x + i, y + j, z + k) {
                    PathType::DamageOther => return PathType::DangerOther,
                    PathType::DamageFire | PathType::Lava => return PathType::DangerFire,
                    PathType::Water => return PathType::WaterBorder,
                    PathType::DamageCautious => return PathType::DamageCautious,
                    _ => {}
                }
            }
        }
    }

    path_type
}

/// Every path type inside the agent's footprint with its minimum corner at `(x, y, z)`,
/// with doors and rails resolved against the evaluator's capabilities.
pub(crate) fn path_types_within_footprint(
    base: &EvaluatorBase,
    rule: PathTypeRule,
    context: &mut PathfindingContext,
    x: i32,
    y: i32,
    z: i32,
) -> PathTypeSet {
    let capabilities = base.capabilities;
    let mob_position = context.mob_position();
    let mut types = PathTypeSet::default();

    for i in 0..base.entity_width {
        for j in 0..base.entity_height {
            for k in 0..base.entity_depth {
                let mut path_type = rule(context, x + i, y + j, z + k);

                if path_type == PathType::DoorWoodClosed
                    && capabilities.can_open_doors
                    && capabilities.can_pass_doors
                {
                    path_type = PathType::WalkableDoor;
                }

                if path_type == PathType::DoorOpen && !capabilities.can_pass_doors {
                    path_type = PathType::Blocked;
                }

                // Rails can only be followed by an agent already riding them.
                if path_type == PathType::Rail
                    && rule(context, mob_position.x, mob_position.y, mob_position.z)
                        != PathType::Rail
                    && rule(context, mob_position.x, mob_position.y - 1, mob_position.z)
                        != PathType::Rail
                {
                    path_type = PathType::UnpassableRail;
                }

                types.insert(path_type);
            }
        }
    }

    types
}

/// Collapses the footprint types to the one that governs the agent.
pub(crate) fn mob_path_type(
    base: &EvaluatorBase,
    rule: PathTypeRule,
    context: &mut PathfindingContext,
    x: i32,
    y: i32,
    z: i32,
    agent: &Agent,
) -> PathType {
    let types = path_types_within_footprint(base, rule, context, x, y, z);
    if types.contains(PathType::Fence) {
        return PathType::Fence;
    }
    if types.contains(PathType::UnpassableRail) {
        return PathType::UnpassableRail;
    }

    let mut best = PathType::Blocked;
    for path_type in types.iter() {
        let malus = agent.malus.get(path_type);
        if malus < 0.0 {
            return path_type;
        }
        if malus >= agent.malus.get(best) {
            best = path_type;
        }
    }

    if base.entity_width <= 1
        && best != PathType::Open
        && agent.malus.get(best) == 0.0
        && types.len() == 1
    {
        PathType::Open
    } else {
        best
    }
}

/// Node evaluator for agents that walk on the ground.
#[derive(Debug)]
pub struct WalkNodeEvaluator {
    base: EvaluatorBase,
    rule: PathTypeRule,
    water_as_floor: bool,
    mob_path_types: FxHashMap<i64, PathType>,
    collisions: FxHashMap<[u64; 6], bool>,
    reusable_neighbors: [Option<NodeId>; 4],
}

impl Default for WalkNodeEvaluator {
    fn default() -> Self {
        Self::new(Capabilities::default())
    }
}

impl WalkNodeEvaluator {
    pub fn new(capabilities: Capabilities) -> Self {
        WalkNodeEvaluator {
            base: EvaluatorBase::new(capabilities),
            rule: ground_path_type,
            water_as_floor: false,
            mob_path_types: FxHashMap::default(),
            collisions: FxHashMap::default(),
            reusable_neighbors: [None; 4],
        }
    }

    /// Replaces the per-position classification, [`ground_path_type`] by default.
    pub fn with_rule(mut self, rule: PathTypeRule) -> Self {
        self.rule = rule;
        self
    }

    /// Treats water like walkable ground: agents rest at mid depth and never sink.
    pub(crate) fn with_water_as_floor(mut self) -> Self {
        self.water_as_floor = true;
        self
    }

    pub(crate) fn cached_path_type(
        &mut self,
        context: &mut PathfindingContext,
        x: i32,
        y: i32,
        z: i32,
    ) -> PathType {
        let key = pack_pos(IVec3::new(x, y, z));
        if let Some(path_type) = self.mob_path_types.get(&key) {
            return *path_type;
        }

        let path_type = match self.base.agent.as_ref() {
            Some(agent) => mob_path_type(&self.base, self.rule, context, x, y, z, agent),
            None => PathType::Blocked,
        };
        self.mob_path_types.insert(key, path_type);
        path_type
    }

    /// Height the agent would stand at in `pos`.
    pub(crate) fn floor_level(&self, context: &PathfindingContext, pos: IVec3) -> f64 {
        if (self.base.capabilities.can_float || self.water_as_floor)
            && context.terrain().fluid_state(pos) == Fluid::Water
        {
            pos.y as f64 + 0.5
        } else {
            terrain::floor_level(context.terrain(), pos)
        }
    }

    /// Vertical step limit for neighbours of the node at `pos`, 0 when the agent has no
    /// headroom or is stuck in honey.
    pub(crate) fn step_limit(&mut self, context: &mut PathfindingContext, pos: IVec3) -> i32 {
        let above = self.cached_path_type(context, pos.x, pos.y + 1, pos.z);
        let here = self.cached_path_type(context, pos.x, pos.y, pos.z);
        let max_up_step = self.base.agent.as_ref().map_or(0.0, |agent| agent.max_up_step);

        if self.base.malus(above) >= 0.0 && here != PathType::StickyHoney {
            max_up_step.max(1.0).floor() as i32
        } else {
            0
        }
    }

    fn mob_jump_height(&self) -> f64 {
        let max_up_step = self.base.agent.as_ref().map_or(0.0, |agent| agent.max_up_step);
        (max_up_step as f64).max(1.125)
    }

    fn can_start_at(&mut self, context: &mut PathfindingContext, pos: IVec3) -> bool {
        let path_type = self.cached_path_type(context, pos.x, pos.y, pos.z);
        path_type != PathType::Open && self.base.malus(path_type) >= 0.0
    }

    pub(crate) fn start_node(&mut self, context: &mut PathfindingContext, pos: IVec3) -> NodeId {
        let path_type = self.cached_path_type(context, pos.x, pos.y, pos.z);
        let malus = self.base.malus(path_type);
        let id = self.base.node(pos.x, pos.y, pos.z);
        let node = &mut self.base.nodes[id];
        node.path_type = path_type;
        node.cost_malus = malus;
        id
    }

    fn node_and_update_cost_to_max(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        path_type: PathType,
        malus: f32,
    ) -> NodeId {
        let id = self.base.node(x, y, z);
        let node = &mut self.base.nodes[id];
        node.path_type = path_type;
        node.cost_malus = node.cost_malus.max(malus);
        id
    }

    fn blocked_node(&mut self, x: i32, y: i32, z: i32) -> NodeId {
        let id = self.base.node(x, y, z);
        let node = &mut self.base.nodes[id];
        node.path_type = PathType::Blocked;
        node.cost_malus = -1.0;
        id
    }

    fn closed_node(&mut self, x: i32, y: i32, z: i32, path_type: PathType) -> NodeId {
        let id = self.base.node(x, y, z);
        let node = &mut self.base.nodes[id];
        node.closed = true;
        node.path_type = path_type;
        node.cost_malus = path_type.default_malus();
        id
    }

    fn has_collisions(&mut self, context: &PathfindingContext, aabb: &Aabb) -> bool {
        *self
            .collisions
            .entry(aabb.key())
            .or_insert_with(|| terrain::has_collisions(context.terrain(), aabb))
    }

    /// Resolves the node an agent ends up in when moving towards `(x, y, z)`, stepping up,
    /// sinking through water or dropping down as needed.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn find_accepted_node(
        &mut self,
        context: &mut PathfindingContext,
        x: i32,
        y: i32,
        z: i32,
        vertical_delta_limit: i32,
        node_floor_level: f64,
        direction: Direction,
        origin_type: PathType,
    ) -> Option<NodeId> {
        let floor_level = self.floor_level(context, IVec3::new(x, y, z));
        if floor_level - node_floor_level > self.mob_jump_height() {
            return None;
        }

        let path_type = self.cached_path_type(context, x, y, z);
        let malus = self.base.malus(path_type);
        let mut node = None;
        if malus >= 0.0 {
            node = Some(self.node_and_update_cost_to_max(x, y, z, path_type, malus));
        }

        if origin_type.has_partial_collision() {
            if let Some(id) = node {
                if self.base.nodes[id].cost_malus >= 0.0
                    && !self.can_reach_without_collision(context, id)
                {
                    node = None;
                }
            }
        }

        if path_type == PathType::Walkable || (self.water_as_floor && path_type == PathType::Water)
        {
            return node;
        }

        let capabilities = self.base.capabilities;
        let node_blocked = match node {
            Some(id) => self.base.nodes[id].cost_malus < 0.0,
            None => true,
        };

        if node_blocked
            && vertical_delta_limit > 0
            && (path_type != PathType::Fence || capabilities.can_walk_over_fences)
            && path_type != PathType::UnpassableRail
            && path_type != PathType::Trapdoor
            && path_type != PathType::PowderSnow
        {
            node = self.try_jump_on(
                context,
                x,
                y,
                z,
                vertical_delta_limit,
                node_floor_level,
                direction,
                origin_type,
            );
        } else if !self.water_as_floor && path_type == PathType::Water && !capabilities.can_float
        {
            node = self.try_find_first_non_water_below(context, x, y, z, node);
        } else if path_type == PathType::Open {
            node = Some(self.try_find_first_ground_node_below(context, x, y, z));
        } else if path_type.has_partial_collision() && node.is_none() {
            node = Some(self.closed_node(x, y, z, path_type));
        }

        node
    }

    #[allow(clippy::too_many_arguments)]
    fn try_jump_on(
        &mut self,
        context: &mut PathfindingContext,
        x: i32,
        y: i32,
        z: i32,
        vertical_delta_limit: i32,
        node_floor_level: f64,
        direction: Direction,
        origin_type: PathType,
    ) -> Option<NodeId> {
        let id = self.find_accepted_node(
            context,
            x,
            y + 1,
            z,
            vertical_delta_limit - 1,
            node_floor_level,
            direction,
            origin_type,
        )?;

        let (width, height) = {
            let agent = self.base.agent.as_ref()?;
            (agent.width as f64, agent.height as f64)
        };
        let path_type = self.base.nodes[id].path_type;
        if width >= 1.0 || (path_type != PathType::Open && path_type != PathType::Walkable) {
            return Some(id);
        }

        // A narrow agent must fit through the gap between the block it leaves and the one it
        // lands on.
        let offset = direction.vector();
        let center_x = (x - offset.x) as f64 + 0.5;
        let center_z = (z - offset.z) as f64 + 0.5;
        let half = width / 2.0;
        let takeoff = IVec3::new(x - offset.x, y + 1, z - offset.z);
        let landing = self.base.nodes[id].pos();
        let aabb = Aabb::new(
            DVec3::new(
                center_x - half,
                self.floor_level(context, takeoff) + 0.001,
                center_z - half,
            ),
            DVec3::new(
                center_x + half,
                height + self.floor_level(context, landing) - 0.002,
                center_z + half,
            ),
        );

        if self.has_collisions(context, &aabb) {
            None
        } else {
            Some(id)
        }
    }

    fn try_find_first_non_water_below(
        &mut self,
        context: &mut PathfindingContext,
        x: i32,
        mut y: i32,
        z: i32,
        mut node: Option<NodeId>,
    ) -> Option<NodeId> {
        let min_build_height = context.terrain().min_build_height();
        y -= 1;
        while y > min_build_height {
            let path_type = self.cached_path_type(context, x, y, z);
            if path_type != PathType::Water {
                return node;
            }

            let malus = self.base.malus(path_type);
            node = Some(self.node_and_update_cost_to_max(x, y, z, path_type, malus));
            y -= 1;
        }
        node
    }

    fn try_find_first_ground_node_below(
        &mut self,
        context: &mut PathfindingContext,
        x: i32,
        y: i32,
        z: i32,
    ) -> NodeId {
        let min_build_height = context.terrain().min_build_height();
        let max_fall_distance = self
            .base
            .agent
            .as_ref()
            .map_or(0, |agent| agent.max_fall_distance);

        let mut i = y - 1;
        while i >= min_build_height {
            if y - i > max_fall_distance {
                return self.blocked_node(x, i, z);
            }

            let path_type = self.cached_path_type(context, x, i, z);
            let malus = self.base.malus(path_type);
            if path_type != PathType::Open {
                return if malus >= 0.0 {
                    self.node_and_update_cost_to_max(x, i, z, path_type, malus)
                } else {
                    self.blocked_node(x, i, z)
                };
            }
            i -= 1;
        }

        self.blocked_node(x, y, z)
    }

    /// Sweeps the agent's box from its position to `node` looking for collisions.
    fn can_reach_without_collision(&mut self, context: &PathfindingContext, node: NodeId) -> bool {
        let Some(agent) = self.base.agent.as_ref() else {
            return false;
        };
        let mut aabb = agent.bounding_box();
        let size = aabb.size();
        let target = self.base.nodes[node].pos().as_dvec3();
        let mut delta = DVec3::new(
            target.x - agent.position.x + size.x / 2.0,
            target.y - agent.position.y + size.y / 2.0,
            target.z - agent.position.z + size.z / 2.0,
        );

        let steps = (delta.length() / aabb.average_size()).ceil() as i32;
        if steps <= 0 {
            return true;
        }
        delta /= steps as f64;

        for _ in 0..steps {
            aabb = aabb.translate(delta);
            if self.has_collisions(context, &aabb) {
                return false;
            }
        }

        true
    }

    pub(crate) fn is_neighbor_valid(&self, neighbor: Option<NodeId>, node: NodeId) -> bool {
        let Some(neighbor) = neighbor else {
            return false;
        };
        let neighbor = &self.base.nodes[neighbor];
        !neighbor.closed && (neighbor.cost_malus >= 0.0 || self.base.nodes[node].cost_malus < 0.0)
    }

    /// Both orthogonal sides of a diagonal move must be free at or below the root's level.
    fn is_diagonal_valid_sides(
        &self,
        root: NodeId,
        x_node: Option<NodeId>,
        z_node: Option<NodeId>,
    ) -> bool {
        let (Some(x_node), Some(z_node)) = (x_node, z_node) else {
            return false;
        };
        let nodes = &self.base.nodes;
        let (root, x_node, z_node) = (&nodes[root], &nodes[x_node], &nodes[z_node]);

        if z_node.y > root.y || x_node.y > root.y {
            return false;
        }
        if x_node.path_type == PathType::WalkableDoor || z_node.path_type == PathType::WalkableDoor
        {
            return false;
        }

        // Narrow agents squeeze between fence posts.
        let between_fences = z_node.path_type == PathType::Fence
            && x_node.path_type == PathType::Fence
            && self.base.agent.as_ref().is_some_and(|agent| agent.width < 0.5);

        (z_node.y < root.y || z_node.cost_malus >= 0.0 || between_fences)
            && (x_node.y < root.y || x_node.cost_malus >= 0.0 || between_fences)
    }

    fn is_diagonal_valid(&self, node: Option<NodeId>) -> bool {
        let Some(node) = node else {
            return false;
        };
        let node = &self.base.nodes[node];
        !node.closed && node.path_type != PathType::WalkableDoor && node.cost_malus >= 0.0
    }
}

impl NodeEvaluator for WalkNodeEvaluator {
    fn base(&self) -> &EvaluatorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EvaluatorBase {
        &mut self.base
    }

    fn prepare(&mut self, agent: &Agent) {
        self.base.prepare(agent);
        self.mob_path_types.clear();
        self.collisions.clear();
        self.reusable_neighbors = [None; 4];
    }

    fn done(&mut self) {
        self.mob_path_types.clear();
        self.collisions.clear();
        self.base.done();
    }

    fn start(&mut self, context: &mut PathfindingContext) -> Result<NodeId, NavError> {
        let agent = self.base.agent()?.clone();
        let column = |y: i32| {
            IVec3::new(
                agent.position.x.floor() as i32,
                y,
                agent.position.z.floor() as i32,
            )
        };

        let mut y = agent.block_position().y;
        let mut state = context.block_state(column(y));

        if agent.can_stand_on_fluid(state.fluid()) {
            while agent.can_stand_on_fluid(state.fluid()) {
                y += 1;
                state = context.block_state(column(y));
            }
            y -= 1;
        } else if self.base.capabilities.can_float && agent.in_water {
            // Rise to the surface.
            while state.fluid() == Fluid::Water {
                y += 1;
                state = context.block_state(column(y));
            }
            y -= 1;
        } else if agent.on_ground {
            y = (agent.position.y + 0.5).floor() as i32;
        } else {
            // Airborne: settle on the first solid block below.
            let min_build_height = context.terrain().min_build_height();
            let mut probe = (agent.position.y + 1.0).floor() as i32;
            while probe > min_build_height {
                y = probe;
                probe -= 1;
                let below = context.block_state(column(probe));
                if !below.is_air() && !below.is_pathfindable(PathComputation::Land) {
                    break;
                }
            }
        }

        let block_position = agent.block_position();
        let pos = IVec3::new(block_position.x, y, block_position.z);
        if !self.can_start_at(context, pos) {
            let aabb = agent.bounding_box();
            let corners = [
                (aabb.min.x, aabb.min.z),
                (aabb.min.x, aabb.max.z),
                (aabb.max.x, aabb.min.z),
                (aabb.max.x, aabb.max.z),
            ];
            for (corner_x, corner_z) in corners {
                let corner = IVec3::new(corner_x.floor() as i32, y, corner_z.floor() as i32);
                if self.can_start_at(context, corner) {
                    return Ok(self.start_node(context, corner));
                }
            }
        }

        Ok(self.start_node(context, pos))
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
        let mut count = 0;
        let pos = self.base.nodes[node].pos();
        let limit = self.step_limit(context, pos);
        let origin_type = self.cached_path_type(context, pos.x, pos.y, pos.z);
        let floor_level = self.floor_level(context, pos);

        for direction in Direction::horizontal() {
            let offset = direction.vector();
            let neighbor = self.find_accepted_node(
                context,
                pos.x + offset.x,
                pos.y,
                pos.z + offset.z,
                limit,
                floor_level,
                direction,
                origin_type,
            );
            self.reusable_neighbors[direction.horizontal_index()] = neighbor;
            if self.is_neighbor_valid(neighbor, node) {
                if let Some(neighbor) = neighbor {
                    push_neighbor(out, &mut count, neighbor);
                }
            }
        }

        for direction in Direction::horizontal() {
            let clockwise = direction.clockwise();
            if !self.is_diagonal_valid_sides(
                node,
                self.reusable_neighbors[direction.horizontal_index()],
                self.reusable_neighbors[clockwise.horizontal_index()],
            ) {
                continue;
            }

            let offset = direction.vector() + clockwise.vector();
            let diagonal = self.find_accepted_node(
                context,
                pos.x + offset.x,
                pos.y,
                pos.z + offset.z,
                limit,
                floor_level,
                direction,
                origin_type,
            );
            if self.is_diagonal_valid(diagonal) {
                if let Some(diagonal) = diagonal {
                    push_neighbor(out, &mut count, diagonal);
                }
            }
        }

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
        mob_path_type(&self.base, self.rule, context, x, y, z, agent)
    }

    fn path_type(&self, context: &mut PathfindingContext, x: i32, y: i32, z: i32) -> PathType {
        (self.rule)(context, x, y, z)
    }
}
