//! Free three dimensional movement for flying agents.
use bevy::math::{DVec3, IVec3};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{
    agent::Agent,
    block::BlockKind,
    cache::pack_pos,
    context::PathfindingContext,
    evaluator::{push_neighbor, Capabilities, EvaluatorBase, NavError, NodeEvaluator},
    node::Target,
    path_type::PathType,
    walk::{check_neighbour_blocks, mob_path_type},
    NodeId,
};

/// Classifies a position for flight. Air above a hazard inherits the hazard, air above
/// anything solid is a perch.
pub fn flight_path_type(context: &mut PathfindingContext, x: i32, y: i32, z: i32) -> PathType {
    let mut path_type = context.path_type_from_state(x, y, z);

    if path_type == PathType::Open && y >= context.terrain().min_build_height() + 1 {
        path_type = match context.path_type_from_state(x, y - 1, z) {
            PathType::DamageFire | PathType::Lava => PathType::DamageFire,
            PathType::DamageOther => PathType::DamageOther,
            PathType::Cocoa => PathType::Cocoa,
            PathType::Fence if context.mob_position() != IVec3::new(x, y - 1, z) => PathType::Fence,
            PathType::Fence => path_type,
            PathType::Walkable | PathType::Open | PathType::Water => PathType::Open,
            _ => PathType::Walkable,
        };
    }

    if path_type == PathType::Walkable || path_type == PathType::Open {
        path_type = check_neighbour_blocks(context, x, y, z, path_type);
    }

    path_type
}

/// Offsets of the 26 surrounding blocks: faces, then edges, then corners.
const OFFSETS: [[i32; 3]; 26] = [
    [0, 0, 1],
    [-1, 0, 0],
    [1, 0, 0],
    [0, 0, -1],
    [0, 1, 0],
    [0, -1, 0],
    [0, 1, 1],
    [-1, 1, 0],
    [1, 1, 0],
    [0, 1, -1],
    [0, -1, 1],
    [-1, -1, 0],
    [1, -1, 0],
    [0, -1, -1],
    [1, 0, -1],
    [1, 0, 1],
    [-1, 0, -1],
    [-1, 0, 1],
    [1, 1, -1],
    [1, 1, 1],
    [-1, 1, -1],
    [-1, 1, 1],
    [1, -1, -1],
    [1, -1, 1],
    [-1, -1, -1],
    [-1, -1, 1],
];

fn slot(offset: IVec3) -> usize {
    ((offset.x + 1) * 9 + (offset.y + 1) * 3 + (offset.z + 1)) as usize
}

/// Node evaluator for agents that fly.
#[derive(Debug)]
pub struct FlyNodeEvaluator {
    base: EvaluatorBase,
    path_types: FxHashMap<i64, PathType>,
    rng: SmallRng,
}

impl Default for FlyNodeEvaluator {
    fn default() -> Self {
        Self::new(Capabilities::default())
    }
}

impl FlyNodeEvaluator {
    pub fn new(capabilities: Capabilities) -> Self {
        FlyNodeEvaluator {
            base: EvaluatorBase::new(capabilities),
            path_types: FxHashMap::default(),
            rng: SmallRng::seed_from_u64(0),
        }
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

        let path_type = match self.base.agent.as_ref() {
            Some(agent) => mob_path_type(&self.base, flight_path_type, context, x, y, z, agent),
            None => PathType::Blocked,
        };
        self.path_types.insert(key, path_type);
        path_type
    }

    fn can_start_at(&mut self, context: &mut PathfindingContext, pos: IVec3) -> bool {
        let path_type = self.cached_path_type(context, pos.x, pos.y, pos.z);
        self.base.malus(path_type) >= 0.0
    }

    fn start_node(&mut self, context: &mut PathfindingContext, pos: IVec3) -> NodeId {
        let path_type = self.cached_path_type(context, pos.x, pos.y, pos.z);
        let malus = self.base.malus(path_type);
        let id = self.base.node(pos.x, pos.y, pos.z);
        let node = &mut self.base.nodes[id];
        node.path_type = path_type;
        node.cost_malus = malus;
        id
    }

    /// Fallback start positions when the agent's own block can't be entered.
    fn start_candidates(&mut self, agent: &Agent) -> SmallVec<[IVec3; 10]> {
        let aabb = agent.bounding_box();
        if aabb.average_size() >= 1.0 {
            let y = agent.block_position().y;
            return [
                (aabb.min.x, aabb.min.z),
                (aabb.min.x, aabb.max.z),
                (aabb.max.x, aabb.min.z),
                (aabb.max.x, aabb.max.z),
            ]
            .into_iter()
            .map(|(x, z)| IVec3::new(x.floor() as i32, y, z.floor() as i32))
            .collect();
        }

        // Small agents sample their surroundings instead.
        let size = aabb.size();
        let inflated = aabb.inflate(DVec3::new(
            (1.1 - size.x).max(0.0),
            (1.1 - size.y).max(0.0),
            (1.1 - size.z).max(0.0),
        ));
        let min = inflated.min.floor().as_ivec3();
        let max = inflated.max.floor().as_ivec3();
        (0..10)
            .map(|_| {
                IVec3::new(
                    self.rng.random_range(min.x..=max.x),
                    self.rng.random_range(min.y..=max.y),
                    self.rng.random_range(min.z..=max.z),
                )
            })
            .collect()
    }

    fn find_accepted_node(
        &mut self,
        context: &mut PathfindingContext,
        pos: IVec3,
    ) -> Option<NodeId> {
        let path_type = self.cached_path_type(context, pos.x, pos.y, pos.z);
        let mut malus = self.base.malus(path_type);
        if malus < 0.0 {
            return None;
        }

        // Flying agents prefer to stay off the ground.
        if path_type == PathType::Walkable {
            malus += 1.0;
        }

        let id = self.base.node(pos.x, pos.y, pos.z);
        let node = &mut self.base.nodes[id];
        node.path_type = path_type;
        node.cost_malus = node.cost_malus.max(malus);
        Some(id)
    }

    fn has_malus(&self, node: Option<NodeId>) -> bool {
        node.is_some_and(|id| self.base.nodes[id].cost_malus >= 0.0)
    }

    fn is_open(&self, node: Option<NodeId>) -> bool {
        node.is_some_and(|id| !self.base.nodes[id].closed)
    }
}

impl NodeEvaluator for FlyNodeEvaluator {
    fn base(&self) -> &EvaluatorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EvaluatorBase {
        &mut self.base
    }

    fn prepare(&mut self, agent: &Agent) {
        self.base.prepare(agent);
        self.path_types.clear();
        self.rng = SmallRng::seed_from_u64(agent.seed);
    }

    fn done(&mut self) {
        self.path_types.clear();
        self.base.done();
    }

    fn start(&mut self, context: &mut PathfindingContext) -> Result<NodeId, NavError> {
        let agent = self.base.agent()?.clone();
        let block_position = agent.block_position();

        let y = if self.base.capabilities.can_float && agent.in_water {
            let mut y = block_position.y;
            while context.block_state(IVec3::new(block_position.x, y, block_position.z)).kind
                == BlockKind::Water
            {
                y += 1;
            }
            y
        } else {
            (agent.position.y + 0.5).floor() as i32
        };

        let pos = IVec3::new(block_position.x, y, block_position.z);
        if !self.can_start_at(context, pos) {
            for candidate in self.start_candidates(&agent) {
                if self.can_start_at(context, candidate) {
                    return Ok(self.start_node(context, candidate));
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
        let pos = self.base.nodes[node].pos();
        let mut around = [None; 27];
        for offset in OFFSETS {
            let offset = IVec3::from_array(offset);
            around[slot(offset)] = self.find_accepted_node(context, pos + offset);
        }

        let mut count = 0;
        for offset in OFFSETS {
            let offset = IVec3::from_array(offset);
            let candidate = around[slot(offset)];
            if !self.is_open(candidate) {
                continue;
            }

            // Diagonal moves need every face and edge they sweep past to be passable.
            let axes = [
                IVec3::new(offset.x, 0, 0),
                IVec3::new(0, offset.y, 0),
                IVec3::new(0, 0, offset.z),
            ];
            let clear = (1..7u8).all(|mask| {
                let part: IVec3 = (0..3)
                    .filter(|bit| mask & (1u8 << *bit) != 0)
                    .map(|bit| axes[bit])
                    .sum();
                part == IVec3::ZERO || part == offset || self.has_malus(around[slot(part)])
            });

            if clear {
                if let Some(candidate) = candidate {
                    push_neighbor(out, &mut count, candidate);
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
        mob_path_type(&self.base, flight_path_type, context, x, y, z, agent)
    }

    fn path_type(&self, context: &mut PathfindingContext, x: i32, y: i32, z: i32) -> PathType {
        flight_path_type(context, x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{block::BlockState, terrain::VoxelTerrain, MAX_NEIGHBORS};
    use bevy::math::UVec3;

    fn sky() -> VoxelTerrain {
        let mut terrain = VoxelTerrain::new(UVec3::new(9, 9, 9), IVec3::ZERO);
        terrain
            .fill(IVec3::ZERO, IVec3::new(8, 0, 8), BlockState::SOLID)
            .unwrap();
        terrain
    }

    fn bird(x: f64, y: f64, z: f64) -> Agent {
        Agent::new(DVec3::new(x, y, z), 0.5, 0.9).on_ground(false)
    }

    fn expand(
        evaluator: &mut FlyNodeEvaluator,
        context: &mut PathfindingContext,
        node: NodeId,
    ) -> Vec<IVec3> {
        let mut out = [0; MAX_NEIGHBORS];
        let count = evaluator.neighbors(context, node, &mut out);
        out[..count]
            .iter()
            .map(|id| evaluator.nodes()[*id].pos())
            .collect()
    }

    #[test]
    fn test_flight_path_type() {
        let mut terrain = sky();
        terrain.set_block(IVec3::new(2, 1, 2), BlockKind::Fence).unwrap();
        terrain.set_block(IVec3::new(6, 0, 6), BlockKind::Magma).unwrap();
        let mut context = PathfindingContext::uncached(&terrain, IVec3::new(4, 5, 4));

        assert_eq!(flight_path_type(&mut context, 4, 5, 4), PathType::Open);
        assert_eq!(flight_path_type(&mut context, 4, 1, 4), PathType::Walkable);
        assert_eq!(flight_path_type(&mut context, 2, 2, 2), PathType::Fence);
        assert_eq!(flight_path_type(&mut context, 6, 1, 6), PathType::DamageFire);
        assert_eq!(flight_path_type(&mut context, 5, 1, 5), PathType::DangerFire);
    }

    #[test]
    fn test_fence_the_agent_stands_in_is_ignored() {
        let mut terrain = sky();
        terrain.set_block(IVec3::new(2, 1, 2), BlockKind::Fence).unwrap();

        let mut context = PathfindingContext::uncached(&terrain, IVec3::new(2, 1, 2));
        assert_eq!(flight_path_type(&mut context, 2, 2, 2), PathType::Open);

        let mut context = PathfindingContext::uncached(&terrain, IVec3::new(2, 2, 2));
        assert_eq!(flight_path_type(&mut context, 2, 2, 2), PathType::Fence);
    }

    #[test]
    fn test_floating_start_above_the_water() {
        let mut terrain = sky();
        terrain
            .fill(IVec3::new(2, 1, 2), IVec3::new(6, 3, 6), BlockState::WATER)
            .unwrap();
        let agent = bird(4.5, 1.2, 4.5).in_water(true);
        let mut context = PathfindingContext::uncached(&terrain, agent.block_position());

        let mut floater = FlyNodeEvaluator::new(Capabilities::default().float(true));
        floater.prepare(&agent);
        let start = floater.start(&mut context).unwrap();
        assert_eq!(floater.nodes()[start].pos(), IVec3::new(4, 4, 4));
        assert_eq!(floater.nodes()[start].path_type, PathType::WaterBorder);

        let mut diver = FlyNodeEvaluator::default();
        diver.prepare(&agent);
        let start = diver.start(&mut context).unwrap();
        assert_eq!(diver.nodes()[start].pos(), IVec3::new(4, 1, 4));
        assert_eq!(diver.nodes()[start].path_type, PathType::Water);
    }

    #[test]
    fn test_open_air_has_26_neighbors() {
        let terrain = sky();
        let agent = bird(4.5, 4.0, 4.5);
        let mut evaluator = FlyNodeEvaluator::default();
        evaluator.prepare(&agent);
        let mut context = PathfindingContext::uncached(&terrain, agent.block_position());

        let start = evaluator.start(&mut context).unwrap();
        assert_eq!(evaluator.nodes()[start].pos(), IVec3::new(4, 4, 4));
        assert_eq!(expand(&mut evaluator, &mut context, start).len(), 26);
    }

    #[test]
    fn test_ground_costs_extra() {
        let terrain = sky();
        // Wider than a block, so ground isn't collapsed to open space.
        let agent = Agent::new(DVec3::new(4.5, 2.0, 4.5), 1.0, 0.9);
        let mut evaluator = FlyNodeEvaluator::default();
        evaluator.prepare(&agent);
        let mut context = PathfindingContext::uncached(&terrain, agent.block_position());
        let start = evaluator.start(&mut context).unwrap();
        expand(&mut evaluator, &mut context, start);
        expand(&mut evaluator, &mut context, start);

        let ground = evaluator.nodes().find(IVec3::new(4, 1, 4)).unwrap();
        let air = evaluator.nodes().find(IVec3::new(4, 3, 4)).unwrap();
        assert_eq!(evaluator.nodes()[ground].path_type, PathType::Walkable);
        assert_eq!(evaluator.nodes()[ground].cost_malus, 1.0);
        assert_eq!(evaluator.nodes()[air].cost_malus, 0.0);
    }

    #[test]
    fn test_no_corner_cutting() {
        let mut terrain = sky();
        // A pillar east of the agent.
        terrain
            .fill(IVec3::new(5, 1, 4), IVec3::new(5, 8, 4), BlockState::SOLID)
            .unwrap();
        let agent = bird(4.5, 4.0, 4.5);
        let mut evaluator = FlyNodeEvaluator::default();
        evaluator.prepare(&agent);
        let mut context = PathfindingContext::uncached(&terrain, agent.block_position());
        let start = evaluator.start(&mut context).unwrap();

        let neighbors = expand(&mut evaluator, &mut context, start);
        assert!(!neighbors.contains(&IVec3::new(5, 4, 4)));
        assert!(!neighbors.contains(&IVec3::new(5, 4, 5)));
        assert!(!neighbors.contains(&IVec3::new(5, 5, 3)));
        assert!(neighbors.contains(&IVec3::new(3, 4, 5)));
        // One face, four edges and four corners lean on the pillar.
        assert_eq!(neighbors.len(), 26 - 9);
    }

    #[test]
    fn test_start_falls_back_to_a_sampled_position() {
        let mut terrain = sky();
        terrain.set_block(IVec3::new(4, 4, 4), BlockState::SOLID).unwrap();
        let agent = bird(4.5, 4.0, 4.5).with_seed(7);
        let mut evaluator = FlyNodeEvaluator::default();
        evaluator.prepare(&agent);
        let mut context = PathfindingContext::uncached(&terrain, agent.block_position());

        let start = evaluator.start(&mut context).unwrap();
        let pos = evaluator.nodes()[start].pos();
        assert!((pos - IVec3::new(4, 4, 4)).abs().max_element() <= 1);

        // Same seed, same sample.
        evaluator.prepare(&agent);
        let again = evaluator.start(&mut context).unwrap();
        assert_eq!(evaluator.nodes()[again].pos(), pos);
    }
}
