//! This module defines the A* driver that searches the graph a [`NodeEvaluator`] exposes.
use bevy::{
    log::{debug, warn},
    math::IVec3,
};

use crate::{
    agent::Agent,
    context::PathfindingContext,
    evaluator::NodeEvaluator,
    node::{NodePool, Target},
    open_set::OpenSet,
    path::{Path, PathPoint},
    settings::SearchSettings,
    timed, NodeId, MAX_NEIGHBORS,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Heuristic is inflated to favour nodes close to a target over exhaustive search.
const HEURISTIC_WEIGHT: f32 = 1.5;

/// Runs A* over the nodes produced by a [`NodeEvaluator`].
///
/// One finder runs one search at a time. For concurrent searches give each thread its own
/// finder, see [`find_paths_parallel`].
#[derive(Debug)]
pub struct PathFinder<E: NodeEvaluator> {
    evaluator: E,
    settings: SearchSettings,
    open_set: OpenSet,
    neighbors: [NodeId; MAX_NEIGHBORS],
}

impl<E: NodeEvaluator> PathFinder<E> {
    pub fn new(evaluator: E, settings: SearchSettings) -> Self {
        PathFinder {
            evaluator,
            settings,
            open_set: OpenSet::default(),
            neighbors: [0; MAX_NEIGHBORS],
        }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn evaluator_mut(&mut self) -> &mut E {
        &mut self.evaluator
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: SearchSettings) {
        self.settings = settings;
    }

    /// Searches for the cheapest path from the agent to any of `targets`.
    ///
    /// Returns the shortest path to a reached target, otherwise a partial path to the node
    /// that got closest. `None` when there are no targets or the evaluator has no start node.
    pub fn find_path(
        &mut self,
        context: &mut PathfindingContext,
        agent: &Agent,
        targets: &[IVec3],
    ) -> Option<Path> {
        if targets.is_empty() {
            return None;
        }

        timed!("find_path", {
            self.open_set.clear();
            self.evaluator.prepare(agent);

            let path = match self.evaluator.start(context) {
                Ok(start) => {
                    let targets = targets
                        .iter()
                        .map(|pos| {
                            let target = self.evaluator.target(
                                pos.x as f64,
                                pos.y as f64,
                                pos.z as f64,
                            );
                            (target, *pos)
                        })
                        .collect();
                    self.search(context, start, targets)
                }
                Err(err) => {
                    warn!("Couldn't start search: {}", err);
                    None
                }
            };

            self.evaluator.done();
            path
        })
    }

    fn search(
        &mut self,
        context: &mut PathfindingContext,
        start: NodeId,
        mut targets: Vec<(Target, IVec3)>,
    ) -> Option<Path> {
        let SearchSettings {
            max_range,
            accuracy,
            ..
        } = self.settings;
        let budget = self.settings.visit_budget();

        {
            let nodes = self.evaluator.nodes_mut();
            let h = best_heuristic(nodes, start, &mut targets);
            let node = &mut nodes[start];
            node.g = 0.0;
            node.h = h;
            node.f = h;
        }
        self.open_set.insert(self.evaluator.nodes_mut(), start);

        let mut reached = Vec::new();
        let mut visited = 0;

        while !self.open_set.is_empty() {
            visited += 1;
            if visited >= budget {
                break;
            }

            let Some(current) = self.open_set.pop(self.evaluator.nodes_mut()) else {
                break;
            };
            let nodes = self.evaluator.nodes_mut();
            nodes[current].closed = true;

            for (index, (target, _)) in targets.iter_mut().enumerate() {
                if nodes[current].distance_manhattan(target.pos) <= accuracy as f32 {
                    target.set_reached();
                    reached.push(index);
                }
            }
            if !reached.is_empty() {
                break;
            }

            if nodes[current].distance_to(&nodes[start]) >= max_range {
                continue;
            }

            let count = self
                .evaluator
                .neighbors(context, current, &mut self.neighbors);
            for &next in &self.neighbors[..count] {
                let nodes = self.evaluator.nodes_mut();
                let distance = nodes[current].distance_to(&nodes[next]);
                let walked_distance = nodes[current].walked_distance + distance;
                let g = nodes[current].g + distance + nodes[next].cost_malus;
                nodes[next].walked_distance = walked_distance;

                if walked_distance >= max_range || (nodes[next].in_open_set() && g >= nodes[next].g)
                {
                    continue;
                }

                nodes[next].came_from = Some(current);
                nodes[next].g = g;
                let h = best_heuristic(nodes, next, &mut targets) * HEURISTIC_WEIGHT;
                nodes[next].h = h;

                if nodes[next].in_open_set() {
                    self.open_set.change_cost(nodes, next, g + h);
                } else {
                    nodes[next].f = g + h;
                    self.open_set.insert(nodes, next);
                }
            }
        }

        debug!(
            "Search visited {} nodes, {} created, {} still open",
            visited,
            self.evaluator.nodes().len(),
            self.open_set.len()
        );

        let nodes = self.evaluator.nodes();
        if !reached.is_empty() {
            reached
                .iter()
                .filter_map(|index| {
                    let (target, pos) = &targets[*index];
                    target
                        .best_node
                        .map(|best| reconstruct_path(nodes, best, *pos, true))
                })
                .min_by_key(|path| path.len())
        } else {
            targets
                .iter()
                .filter_map(|(target, pos)| {
                    target
                        .best_node
                        .map(|best| reconstruct_path(nodes, best, *pos, false))
                })
                .min_by(|a, b| {
                    a.distance_to_target()
                        .total_cmp(&b.distance_to_target())
                        .then(a.len().cmp(&b.len()))
                })
        }
    }
}

/// Distance to the closest target, recording `node` as each target's best approach.
fn best_heuristic(nodes: &NodePool, node: NodeId, targets: &mut [(Target, IVec3)]) -> f32 {
    let mut best = f32::MAX;
    for (target, _) in targets.iter_mut() {
        let h = nodes[node].distance_to_pos(target.pos);
        target.update_best(h, node);
        best = best.min(h);
    }
    best
}

fn reconstruct_path(nodes: &NodePool, end: NodeId, target: IVec3, reached: bool) -> Path {
    let mut points = Vec::new();
    let mut current = Some(end);
    while let Some(id) = current {
        let node = &nodes[id];
        points.push(PathPoint {
            pos: node.pos(),
            path_type: node.path_type,
            cost_malus: node.cost_malus,
        });
        current = node.came_from;
    }
    points.reverse();

    Path::new(points, target, reached, nodes[end].g)
}

/// A single search request for [`find_paths_parallel`].
#[derive(Clone, Debug)]
pub struct PathRequest {
    pub agent: Agent,
    pub targets: Vec<IVec3>,
}

/// Runs independent searches on the rayon thread pool, one evaluator per request.
///
/// Searches read the terrain without the shared path type cache.
#[cfg(feature = "parallel")]
pub fn find_paths_parallel<E, F>(
    terrain: &(dyn crate::terrain::Terrain + Sync),
    settings: SearchSettings,
    requests: &[PathRequest],
    make_evaluator: F,
) -> Vec<Option<Path>>
where
    E: NodeEvaluator,
    F: Fn() -> E + Sync,
{
    timed!("find_paths_parallel", {
        requests
            .par_iter()
            .map(|request| {
                let mut finder = PathFinder::new(make_evaluator(), settings);
                let mut context =
                    PathfindingContext::uncached(terrain, request.agent.block_position());
                finder.find_path(&mut context, &request.agent, &request.targets)
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        block::{BlockKind, BlockState},
        path_type::PathType,
        settings::SearchSettingsBuilder,
        terrain::VoxelTerrain,
        walk::WalkNodeEvaluator,
        world::VoxelWorld,
    };
    use bevy::math::{DVec3, UVec3};

    /// 16x6x16 terrain with a stone floor at y = 0.
    fn field() -> VoxelTerrain {
        let mut terrain = VoxelTerrain::new(UVec3::new(16, 6, 16), IVec3::ZERO);
        terrain
            .fill(IVec3::ZERO, IVec3::new(15, 0, 15), BlockState::SOLID)
            .unwrap();
        terrain
    }

    fn walker() -> PathFinder<WalkNodeEvaluator> {
        PathFinder::new(
            WalkNodeEvaluator::default(),
            SearchSettingsBuilder::new().follow_range(32.0).build(),
        )
    }

    #[test]
    fn test_straight_path() {
        let terrain = field();
        let agent = Agent::new(DVec3::new(2.5, 1.0, 2.5), 0.6, 1.8);
        let mut context = PathfindingContext::uncached(&terrain, agent.block_position());

        let path = walker()
            .find_path(&mut context, &agent, &[IVec3::new(8, 1, 2)])
            .unwrap();

        assert!(path.reached());
        assert_eq!(path.points()[0].pos, IVec3::new(2, 1, 2));
        assert_eq!(path.end().unwrap().pos, IVec3::new(8, 1, 2));
        assert_eq!(path.len(), 7);
        assert!(path.points().iter().all(|p| p.path_type == PathType::Walkable));
        assert!((path.cost() - 6.0).abs() < 1.0e-4);
    }

    #[test]
    fn test_path_around_a_wall() {
        let mut terrain = field();
        terrain
            .fill(IVec3::new(5, 1, 0), IVec3::new(5, 2, 10), BlockState::SOLID)
            .unwrap();
        let agent = Agent::new(DVec3::new(2.5, 1.0, 2.5), 0.6, 1.8);
        let mut context = PathfindingContext::uncached(&terrain, agent.block_position());

        let path = walker()
            .find_path(&mut context, &agent, &[IVec3::new(8, 1, 2)])
            .unwrap();

        assert!(path.reached());
        assert!(path.positions().all(|pos| pos.x != 5 || pos.z > 10));
        assert!(path.positions().any(|pos| pos.z > 10));
    }

    #[test]
    fn test_avoids_damage() {
        let mut terrain = field();
        // A strip of magma with a gap at the far end.
        terrain
            .fill(IVec3::new(5, 0, 0), IVec3::new(5, 0, 7), BlockKind::Magma)
            .unwrap();
        let agent = Agent::new(DVec3::new(2.5, 1.0, 2.5), 0.6, 1.8);
        let mut context = PathfindingContext::uncached(&terrain, agent.block_position());

        let path = walker()
            .find_path(&mut context, &agent, &[IVec3::new(8, 1, 2)])
            .unwrap();

        assert!(path.reached());
        assert!(path
            .points()
            .iter()
            .all(|p| p.path_type != PathType::DamageFire));
    }

    #[test]
    fn test_unreachable_target_gives_partial_path() {
        let mut terrain = field();
        // Enclose the target.
        terrain
            .fill(IVec3::new(9, 1, 0), IVec3::new(9, 3, 15), BlockState::SOLID)
            .unwrap();
        let agent = Agent::new(DVec3::new(2.5, 1.0, 2.5), 0.6, 1.8);
        let mut context = PathfindingContext::uncached(&terrain, agent.block_position());

        let path = walker()
            .find_path(&mut context, &agent, &[IVec3::new(12, 1, 2)])
            .unwrap();

        assert!(!path.reached());
        assert_eq!(path.end().unwrap().pos, IVec3::new(8, 1, 2));
        assert_eq!(path.distance_to_target(), 4.0);
    }

    #[test]
    fn test_closest_of_several_targets() {
        let terrain = field();
        let agent = Agent::new(DVec3::new(2.5, 1.0, 2.5), 0.6, 1.8);
        let mut context = PathfindingContext::uncached(&terrain, agent.block_position());

        let path = walker()
            .find_path(
                &mut context,
                &agent,
                &[IVec3::new(12, 1, 12), IVec3::new(2, 1, 5)],
            )
            .unwrap();

        assert!(path.reached());
        assert_eq!(path.target(), IVec3::new(2, 1, 5));
    }

    #[test]
    fn test_accuracy() {
        let terrain = field();
        let agent = Agent::new(DVec3::new(2.5, 1.0, 2.5), 0.6, 1.8);
        let mut context = PathfindingContext::uncached(&terrain, agent.block_position());
        let mut finder = PathFinder::new(
            WalkNodeEvaluator::default(),
            SearchSettingsBuilder::new().accuracy(2).build(),
        );

        let path = finder
            .find_path(&mut context, &agent, &[IVec3::new(8, 1, 2)])
            .unwrap();

        assert!(path.reached());
        assert_eq!(path.end().unwrap().pos, IVec3::new(6, 1, 2));
    }

    #[test]
    fn test_no_targets() {
        let terrain = field();
        let agent = Agent::new(DVec3::new(2.5, 1.0, 2.5), 0.6, 1.8);
        let mut context = PathfindingContext::uncached(&terrain, agent.block_position());
        assert!(walker().find_path(&mut context, &agent, &[]).is_none());
    }

    #[test]
    fn test_cached_and_uncached_agree() {
        let mut terrain = field();
        terrain
            .fill(IVec3::new(5, 1, 0), IVec3::new(5, 1, 10), BlockKind::Fence)
            .unwrap();
        let agent = Agent::new(DVec3::new(2.5, 1.0, 2.5), 0.6, 1.8);
        let goal = [IVec3::new(8, 1, 2)];

        let mut context = PathfindingContext::uncached(&terrain, agent.block_position());
        let uncached = walker().find_path(&mut context, &agent, &goal).unwrap();

        let mut world = VoxelWorld::new(terrain);
        let mut finder = walker();
        let first = finder
            .find_path(&mut world.context(agent.block_position()), &agent, &goal)
            .unwrap();
        let second = finder
            .find_path(&mut world.context(agent.block_position()), &agent, &goal)
            .unwrap();

        assert_eq!(uncached, first);
        assert_eq!(first, second);
        assert!(!world.path_type_cache().is_empty());
    }

    #[test]
    fn test_world_edit_changes_path() {
        let mut world = VoxelWorld::new(field());
        let agent = Agent::new(DVec3::new(2.5, 1.0, 2.5), 0.6, 1.8);
        let goal = [IVec3::new(8, 1, 2)];
        let mut finder = walker();

        let before = finder
            .find_path(&mut world.context(agent.block_position()), &agent, &goal)
            .unwrap();
        assert!(before.is_position_in_path(IVec3::new(5, 1, 2)));

        world.set_block(IVec3::new(5, 1, 2), BlockState::SOLID).unwrap();
        world.set_block(IVec3::new(5, 2, 2), BlockState::SOLID).unwrap();
        let after = finder
            .find_path(&mut world.context(agent.block_position()), &agent, &goal)
            .unwrap();
        assert!(after.reached());
        assert!(!after.is_position_in_path(IVec3::new(5, 1, 2)));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let terrain = field();
        let requests: Vec<PathRequest> = (0..4)
            .map(|i| PathRequest {
                agent: Agent::new(DVec3::new(2.5, 1.0, 2.5 + i as f64), 0.6, 1.8),
                targets: vec![IVec3::new(10, 1, 10)],
            })
            .collect();
        let settings = SearchSettingsBuilder::new().follow_range(32.0).build();

        let parallel = find_paths_parallel(&terrain, settings, &requests, WalkNodeEvaluator::default);

        for (request, path) in requests.iter().zip(parallel) {
            let mut context =
                PathfindingContext::uncached(&terrain, request.agent.block_position());
            let sequential = walker().find_path(&mut context, &request.agent, &request.targets);
            assert_eq!(path, sequential);
        }
    }
}
