//! The [`NodeEvaluator`] contract shared by every locomotion mode.
use bevy::log::{trace, warn};
use thiserror::Error;

use crate::{
    agent::Agent,
    context::PathfindingContext,
    node::{NodePool, Target},
    path_type::PathType,
    NodeId,
};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NavError {
    /// `start` was called outside a `prepare`/`done` bracket.
    #[error("node evaluator used before prepare() or after done()")]
    NotPrepared,
}

/// Movement toggles of an evaluator, set before a search starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub can_pass_doors: bool,
    pub can_open_doors: bool,
    pub can_float: bool,
    pub can_walk_over_fences: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            can_pass_doors: true,
            can_open_doors: false,
            can_float: false,
            can_walk_over_fences: false,
        }
    }
}

impl Capabilities {
    pub fn pass_doors(mut self, value: bool) -> Self {
        self.can_pass_doors = value;
        self
    }

    pub fn open_doors(mut self, value: bool) -> Self {
        self.can_open_doors = value;
        self
    }

    pub fn float(mut self, value: bool) -> Self {
        self.can_float = value;
        self
    }

    pub fn walk_over_fences(mut self, value: bool) -> Self {
        self.can_walk_over_fences = value;
        self
    }
}

/// State every evaluator owns: the node pool, the agent of the current run, its block
/// footprint and the capability toggles.
#[derive(Debug, Default, Clone)]
pub struct EvaluatorBase {
    pub(crate) nodes: NodePool,
    pub(crate) agent: Option<Agent>,
    pub(crate) entity_width: i32,
    pub(crate) entity_height: i32,
    pub(crate) entity_depth: i32,
    pub(crate) capabilities: Capabilities,
}

impl EvaluatorBase {
    pub fn new(capabilities: Capabilities) -> Self {
        EvaluatorBase {
            capabilities,
            ..Default::default()
        }
    }

    /// Starts a run for `agent`, dropping every node of the previous one.
    pub fn prepare(&mut self, agent: &Agent) {
        self.nodes.clear();
        // Partially overlapped blocks count as occupied.
        self.entity_width = (agent.width + 1.0).floor() as i32;
        self.entity_height = (agent.height + 1.0).floor() as i32;
        self.entity_depth = (agent.width + 1.0).floor() as i32;
        self.agent = Some(agent.clone());

        trace!(
            "prepared node evaluator for footprint {}x{}x{}",
            self.entity_width,
            self.entity_height,
            self.entity_depth
        );
    }

    pub fn done(&mut self) {
        if self.agent.take().is_none() {
            warn!("node evaluator finished without a matching prepare()");
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.agent.is_some()
    }

    pub fn agent(&self) -> Result<&Agent, NavError> {
        self.agent.as_ref().ok_or(NavError::NotPrepared)
    }

    /// Malus of `path_type` for the current agent, impassable when no run is prepared.
    #[inline]
    pub fn malus(&self, path_type: PathType) -> f32 {
        self.agent
            .as_ref()
            .map_or(-1.0, |agent| agent.malus.get(path_type))
    }

    /// Overrides a malus for the current run only, the caller's [`Agent`] is left untouched.
    pub fn set_malus(&mut self, path_type: PathType, malus: f32) {
        if let Some(agent) = self.agent.as_mut() {
            agent.malus.set(path_type, malus);
        }
    }

    #[inline]
    pub fn node(&mut self, x: i32, y: i32, z: i32) -> NodeId {
        self.nodes.get_or_insert(x, y, z)
    }

    /// Target at the block containing the given point.
    pub fn target_at(&mut self, x: f64, y: f64, z: f64) -> Target {
        let id = self.node(x.floor() as i32, y.floor() as i32, z.floor() as i32);
        Target::new(id, self.nodes[id].pos())
    }

    pub fn footprint(&self) -> (i32, i32, i32) {
        (self.entity_width, self.entity_height, self.entity_depth)
    }
}

/// Writes `node` to the next free slot of `out`, dropping it when the buffer is full.
#[inline]
pub(crate) fn push_neighbor(out: &mut [NodeId], count: &mut usize, node: NodeId) {
    if *count < out.len() {
        out[*count] = node;
        *count += 1;
    }
}

/// Turns terrain around an agent into graph vertices for one locomotion mode.
///
/// A search calls [`NodeEvaluator::prepare`] once, then any number of
/// [`NodeEvaluator::start`], [`NodeEvaluator::target`] and [`NodeEvaluator::neighbors`],
/// and finally [`NodeEvaluator::done`], also when the search is abandoned early.
/// The [`PathfindingContext`] passed to each call must be the same for the whole run.
///
/// Evaluators hold unsynchronized per-run state, concurrent searches need one instance each.
pub trait NodeEvaluator {
    fn base(&self) -> &EvaluatorBase;

    fn base_mut(&mut self) -> &mut EvaluatorBase;

    /// Clears the node pool and derives the agent's block footprint.
    fn prepare(&mut self, agent: &Agent);

    /// Releases the agent and any per-run caches.
    fn done(&mut self);

    /// The node the agent currently occupies.
    fn start(&mut self, context: &mut PathfindingContext) -> Result<NodeId, NavError>;

    /// Wraps a goal point as a [`Target`].
    fn target(&mut self, x: f64, y: f64, z: f64) -> Target;

    /// Fills `out` with the nodes reachable from `node` in one step and returns how many
    /// were written. Never writes past `out.len()`.
    fn neighbors(
        &mut self,
        context: &mut PathfindingContext,
        node: NodeId,
        out: &mut [NodeId],
    ) -> usize;

    /// Path type of the agent's whole body standing at the given block.
    fn path_type_of_mob(
        &self,
        context: &mut PathfindingContext,
        x: i32,
        y: i32,
        z: i32,
        agent: &Agent,
    ) -> PathType;

    /// Path type of a single block, taking its surroundings into account.
    fn path_type(&self, context: &mut PathfindingContext, x: i32, y: i32, z: i32) -> PathType;

    fn nodes(&self) -> &NodePool {
        &self.base().nodes
    }

    fn nodes_mut(&mut self) -> &mut NodePool {
        &mut self.base_mut().nodes
    }

    fn capabilities(&self) -> Capabilities {
        self.base().capabilities
    }

    fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.base_mut().capabilities = capabilities;
    }

    fn can_pass_doors(&self) -> bool {
        self.base().capabilities.can_pass_doors
    }

    fn set_can_pass_doors(&mut self, value: bool) {
        self.base_mut().capabilities.can_pass_doors = value;
    }

    fn can_open_doors(&self) -> bool {
        self.base().capabilities.can_open_doors
    }

    fn set_can_open_doors(&mut self, value: bool) {
        self.base_mut().capabilities.can_open_doors = value;
    }

    fn can_float(&self) -> bool {
        self.base().capabilities.can_float
    }

    fn set_can_float(&mut self, value: bool) {
        self.base_mut().capabilities.can_float = value;
    }

    fn can_walk_over_fences(&self) -> bool {
        self.base().capabilities.can_walk_over_fences
    }

    fn set_can_walk_over_fences(&mut self, value: bool) {
        self.base_mut().capabilities.can_walk_over_fences = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::{DVec3, IVec3};

    #[test]
    fn test_footprint_rounds_up() {
        let mut base = EvaluatorBase::default();
        base.prepare(&Agent::new(DVec3::ZERO, 0.6, 1.8));
        assert_eq!(base.footprint(), (1, 2, 1));

        base.prepare(&Agent::new(DVec3::ZERO, 1.0, 2.0));
        assert_eq!(base.footprint(), (2, 3, 2));
    }

    #[test]
    fn test_prepare_clears_nodes() {
        let mut base = EvaluatorBase::default();
        base.prepare(&Agent::default());
        base.node(1, 2, 3);
        assert_eq!(base.nodes.len(), 1);

        base.prepare(&Agent::default());
        assert!(base.nodes.is_empty());
    }

    #[test]
    fn test_done_releases_agent() {
        let mut base = EvaluatorBase::default();
        base.prepare(&Agent::default());
        assert!(base.agent().is_ok());
        assert_eq!(base.malus(PathType::Water), 8.0);

        base.done();
        assert_eq!(base.agent().err(), Some(NavError::NotPrepared));
        assert_eq!(base.malus(PathType::Water), -1.0);
    }

    #[test]
    fn test_run_malus_override_leaves_agent_untouched() {
        let agent = Agent::default();
        let mut base = EvaluatorBase::default();
        base.prepare(&agent);
        base.set_malus(PathType::Water, 0.0);

        assert_eq!(base.malus(PathType::Water), 0.0);
        assert_eq!(agent.malus.get(PathType::Water), 8.0);
    }

    #[test]
    fn test_target_floors_coordinates() {
        let mut base = EvaluatorBase::default();
        base.prepare(&Agent::default());
        let target = base.target_at(1.7, -0.5, 3.0);
        assert_eq!(target.pos, IVec3::new(1, -1, 3));
        assert_eq!(base.nodes[target.node].pos(), target.pos);
    }

    #[test]
    fn test_push_neighbor_respects_capacity() {
        let mut out = [0; 2];
        let mut count = 0;
        for id in 0..5 {
            push_neighbor(&mut out, &mut count, id);
        }
        assert_eq!(count, 2);
        assert_eq!(out, [0, 1]);
    }
}
