//! This module defines the `Node` vertex, its pool and search `Target`s.
use bevy::math::IVec3;
use indexmap::map::Entry::{Occupied, Vacant};
use std::hash::{Hash, Hasher};
use std::ops::{Index, IndexMut};

use crate::{cache::pack_pos, path_type::PathType, FxIndexMap, NodeId};

/// A vertex of the search graph: one block position plus A* bookkeeping.
#[derive(Debug, Clone)]
pub struct Node {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Position in the open set heap, -1 when not queued.
    pub heap_index: i32,
    /// Cost from the start.
    pub g: f32,
    /// Estimated cost to the closest target.
    pub h: f32,
    pub f: f32,
    pub came_from: Option<NodeId>,
    pub closed: bool,
    pub walked_distance: f32,
    /// Additive traversal penalty, negative when the agent can't enter the node.
    pub cost_malus: f32,
    pub path_type: PathType,
}

impl Node {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Node {
            x,
            y,
            z,
            heap_index: -1,
            g: 0.0,
            h: 0.0,
            f: 0.0,
            came_from: None,
            closed: false,
            walked_distance: 0.0,
            cost_malus: 0.0,
            path_type: PathType::Blocked,
        }
    }

    pub fn pos(&self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }

    pub fn in_open_set(&self) -> bool {
        self.heap_index >= 0
    }

    pub fn distance_to(&self, other: &Node) -> f32 {
        self.distance_to_pos(other.pos())
    }

    pub fn distance_to_pos(&self, pos: IVec3) -> f32 {
        (pos - self.pos()).as_vec3().length()
    }

    pub fn distance_manhattan(&self, pos: IVec3) -> f32 {
        let delta = (pos - self.pos()).abs();
        (delta.x + delta.y + delta.z) as f32
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y && self.z == other.z
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pos().hash(state);
    }
}

/// Nodes created during one search, keyed by packed position.
///
/// A position always resolves to the same [`NodeId`] until the pool is cleared, so cost and
/// closed state never split across duplicate vertices.
#[derive(Debug, Default, Clone)]
pub struct NodePool {
    nodes: FxIndexMap<i64, Node>,
}

impl NodePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node at the given position, creating it on first use.
    pub fn get_or_insert(&mut self, x: i32, y: i32, z: i32) -> NodeId {
        match self.nodes.entry(pack_pos(IVec3::new(x, y, z))) {
            Occupied(e) => e.index(),
            Vacant(e) => {
                let id = e.index();
                e.insert(Node::new(x, y, z));
                id
            }
        }
    }

    /// Looks up an existing node without creating one.
    pub fn find(&self, pos: IVec3) -> Option<NodeId> {
        self.nodes.get_index_of(&pack_pos(pos))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get_index(id).map(|(_, node)| node)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_index_mut(id).map(|(_, node)| node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.values().enumerate()
    }
}

impl Index<NodeId> for NodePool {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

impl IndexMut<NodeId> for NodePool {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }
}

/// A goal node that remembers the closest node the search got to it.
#[derive(Debug, Clone)]
pub struct Target {
    pub node: NodeId,
    pub pos: IVec3,
    pub best_heuristic: f32,
    pub best_node: Option<NodeId>,
    pub reached: bool,
}

impl Target {
    pub fn new(node: NodeId, pos: IVec3) -> Self {
        Target {
            node,
            pos,
            best_heuristic: f32::MAX,
            best_node: None,
            reached: false,
        }
    }

    /// Records `node` if `heuristic` beats the closest approach so far.
    pub fn update_best(&mut self, heuristic: f32, node: NodeId) {
        if heuristic < self.best_heuristic {
            self.best_heuristic = heuristic;
            self.best_node = Some(node);
        }
    }

    pub fn set_reached(&mut self) {
        self.reached = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_eq() {
        let mut node1 = Node::new(1, 2, 3);
        let node2 = Node::new(1, 2, 3);
        node1.cost_malus = 4.0;
        node1.path_type = PathType::Water;

        assert_eq!(node1, node2);
        assert_ne!(node1, Node::new(1, 2, 4));
    }

    #[test]
    fn test_node_hash() {
        let node1 = Node::new(1, 2, 3);
        let mut node2 = Node::new(1, 2, 3);
        node2.closed = true;

        let mut hasher1 = std::collections::hash_map::DefaultHasher::new();
        let mut hasher2 = std::collections::hash_map::DefaultHasher::new();

        node1.hash(&mut hasher1);
        node2.hash(&mut hasher2);

        assert_eq!(hasher1.finish(), hasher2.finish());
    }

    #[test]
    fn test_pool_identity() {
        let mut pool = NodePool::new();
        let a = pool.get_or_insert(1, -2, 3);
        let b = pool.get_or_insert(4, 5, 6);
        pool[a].g = 7.0;

        assert_ne!(a, b);
        assert_eq!(pool.get_or_insert(1, -2, 3), a);
        assert_eq!(pool[a].g, 7.0);
        assert_eq!(pool.find(IVec3::new(4, 5, 6)), Some(b));
        assert_eq!(pool.len(), 2);

        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.find(IVec3::new(1, -2, 3)), None);
    }

    #[test]
    fn test_target_tracks_best_node() {
        let mut target = Target::new(0, IVec3::ZERO);
        target.update_best(5.0, 1);
        target.update_best(7.0, 2);
        target.update_best(3.0, 3);

        assert_eq!(target.best_node, Some(3));
        assert_eq!(target.best_heuristic, 3.0);
    }

    #[test]
    fn test_distances() {
        let node = Node::new(0, 0, 0);
        assert_eq!(node.distance_to(&Node::new(3, 4, 0)), 5.0);
        assert_eq!(node.distance_manhattan(IVec3::new(1, -2, 3)), 6.0);
        assert!(!node.in_open_set());
    }
}
