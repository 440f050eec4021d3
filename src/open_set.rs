//! Binary min-heap of open nodes keyed on `f`, with decrease-key support.
use crate::{node::NodePool, NodeId};

/// Nodes waiting to be expanded. Each queued node stores its heap slot in
/// [`crate::node::Node::heap_index`], so its cost can be changed in place.
#[derive(Debug, Default)]
pub(crate) struct OpenSet {
    heap: Vec<NodeId>,
}

impl OpenSet {
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Forgets all queued nodes. The pool is expected to be cleared alongside.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn insert(&mut self, nodes: &mut NodePool, id: NodeId) {
        debug_assert!(!nodes[id].in_open_set(), "node queued twice");
        self.heap.push(id);
        let index = self.heap.len() - 1;
        nodes[id].heap_index = index as i32;
        self.up_heap(nodes, index);
    }

    /// Removes and returns the node with the lowest `f`.
    pub fn pop(&mut self, nodes: &mut NodePool) -> Option<NodeId> {
        let last = self.heap.pop()?;
        let top = if self.heap.is_empty() {
            last
        } else {
            let top = std::mem::replace(&mut self.heap[0], last);
            nodes[last].heap_index = 0;
            self.down_heap(nodes, 0);
            top
        };

        nodes[top].heap_index = -1;
        Some(top)
    }

    /// Updates the `f` of a queued node and restores heap order.
    pub fn change_cost(&mut self, nodes: &mut NodePool, id: NodeId, f: f32) {
        let old = nodes[id].f;
        nodes[id].f = f;
        let index = nodes[id].heap_index as usize;
        if f < old {
            self.up_heap(nodes, index);
        } else {
            self.down_heap(nodes, index);
        }
    }

    fn up_heap(&mut self, nodes: &mut NodePool, mut index: usize) {
        let id = self.heap[index];
        let f = nodes[id].f;

        while index > 0 {
            let parent = (index - 1) / 2;
            let parent_id = self.heap[parent];
            if f >= nodes[parent_id].f {
                break;
            }
            self.heap[index] = parent_id;
            nodes[parent_id].heap_index = index as i32;
            index = parent;
        }

        self.heap[index] = id;
        nodes[id].heap_index = index as i32;
    }

    fn down_heap(&mut self, nodes: &mut NodePool, mut index: usize) {
        let id = self.heap[index];
        let f = nodes[id].f;

        loop {
            let left = index * 2 + 1;
            if left >= self.heap.len() {
                break;
            }
            let right = left + 1;
            let child = if right < self.heap.len()
                && nodes[self.heap[right]].f < nodes[self.heap[left]].f
            {
                right
            } else {
                left
            };

            let child_id = self.heap[child];
            if nodes[child_id].f >= f {
                break;
            }
            self.heap[index] = child_id;
            nodes[child_id].heap_index = index as i32;
            index = child;
        }

        self.heap[index] = id;
        nodes[id].heap_index = index as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with_costs(costs: &[f32]) -> (NodePool, Vec<NodeId>) {
        let mut pool = NodePool::new();
        let ids = costs
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let id = pool.get_or_insert(i as i32, 0, 0);
                pool[id].f = *f;
                id
            })
            .collect();
        (pool, ids)
    }

    #[test]
    fn test_pops_in_cost_order() {
        let (mut pool, ids) = pool_with_costs(&[5.0, 1.0, 4.0, 2.0, 3.0]);
        let mut open = OpenSet::default();
        for id in &ids {
            open.insert(&mut pool, *id);
        }
        assert_eq!(open.len(), 5);

        let popped: Vec<NodeId> = std::iter::from_fn(|| open.pop(&mut pool)).collect();
        let order: Vec<f32> = popped.iter().map(|id| pool[*id].f).collect();
        assert_eq!(order, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(open.is_empty());
        assert!(ids.iter().all(|id| !pool[*id].in_open_set()));
    }

    #[test]
    fn test_change_cost() {
        let (mut pool, ids) = pool_with_costs(&[5.0, 1.0, 4.0]);
        let mut open = OpenSet::default();
        for id in &ids {
            open.insert(&mut pool, *id);
        }

        open.change_cost(&mut pool, ids[0], 0.5);
        assert_eq!(open.pop(&mut pool), Some(ids[0]));

        open.change_cost(&mut pool, ids[1], 10.0);
        assert_eq!(open.pop(&mut pool), Some(ids[2]));
        assert_eq!(open.pop(&mut pool), Some(ids[1]));
        assert_eq!(open.pop(&mut pool), None);
    }

    #[test]
    fn test_heap_index_tracks_slot() {
        let (mut pool, ids) = pool_with_costs(&[3.0, 2.0, 1.0]);
        let mut open = OpenSet::default();
        for id in &ids {
            open.insert(&mut pool, *id);
        }

        for (slot, id) in open.heap.iter().enumerate() {
            assert_eq!(pool[*id].heap_index, slot as i32);
        }
    }
}
