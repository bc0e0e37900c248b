//! The node pool: an arena of nodes addressed by index, reused wholesale
//! across expressions.
//!
//! Nodes between index `0` and `cursor` are "in tree"; the rest are free
//! and will be handed out by the next `acquire`. `reset` just rewinds the
//! cursor -- this is the arena+cursor rendering of the original
//! freelist-of-pointers design (see the crate docs).

use crate::error::{EabError, Result};
use crate::node::{Node, NodeId, NodeKind};
use tracing::trace;

#[derive(Debug)]
pub struct NodePool {
    nodes: Vec<Node>,
    cursor: usize,
}

impl NodePool {
    pub fn with_capacity(initial_size: usize) -> Self {
        let mut nodes = Vec::with_capacity(initial_size);
        nodes.resize(initial_size, Node::placeholder());
        NodePool { nodes, cursor: 0 }
    }

    /// Hand out a node initialized for `kind`, growing the arena by one
    /// slot if every existing node is currently in-tree.
    pub fn acquire(&mut self, kind: NodeKind, line: u32) -> Result<NodeId> {
        let id = if self.cursor < self.nodes.len() {
            self.cursor
        } else {
            self.nodes
                .try_reserve(1)
                .map_err(|_| EabError::OutOfMemory)?;
            trace!(new_len = self.nodes.len() + 1, "growing node pool");
            self.nodes.push(Node::placeholder());
            self.nodes.len() - 1
        };
        self.cursor = id + 1;
        self.nodes[id].reinit(kind, line);
        Ok(NodeId::new(id))
    }

    /// Recycle every in-tree node for the next expression. Never
    /// allocates (property #2 in the crate docs).
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Total nodes ever allocated (in-tree or free). Exposed for the pool
    /// conservation property test.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes currently in-tree.
    pub fn in_tree_count(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(n: i64) -> NodeKind {
        let mut table = crate::symbols::LiteralTable::new();
        let id = table.intern(crate::symbols::Literal::Int(n));
        NodeKind::Literal(id)
    }

    #[test]
    fn reset_does_not_allocate() {
        let mut pool = NodePool::with_capacity(2);
        let cap_before = pool.capacity();
        pool.acquire(lit(1), 1).unwrap();
        pool.acquire(lit(2), 1).unwrap();
        pool.acquire(lit(3), 1).unwrap(); // forces growth
        let cap_after_growth = pool.capacity();
        assert!(cap_after_growth > cap_before);

        pool.reset();
        assert_eq!(pool.capacity(), cap_after_growth);
        assert_eq!(pool.in_tree_count(), 0);

        pool.acquire(lit(4), 1).unwrap();
        pool.acquire(lit(5), 1).unwrap();
        pool.acquire(lit(6), 1).unwrap();
        // Reusing the same expression shape never grows the arena again.
        assert_eq!(pool.capacity(), cap_after_growth);
    }

    #[test]
    fn acquired_nodes_are_distinct_and_fresh() {
        let mut pool = NodePool::with_capacity(4);
        let a = pool.acquire(lit(1), 7).unwrap();
        let b = pool.acquire(lit(2), 8).unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.get(a).line, 7);
        assert_eq!(pool.get(b).line, 8);
        assert_eq!(pool.get(a).args_collected, 0);
    }

    proptest::proptest! {
        /// Whatever sequence of expression sizes we throw at it, the arena
        /// never grows past the largest expression seen, and a `reset`
        /// between rounds never allocates.
        #[test]
        fn pool_conserves_capacity_across_resets(sizes in proptest::collection::vec(1usize..64, 1..32)) {
            let mut pool = NodePool::with_capacity(1);
            let mut high_water = 0usize;
            for size in sizes {
                for i in 0..size {
                    pool.acquire(lit(i as i64), 1).unwrap();
                }
                high_water = high_water.max(pool.capacity());
                proptest::prop_assert!(pool.capacity() <= high_water);
                proptest::prop_assert_eq!(pool.in_tree_count(), size);
                pool.reset();
                proptest::prop_assert_eq!(pool.in_tree_count(), 0);
                proptest::prop_assert_eq!(pool.capacity(), high_water);
            }
        }
    }
}
