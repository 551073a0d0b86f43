use std::collections::BTreeMap;

use super::node::StorageNode;
use super::pos::NodePos;

/// Owner of every [`StorageNode`] record, keyed by identity.
///
/// Iteration follows [`NodePos`] ordering, which is the same canonical order
/// the connectivity graph uses for its components.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: BTreeMap<NodePos, StorageNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record at `pos`, returning the previous one.
    pub fn insert(&mut self, pos: NodePos, node: StorageNode) -> Option<StorageNode> {
        self.nodes.insert(pos, node)
    }

    pub fn remove(&mut self, pos: NodePos) -> Option<StorageNode> {
        self.nodes.remove(&pos)
    }

    pub fn get(&self, pos: NodePos) -> Option<&StorageNode> {
        self.nodes.get(&pos)
    }

    pub fn get_mut(&mut self, pos: NodePos) -> Option<&mut StorageNode> {
        self.nodes.get_mut(&pos)
    }

    pub fn contains(&self, pos: NodePos) -> bool {
        self.nodes.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodePos, &StorageNode)> {
        self.nodes.iter().map(|(pos, node)| (*pos, node))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodePos, &mut StorageNode)> {
        self.nodes.iter_mut().map(|(pos, node)| (*pos, node))
    }

    /// Sum of stored energy across `members`.
    pub fn total_stored<'a>(&self, members: impl IntoIterator<Item = &'a NodePos>) -> u128 {
        members
            .into_iter()
            .filter_map(|pos| self.nodes.get(pos))
            .map(|node| u128::from(node.stored()))
            .sum()
    }
}
