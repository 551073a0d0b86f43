//! Undirected connectivity graph over storage node identities.
//!
//! The graph only maps identities: it never owns [`StorageNode`] records.
//! Every integrated node belongs to exactly one component. Merges relabel
//! the smaller component into the larger; removals re-derive the surviving
//! components by traversal from the removed node's former neighbours.
//!
//! [`StorageNode`]: super::node::StorageNode

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use super::error::{NetworkError, Result};
use super::node::Tier;
use super::pos::NodePos;

/// Opaque handle of one component. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u64);

#[derive(Debug, Clone, Default)]
pub struct ConnectivityGraph {
    tiers: BTreeMap<NodePos, Tier>,
    edges: BTreeMap<NodePos, BTreeSet<NodePos>>,
    membership: BTreeMap<NodePos, ComponentId>,
    components: BTreeMap<ComponentId, BTreeSet<NodePos>>,
    next_id: u64,
}

impl ConnectivityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> ComponentId {
        let id = ComponentId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Inserts `pos` as a singleton component.
    ///
    /// Returns `false` without changes if the node is already integrated.
    pub fn integrate(&mut self, pos: NodePos, tier: Tier) -> bool {
        if self.tiers.contains_key(&pos) {
            return false;
        }
        let id = self.allocate_id();
        self.tiers.insert(pos, tier);
        self.edges.insert(pos, BTreeSet::new());
        self.membership.insert(pos, id);
        self.components.insert(id, BTreeSet::from([pos]));
        true
    }

    /// Adds an edge between `a` and `b`, merging their components.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NotIntegrated`] if either node is absent and
    /// [`NetworkError::IncompatibleTier`] if their tiers differ.
    pub fn connect(&mut self, a: NodePos, b: NodePos) -> Result<()> {
        let a_tier = self.tier_of(a).ok_or(NetworkError::NotIntegrated(a))?;
        let b_tier = self.tier_of(b).ok_or(NetworkError::NotIntegrated(b))?;
        if a_tier != b_tier {
            return Err(NetworkError::IncompatibleTier {
                a,
                a_tier,
                b,
                b_tier,
            });
        }
        if a == b {
            return Ok(());
        }

        self.edges.entry(a).or_default().insert(b);
        self.edges.entry(b).or_default().insert(a);

        let (Some(&ca), Some(&cb)) = (self.membership.get(&a), self.membership.get(&b)) else {
            return Err(NetworkError::NotIntegrated(a));
        };
        if ca == cb {
            return Ok(());
        }

        let (keep, absorbed) = if self.component_len(ca) >= self.component_len(cb) {
            (ca, cb)
        } else {
            (cb, ca)
        };
        let moved = self.components.remove(&absorbed).unwrap_or_default();
        for pos in &moved {
            self.membership.insert(*pos, keep);
        }
        let target = self.components.entry(keep).or_default();
        target.extend(moved);
        debug!(%a, %b, members = target.len(), "merged networks");
        Ok(())
    }

    /// Removes the edge between `a` and `b`, splitting the component if the
    /// edge was a bridge.
    ///
    /// Returns `Ok(false)` if the two nodes were not directly connected.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NotIntegrated`] if either node is absent.
    pub fn disconnect(&mut self, a: NodePos, b: NodePos) -> Result<bool> {
        if !self.contains(a) {
            return Err(NetworkError::NotIntegrated(a));
        }
        if !self.contains(b) {
            return Err(NetworkError::NotIntegrated(b));
        }
        let removed = self.edges.get_mut(&a).is_some_and(|set| set.remove(&b));
        if let Some(set) = self.edges.get_mut(&b) {
            set.remove(&a);
        }
        if !removed {
            return Ok(false);
        }
        if let Some(&id) = self.membership.get(&a) {
            self.resplit(id, [a, b]);
        }
        Ok(true)
    }

    /// Detaches `pos` from the graph.
    ///
    /// The remaining members of its component are regrouped by what is
    /// still reachable from each former neighbour. Returns `false` if the
    /// node was not integrated.
    pub fn remove(&mut self, pos: NodePos) -> bool {
        if self.tiers.remove(&pos).is_none() {
            return false;
        }
        let former = self.edges.remove(&pos).unwrap_or_default();
        for neighbour in &former {
            if let Some(set) = self.edges.get_mut(neighbour) {
                set.remove(&pos);
            }
        }

        let Some(id) = self.membership.remove(&pos) else {
            return true;
        };
        if let Some(members) = self.components.get_mut(&id) {
            members.remove(&pos);
            if members.is_empty() {
                self.components.remove(&id);
                debug!(%pos, "network dissolved");
                return true;
            }
        }
        if !former.is_empty() {
            self.resplit(id, former);
        }
        true
    }

    /// Re-derives the components contained in `id`, seeding traversal from
    /// `seeds` first. The first group keeps `id`.
    fn resplit(&mut self, id: ComponentId, seeds: impl IntoIterator<Item = NodePos>) {
        let Some(mut unvisited) = self.components.remove(&id) else {
            return;
        };

        let mut groups = Vec::new();
        for seed in seeds {
            if unvisited.contains(&seed) {
                let group = self.reachable(seed);
                unvisited.retain(|p| !group.contains(p));
                groups.push(group);
            }
        }
        while let Some(&seed) = unvisited.first() {
            let group = self.reachable(seed);
            unvisited.retain(|p| !group.contains(p));
            groups.push(group);
        }

        let count = groups.len();
        for (i, group) in groups.into_iter().enumerate() {
            let group_id = if i == 0 { id } else { self.allocate_id() };
            for pos in &group {
                self.membership.insert(*pos, group_id);
            }
            self.components.insert(group_id, group);
        }
        if count > 1 {
            debug!(parts = count, "network split");
        }
    }

    fn reachable(&self, start: NodePos) -> BTreeSet<NodePos> {
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(pos) = queue.pop_front() {
            for next in self.edges.get(&pos).into_iter().flatten() {
                if seen.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        seen
    }

    fn component_len(&self, id: ComponentId) -> usize {
        self.components.get(&id).map_or(0, BTreeSet::len)
    }

    /// All nodes reachable from `pos`, itself included, in canonical order.
    ///
    /// A node that is not integrated yields `[pos]`.
    pub fn component_of(&self, pos: NodePos) -> Vec<NodePos> {
        self.members(pos)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_else(|| vec![pos])
    }

    /// Member set of the component containing `pos`, if integrated.
    pub fn members(&self, pos: NodePos) -> Option<&BTreeSet<NodePos>> {
        self.membership
            .get(&pos)
            .and_then(|id| self.components.get(id))
    }

    pub fn component_id(&self, pos: NodePos) -> Option<ComponentId> {
        self.membership.get(&pos).copied()
    }

    /// The first member of `pos`'s component in canonical order.
    pub fn leader_of(&self, pos: NodePos) -> NodePos {
        self.members(pos)
            .and_then(|set| set.first().copied())
            .unwrap_or(pos)
    }

    pub fn same_component(&self, a: NodePos, b: NodePos) -> bool {
        match (self.membership.get(&a), self.membership.get(&b)) {
            (Some(ca), Some(cb)) => ca == cb,
            _ => a == b,
        }
    }

    /// Direct neighbours of `pos`.
    pub fn neighbours(&self, pos: NodePos) -> impl Iterator<Item = NodePos> + '_ {
        self.edges.get(&pos).into_iter().flatten().copied()
    }

    /// Iterates all components in id order.
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &BTreeSet<NodePos>)> {
        self.components.iter().map(|(id, set)| (*id, set))
    }

    pub fn tier_of(&self, pos: NodePos) -> Option<Tier> {
        self.tiers.get(&pos).copied()
    }

    pub fn contains(&self, pos: NodePos) -> bool {
        self.tiers.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}
