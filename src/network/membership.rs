//! Member list of a node's network and per-member configuration sync.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::graph::ConnectivityGraph;
use super::pos::NodePos;

/// Storage for per-member configuration blobs of type `C`.
pub trait MemberConfigStore<C> {
    /// Current configuration of the device at `pos`, if there is one.
    fn member_config(&self, pos: NodePos) -> Option<C>;

    /// Replaces the configuration of the device at `pos`.
    ///
    /// Returns `false` if no device lives at `pos`.
    fn set_member_config(&mut self, pos: NodePos, config: C) -> bool;
}

/// One configuration blob addressed to a network member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberConfig<C> {
    pub pos: NodePos,
    pub config: C,
}

/// Counts of an inbound configuration batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: usize,
}

/// View of the network owned by one node.
pub struct NetworkMembershipTracker<'g> {
    graph: &'g ConnectivityGraph,
    owner: NodePos,
}

impl<'g> NetworkMembershipTracker<'g> {
    pub fn new(graph: &'g ConnectivityGraph, owner: NodePos) -> Self {
        Self { graph, owner }
    }

    pub fn owner(&self) -> NodePos {
        self.owner
    }

    /// Members of the owner's network in canonical order, empty if the owner
    /// is not part of any network.
    pub fn members(&self) -> Vec<NodePos> {
        self.graph
            .members(self.owner)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, pos: NodePos) -> bool {
        self.graph
            .members(self.owner)
            .is_some_and(|set| set.contains(&pos))
    }

    /// Configuration of every other member, for sending to a client.
    pub fn collect<C, S>(&self, store: &S) -> Vec<MemberConfig<C>>
    where
        S: MemberConfigStore<C> + ?Sized,
    {
        self.members()
            .into_iter()
            .filter(|pos| *pos != self.owner)
            .filter_map(|pos| {
                store
                    .member_config(pos)
                    .map(|config| MemberConfig { pos, config })
            })
            .collect()
    }

    /// Applies inbound configuration to current members.
    ///
    /// Entries for the owner itself, for positions that are no longer in the
    /// network, or for positions without a device are dropped.
    pub fn apply<C, S>(
        &self,
        updates: impl IntoIterator<Item = MemberConfig<C>>,
        store: &mut S,
    ) -> ApplyReport
    where
        S: MemberConfigStore<C> + ?Sized,
    {
        let mut report = ApplyReport::default();
        for update in updates {
            if update.pos == self.owner || !self.is_member(update.pos) {
                warn!(owner = %self.owner, pos = %update.pos, "dropping config for non-member");
                report.skipped += 1;
                continue;
            }
            if store.set_member_config(update.pos, update.config) {
                report.applied += 1;
            } else {
                report.skipped += 1;
            }
        }
        report
    }
}
