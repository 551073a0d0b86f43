use crate::devices::io_config::IoConfig;
use crate::network::{ConnectivityGraph, Direction, NodePos, Tier};

/// A placed capacitor bank.
///
/// The bank's energy lives in a [`StorageNode`](crate::network::StorageNode)
/// record held by the world's arena under the same position. The bank keeps
/// what the network layer treats as external: its I/O policy and the member
/// list last synced to clients.
#[derive(Debug, Clone)]
pub struct CapacitorBank {
    pos: NodePos,
    tier: Tier,
    io_config: IoConfig,
    synced_members: Vec<NodePos>,
}

impl CapacitorBank {
    pub fn new(pos: NodePos, tier: Tier) -> Self {
        Self {
            pos,
            tier,
            io_config: IoConfig::default(),
            synced_members: Vec::new(),
        }
    }

    pub fn pos(&self) -> NodePos {
        self.pos
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn io_config(&self) -> &IoConfig {
        &self.io_config
    }

    pub fn set_io_config(&mut self, config: IoConfig) {
        self.io_config = config;
    }

    /// Member list as last pushed to clients.
    pub fn synced_members(&self) -> &[NodePos] {
        &self.synced_members
    }

    /// Stores a fresh member list. Returns `true` if it differs from the last one.
    pub fn sync_members(&mut self, members: Vec<NodePos>) -> bool {
        if self.synced_members == members {
            return false;
        }
        self.synced_members = members;
        true
    }

    /// Whether energy may leave through `direction`.
    ///
    /// Faces touching another member of the same network never push; the
    /// network already shares that energy through equalization.
    pub fn should_push_to(&self, direction: Direction, graph: &ConnectivityGraph) -> bool {
        self.io_config.mode(direction).can_push()
            && !graph.same_component(self.pos, self.pos.relative(direction))
    }

    /// Whether energy may enter through `direction`.
    pub fn should_pull_from(&self, direction: Direction, graph: &ConnectivityGraph) -> bool {
        self.io_config.mode(direction).can_pull()
            && !graph.same_component(self.pos, self.pos.relative(direction))
    }

    /// Number of faces open for output.
    pub fn output_faces(&self, graph: &ConnectivityGraph) -> usize {
        Direction::ALL
            .iter()
            .filter(|d| self.should_push_to(**d, graph))
            .count()
    }

    /// Number of faces open for input.
    pub fn input_faces(&self, graph: &ConnectivityGraph) -> usize {
        Direction::ALL
            .iter()
            .filter(|d| self.should_pull_from(**d, graph))
            .count()
    }
}
