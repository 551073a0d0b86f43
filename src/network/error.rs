//! Error types for network formation.

use thiserror::Error;

use super::node::Tier;
use super::pos::NodePos;

/// Result type for connectivity graph operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Rejections reported by [`ConnectivityGraph`](super::graph::ConnectivityGraph).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The node was never integrated into the graph.
    #[error("node {0} is not integrated into the network graph")]
    NotIntegrated(NodePos),

    /// The two nodes belong to different compatibility tiers.
    #[error("cannot connect {a} ({a_tier}) to {b} ({b_tier}): tiers differ")]
    IncompatibleTier {
        a: NodePos,
        a_tier: Tier,
        b: NodePos,
        b_tier: Tier,
    },
}
