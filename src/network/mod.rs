//! Storage network formation and energy equalization.

/// Record store for storage nodes.
pub mod arena;
pub mod error;
/// Connectivity graph with incremental merge and split.
pub mod graph;
pub mod membership;
/// Per-device energy buffer and compatibility tiers.
pub mod node;
pub mod pos;
pub mod scheduler;

pub use arena::NodeArena;
pub use error::NetworkError;
pub use graph::{ComponentId, ConnectivityGraph};
pub use membership::{ApplyReport, MemberConfig, MemberConfigStore, NetworkMembershipTracker};
pub use node::{StorageNode, Throughput, Tier};
pub use pos::{Direction, NodePos};
pub use scheduler::{EqualizationScheduler, EqualizeOutcome, TickOutcome};
