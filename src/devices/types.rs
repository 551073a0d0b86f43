//! Contracts between storage devices and the world they are placed in.

use crate::network::{NodePos, Tier};

/// Answers which compatible devices sit next to a position.
///
/// Implemented by whatever owns device placement. The network layer calls
/// it on activation and connects to every neighbour of the same tier.
pub trait SpatialQuery {
    /// Storage devices face-adjacent to `pos`, with their tiers.
    ///
    /// At most six entries; `pos` itself is never included.
    fn neighbours(&self, pos: NodePos) -> Vec<(NodePos, Tier)>;

    /// Same-tier neighbours only.
    fn compatible_neighbours(&self, pos: NodePos, tier: Tier) -> Vec<NodePos> {
        self.neighbours(pos)
            .into_iter()
            .filter(|(_, t)| *t == tier)
            .map(|(p, _)| p)
            .collect()
    }
}
