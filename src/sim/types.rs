//! Per-tick records and network views produced by the world.

use std::fmt;

use serde::Serialize;

use crate::network::{NodePos, Throughput, Tier};

/// Complete record of one simulated tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickResult {
    /// Global tick number.
    pub tick: u64,
    /// Banks present after the tick.
    pub nodes: usize,
    /// Networks present after the tick.
    pub networks: usize,
    /// Member count of the largest network.
    pub largest_network: usize,
    /// Energy stored across all banks after the tick.
    pub total_stored: u64,
    /// Capacity across all banks.
    pub total_capacity: u64,
    /// Energy accepted from the workload this tick.
    pub energy_in: u64,
    /// Energy handed to the workload this tick.
    pub energy_out: u64,
    /// Networks whose I/O counters were averaged this tick.
    pub averaging_passes: usize,
    /// Networks that ran an equalization pass this tick.
    pub equalized_networks: usize,
    /// Placements and removals applied at the start of the tick.
    pub layout_changes: usize,
    /// Largest gap between the fullest and emptiest member of any network.
    pub max_spread: u64,
}

impl fmt::Display for TickResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fill = if self.total_capacity > 0 {
            100.0 * self.total_stored as f64 / self.total_capacity as f64
        } else {
            0.0
        };
        write!(
            f,
            "t={:>6} | nodes={:>3} nets={:>3} largest={:>3} | stored={:>12} ({:>5.1}%) \
             | in={:>6} out={:>6} | avg={} eq={} layout={} | spread={}",
            self.tick,
            self.nodes,
            self.networks,
            self.largest_network,
            self.total_stored,
            fill,
            self.energy_in,
            self.energy_out,
            self.averaging_passes,
            self.equalized_networks,
            self.layout_changes,
            self.max_spread,
        )
    }
}

/// Read-only view of one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSummary {
    /// First member in canonical order; runs equalization.
    pub leader: NodePos,
    pub tier: Tier,
    /// Members in canonical order.
    pub members: Vec<NodePos>,
    pub stored: u64,
    pub capacity: u64,
    /// Fullest member minus emptiest member.
    pub spread: u64,
    /// Tick offset at which the leader equalizes within each interval.
    pub phase: u64,
    /// Averaged per-tick throughput of the last completed window.
    pub rates: Throughput,
}

/// Read-only view of one bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub pos: NodePos,
    pub tier: Tier,
    pub capacity: u64,
    pub stored: u64,
    /// Network-wide per-tick rates as reported to clients.
    pub rates: Throughput,
    pub leader: NodePos,
    /// Members of the bank's network in canonical order.
    pub members: Vec<NodePos>,
}
