use std::fmt;

use serde::{Deserialize, Serialize};

/// Compatibility class of a storage node.
///
/// Only nodes of equal tier may join the same network. The tier also fixes
/// the default capacity of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Basic,
    Advanced,
    Vibrant,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Basic, Tier::Advanced, Tier::Vibrant];

    /// Default capacity of one node of this tier.
    pub const fn default_capacity(self) -> u64 {
        match self {
            Tier::Basic => 5_000_000,
            Tier::Advanced => 25_000_000,
            Tier::Vibrant => 50_000_000,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Tier::Basic => "basic",
            Tier::Advanced => "advanced",
            Tier::Vibrant => "vibrant",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Energy moved in and out of a network over one averaging window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throughput {
    pub added: u64,
    pub removed: u64,
}

impl Throughput {
    /// Divides both totals by `ticks`, giving a per-tick rate.
    pub fn per_tick(self, ticks: u64) -> Self {
        let ticks = ticks.max(1);
        Self {
            added: self.added / ticks,
            removed: self.removed / ticks,
        }
    }
}

/// Local energy buffer of one device plus its I/O accounting.
///
/// Amounts are never rejected: every operation clamps to `[0, capacity]`
/// and reports how much it actually moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageNode {
    tier: Tier,
    capacity: u64,
    stored: u64,
    added: u64,
    removed: u64,
    last_reset_tick: Option<u64>,
    network_io: Throughput,
}

impl StorageNode {
    /// Creates an empty node.
    pub fn new(tier: Tier, capacity: u64) -> Self {
        Self {
            tier,
            capacity,
            stored: 0,
            added: 0,
            removed: 0,
            last_reset_tick: None,
            network_io: Throughput::default(),
        }
    }

    /// Creates a node holding `stored` energy, clamped to `capacity`.
    pub fn with_stored(tier: Tier, capacity: u64, stored: u64) -> Self {
        let mut node = Self::new(tier, capacity);
        node.set_stored(stored);
        node
    }

    /// Accepts up to `amount`, limited by free space.
    ///
    /// Returns the accepted amount. When `simulate` is set nothing changes.
    pub fn receive(&mut self, amount: u64, simulate: bool) -> u64 {
        let accepted = amount.min(self.free_space());
        if !simulate && accepted > 0 {
            self.stored += accepted;
            self.added = self.added.saturating_add(accepted);
        }
        accepted
    }

    /// Emits up to `amount`, limited by the stored energy.
    ///
    /// Returns the extracted amount. When `simulate` is set nothing changes.
    pub fn extract(&mut self, amount: u64, simulate: bool) -> u64 {
        let extracted = amount.min(self.stored);
        if !simulate && extracted > 0 {
            self.stored -= extracted;
            self.removed = self.removed.saturating_add(extracted);
        }
        extracted
    }

    /// Receives without touching the I/O counters.
    pub fn absorb(&mut self, amount: u64) -> u64 {
        let accepted = amount.min(self.free_space());
        self.stored += accepted;
        accepted
    }

    /// Overwrites the stored amount, clamped to capacity. Counters are untouched.
    pub fn set_stored(&mut self, amount: u64) {
        self.stored = amount.min(self.capacity);
    }

    /// Zeroes the I/O counters and records `tick` as the last reset.
    pub fn reset_counters(&mut self, tick: u64) {
        self.added = 0;
        self.removed = 0;
        self.last_reset_tick = Some(tick);
    }

    pub(crate) fn set_network_io(&mut self, totals: Throughput) {
        self.network_io = totals;
    }

    pub(crate) fn restore_counters(&mut self, added: u64, removed: u64) {
        self.added = added;
        self.removed = removed;
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn stored(&self) -> u64 {
        self.stored
    }

    pub fn free_space(&self) -> u64 {
        self.capacity - self.stored
    }

    pub fn added(&self) -> u64 {
        self.added
    }

    pub fn removed(&self) -> u64 {
        self.removed
    }

    pub fn last_reset_tick(&self) -> Option<u64> {
        self.last_reset_tick
    }

    /// Network-wide totals from the most recent averaging window.
    pub fn network_io(&self) -> Throughput {
        self.network_io
    }
}
