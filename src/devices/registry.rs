use std::collections::BTreeMap;

use crate::devices::bank::CapacitorBank;
use crate::devices::io_config::IoConfig;
use crate::devices::types::SpatialQuery;
use crate::network::{MemberConfigStore, NodePos, Tier};

/// Every placed bank, keyed by position.
#[derive(Debug, Clone, Default)]
pub struct BankRegistry {
    banks: BTreeMap<NodePos, CapacitorBank>,
}

impl BankRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `bank` at its own position. Returns it back if the position is taken.
    pub fn insert(&mut self, bank: CapacitorBank) -> Result<(), CapacitorBank> {
        if self.banks.contains_key(&bank.pos()) {
            return Err(bank);
        }
        self.banks.insert(bank.pos(), bank);
        Ok(())
    }

    pub fn remove(&mut self, pos: NodePos) -> Option<CapacitorBank> {
        self.banks.remove(&pos)
    }

    pub fn get(&self, pos: NodePos) -> Option<&CapacitorBank> {
        self.banks.get(&pos)
    }

    pub fn get_mut(&mut self, pos: NodePos) -> Option<&mut CapacitorBank> {
        self.banks.get_mut(&pos)
    }

    pub fn contains(&self, pos: NodePos) -> bool {
        self.banks.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapacitorBank> {
        self.banks.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CapacitorBank> {
        self.banks.values_mut()
    }
}

impl SpatialQuery for BankRegistry {
    fn neighbours(&self, pos: NodePos) -> Vec<(NodePos, Tier)> {
        pos.neighbours()
            .into_iter()
            .filter_map(|n| self.banks.get(&n).map(|bank| (n, bank.tier())))
            .collect()
    }
}

impl MemberConfigStore<IoConfig> for BankRegistry {
    fn member_config(&self, pos: NodePos) -> Option<IoConfig> {
        self.banks.get(&pos).map(|bank| bank.io_config().clone())
    }

    fn set_member_config(&mut self, pos: NodePos, config: IoConfig) -> bool {
        match self.banks.get_mut(&pos) {
            Some(bank) => {
                bank.set_io_config(config);
                true
            }
            None => false,
        }
    }
}
