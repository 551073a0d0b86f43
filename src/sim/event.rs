use crate::config::{EventAction, EventConfig};
use crate::network::{NodePos, Tier};

/// What a layout event does to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutAction {
    /// Places a bank of `tier` holding `stored` energy.
    Place { tier: Tier, stored: u64 },
    /// Removes whatever bank sits at the position.
    Remove,
}

/// A placement or removal scheduled for a global tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEvent {
    /// Tick at the start of which the event applies.
    pub tick: u64,
    pub pos: NodePos,
    pub action: LayoutAction,
}

impl LayoutEvent {
    pub fn place(tick: u64, pos: NodePos, tier: Tier, stored: u64) -> Self {
        Self {
            tick,
            pos,
            action: LayoutAction::Place { tier, stored },
        }
    }

    pub fn remove(tick: u64, pos: NodePos) -> Self {
        Self {
            tick,
            pos,
            action: LayoutAction::Remove,
        }
    }

    /// Returns `true` once `tick` has reached the event's tick.
    pub fn is_due(&self, tick: u64) -> bool {
        self.tick <= tick
    }

    /// Converts a configured event. Returns `None` for a placement without a tier.
    pub fn from_config(cfg: &EventConfig) -> Option<Self> {
        match cfg.action {
            EventAction::Place => cfg
                .tier
                .map(|tier| Self::place(cfg.tick, cfg.pos(), tier, cfg.stored)),
            EventAction::Remove => Some(Self::remove(cfg.tick, cfg.pos())),
        }
    }
}
