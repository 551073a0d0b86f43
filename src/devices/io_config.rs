use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::network::Direction;

/// Energy transfer policy of one face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoMode {
    /// Accepts and emits energy.
    #[default]
    Both,
    /// Emits only.
    Push,
    /// Accepts only.
    Pull,
    /// No transfer.
    Disabled,
}

impl IoMode {
    pub fn can_push(self) -> bool {
        matches!(self, IoMode::Both | IoMode::Push)
    }

    pub fn can_pull(self) -> bool {
        matches!(self, IoMode::Both | IoMode::Pull)
    }

    /// Next mode in the order `Both -> Push -> Pull -> Disabled -> Both`.
    pub fn cycle(self) -> Self {
        match self {
            IoMode::Both => IoMode::Push,
            IoMode::Push => IoMode::Pull,
            IoMode::Pull => IoMode::Disabled,
            IoMode::Disabled => IoMode::Both,
        }
    }
}

/// Per-face I/O policy of a capacitor bank.
///
/// This is the configuration blob exchanged between network members. Faces
/// without an explicit entry use [`IoMode::Both`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoConfig {
    #[serde(default)]
    faces: BTreeMap<Direction, IoMode>,
}

impl IoConfig {
    pub fn mode(&self, direction: Direction) -> IoMode {
        self.faces.get(&direction).copied().unwrap_or_default()
    }

    pub fn set_mode(&mut self, direction: Direction, mode: IoMode) {
        if mode == IoMode::default() {
            self.faces.remove(&direction);
        } else {
            self.faces.insert(direction, mode);
        }
    }

    /// Faces whose mode differs from the default.
    pub fn overrides(&self) -> impl Iterator<Item = (Direction, IoMode)> + '_ {
        self.faces.iter().map(|(d, m)| (*d, *m))
    }

    /// Same mode on every face.
    pub fn uniform(mode: IoMode) -> Self {
        let mut config = Self::default();
        for direction in Direction::ALL {
            config.set_mode(direction, mode);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_faces_are_two_way() {
        let cfg = IoConfig::default();
        for d in Direction::ALL {
            assert!(cfg.mode(d).can_push());
            assert!(cfg.mode(d).can_pull());
        }
    }

    #[test]
    fn cycle_visits_every_mode() {
        let mut mode = IoMode::Both;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(mode);
            mode = mode.cycle();
        }
        assert_eq!(mode, IoMode::Both);
        assert_eq!(
            seen,
            vec![IoMode::Both, IoMode::Push, IoMode::Pull, IoMode::Disabled]
        );
    }

    #[test]
    fn setting_default_mode_clears_entry() {
        let mut cfg = IoConfig::default();
        cfg.set_mode(Direction::Up, IoMode::Disabled);
        assert_eq!(cfg.mode(Direction::Up), IoMode::Disabled);
        cfg.set_mode(Direction::Up, IoMode::Both);
        assert_eq!(cfg, IoConfig::default());
    }
}
