//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::network::scheduler::{DEFAULT_EQUALIZE_INTERVAL, DEFAULT_IO_AVERAGE_TICKS};
use crate::network::{NodePos, Tier};

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or use one of the presets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Tick counts, seed, and cadences.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Capacity of one bank per tier.
    #[serde(default)]
    pub tiers: TierConfig,
    /// Random energy traffic applied to every bank each tick.
    #[serde(default)]
    pub workload: WorkloadConfig,
    /// Banks present at the first tick.
    #[serde(default)]
    pub banks: Vec<BankConfig>,
    /// Placements and removals during the run.
    #[serde(default)]
    pub events: Vec<EventConfig>,
}

/// Simulation timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of ticks to simulate (must be > 0).
    pub ticks: u64,
    /// Global tick counter value of the first simulated tick.
    pub start_tick: u64,
    /// Master random seed.
    pub seed: u64,
    /// Length of the I/O averaging window (must be > 0).
    pub io_average_ticks: u64,
    /// Ticks between equalization passes of one network (must be > 0).
    pub equalize_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks: 1200,
            start_tick: 0,
            seed: 42,
            io_average_ticks: DEFAULT_IO_AVERAGE_TICKS,
            equalize_interval: DEFAULT_EQUALIZE_INTERVAL,
        }
    }
}

/// Capacity of one bank per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TierConfig {
    pub basic: u64,
    pub advanced: u64,
    pub vibrant: u64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            basic: Tier::Basic.default_capacity(),
            advanced: Tier::Advanced.default_capacity(),
            vibrant: Tier::Vibrant.default_capacity(),
        }
    }
}

impl TierConfig {
    pub fn capacity(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Basic => self.basic,
            Tier::Advanced => self.advanced,
            Tier::Vibrant => self.vibrant,
        }
    }
}

/// Random energy traffic per bank and tick.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadConfig {
    /// Probability (0.0-1.0) that a bank receives energy on a tick.
    pub input_chance: f64,
    /// Upper bound of one random input.
    pub input_max: u64,
    /// Probability (0.0-1.0) that a bank emits energy on a tick.
    pub output_chance: f64,
    /// Upper bound of one random output.
    pub output_max: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            input_chance: 0.3,
            input_max: 2_000,
            output_chance: 0.3,
            output_max: 2_000,
        }
    }
}

/// One bank placed before the first tick.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BankConfig {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub tier: Tier,
    /// Initial stored energy (must not exceed the tier capacity).
    #[serde(default)]
    pub stored: u64,
}

impl BankConfig {
    pub fn new(pos: NodePos, tier: Tier, stored: u64) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            tier,
            stored,
        }
    }

    pub fn pos(&self) -> NodePos {
        NodePos::new(self.x, self.y, self.z)
    }
}

/// Kind of a scheduled layout change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Place,
    Remove,
}

/// A placement or removal at a given tick.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventConfig {
    pub tick: u64,
    pub action: EventAction,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Tier of the placed bank (required for `place`).
    #[serde(default)]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub stored: u64,
}

impl EventConfig {
    pub fn pos(&self) -> NodePos {
        NodePos::new(self.x, self.y, self.z)
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.ticks"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Banks covering `width x depth` at height `y`, starting at the origin.
fn floor(
    width: i32,
    depth: i32,
    y: i32,
    tier: Tier,
    stored: impl Fn(i32, i32) -> u64,
) -> Vec<BankConfig> {
    let mut banks = Vec::new();
    for x in 0..width {
        for z in 0..depth {
            banks.push(BankConfig::new(NodePos::new(x, y, z), tier, stored(x, z)));
        }
    }
    banks
}

impl ScenarioConfig {
    /// Returns the baseline scenario: a 3x3 floor of basic banks charged
    /// from one corner, plus a separate advanced pair.
    pub fn baseline() -> Self {
        let full = Tier::Basic.default_capacity();
        let mut banks = floor(3, 3, 0, Tier::Basic, |x, z| {
            if x == 0 && z == 0 { full } else { 0 }
        });
        banks.push(BankConfig::new(NodePos::new(10, 0, 0), Tier::Advanced, 20_000_000));
        banks.push(BankConfig::new(NodePos::new(10, 1, 0), Tier::Advanced, 0));
        Self {
            banks,
            ..Self::default()
        }
    }

    /// Returns the mixed-tier preset: adjacent banks of different tiers that
    /// must stay in separate networks.
    pub fn mixed_tiers() -> Self {
        let banks = (0..6)
            .map(|x| {
                let tier = if x < 3 { Tier::Basic } else { Tier::Vibrant };
                let stored = if x % 3 == 0 { 4_000_000 } else { 0 };
                BankConfig::new(NodePos::new(x, 0, 0), tier, stored)
            })
            .collect();
        Self {
            banks,
            workload: WorkloadConfig {
                input_chance: 0.1,
                output_chance: 0.1,
                ..WorkloadConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the split preset: a line of five banks whose middle bank is
    /// removed and later placed back.
    pub fn split() -> Self {
        let banks = (0..5)
            .map(|x| {
                let stored = if x == 4 { 5_000_000 } else { 0 };
                BankConfig::new(NodePos::new(x, 0, 0), Tier::Basic, stored)
            })
            .collect();
        let events = vec![
            EventConfig {
                tick: 300,
                action: EventAction::Remove,
                x: 2,
                y: 0,
                z: 0,
                tier: None,
                stored: 0,
            },
            EventConfig {
                tick: 700,
                action: EventAction::Place,
                x: 2,
                y: 0,
                z: 0,
                tier: Some(Tier::Basic),
                stored: 0,
            },
        ];
        Self {
            simulation: SimulationConfig {
                ticks: 1000,
                ..SimulationConfig::default()
            },
            workload: WorkloadConfig {
                input_chance: 0.0,
                output_chance: 0.0,
                ..WorkloadConfig::default()
            },
            banks,
            events,
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "mixed_tiers", "split"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "mixed_tiers" => Ok(Self::mixed_tiers()),
            "split" => Ok(Self::split()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.ticks == 0 {
            errors.push(ConfigError::new("simulation.ticks", "must be > 0"));
        }
        if s.io_average_ticks == 0 {
            errors.push(ConfigError::new("simulation.io_average_ticks", "must be > 0"));
        }
        if s.equalize_interval == 0 {
            errors.push(ConfigError::new("simulation.equalize_interval", "must be > 0"));
        }

        for tier in Tier::ALL {
            if self.tiers.capacity(tier) == 0 {
                errors.push(ConfigError::new(format!("tiers.{tier}"), "must be > 0"));
            }
        }

        let w = &self.workload;
        if !(0.0..=1.0).contains(&w.input_chance) {
            errors.push(ConfigError::new("workload.input_chance", "must be in [0.0, 1.0]"));
        }
        if !(0.0..=1.0).contains(&w.output_chance) {
            errors.push(ConfigError::new("workload.output_chance", "must be in [0.0, 1.0]"));
        }

        let mut seen = std::collections::BTreeSet::new();
        for (i, bank) in self.banks.iter().enumerate() {
            if !seen.insert(bank.pos()) {
                errors.push(ConfigError::new(
                    format!("banks[{i}]"),
                    format!("position {} is already occupied", bank.pos()),
                ));
            }
            let capacity = self.tiers.capacity(bank.tier);
            if bank.stored > capacity {
                errors.push(ConfigError::new(
                    format!("banks[{i}].stored"),
                    format!("must be <= {} capacity {capacity}", bank.tier),
                ));
            }
        }

        let end = s.start_tick.saturating_add(s.ticks);
        for (i, event) in self.events.iter().enumerate() {
            if event.tick < s.start_tick || event.tick >= end {
                errors.push(ConfigError::new(
                    format!("events[{i}].tick"),
                    format!("must be within [{}, {end})", s.start_tick),
                ));
            }
            if event.action == EventAction::Place {
                match event.tier {
                    None => errors.push(ConfigError::new(
                        format!("events[{i}].tier"),
                        "required for place",
                    )),
                    Some(tier) if event.stored > self.tiers.capacity(tier) => {
                        errors.push(ConfigError::new(
                            format!("events[{i}].stored"),
                            format!("must be <= {tier} capacity {}", self.tiers.capacity(tier)),
                        ));
                    }
                    Some(_) => {}
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
        assert_eq!(cfg.banks.len(), 11);
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
ticks = 400
seed = 99
io_average_ticks = 20
equalize_interval = 100

[tiers]
basic = 1000

[workload]
input_chance = 0.5
input_max = 10
output_chance = 0.25
output_max = 10

[[banks]]
x = 0
y = 64
z = 0
tier = "basic"
stored = 1000

[[banks]]
x = 1
y = 64
z = 0
tier = "basic"

[[events]]
tick = 150
action = "remove"
x = 1
y = 64
z = 0
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.simulation.ticks), Some(400));
        assert_eq!(cfg.as_ref().map(|c| c.tiers.basic), Some(1000));
        assert_eq!(
            cfg.as_ref().map(|c| c.tiers.advanced),
            Some(Tier::Advanced.default_capacity())
        );
        assert_eq!(cfg.as_ref().map(|c| c.banks.len()), Some(2));
        assert_eq!(cfg.as_ref().map(|c| c.banks[1].stored), Some(0));
        assert_eq!(
            cfg.as_ref().map(|c| c.events[0].action),
            Some(EventAction::Remove)
        );
        let errors = cfg.map(|c| c.validate()).unwrap_or_default();
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
ticks = 24
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn unknown_tier_is_rejected() {
        let toml = r#"
[[banks]]
x = 0
y = 0
z = 0
tier = "creative"
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_catches_zero_cadence() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.io_average_ticks = 0;
        cfg.simulation.equalize_interval = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.io_average_ticks"));
        assert!(errors.iter().any(|e| e.field == "simulation.equalize_interval"));
    }

    #[test]
    fn validation_catches_overfull_bank() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.tiers.basic = 10;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "banks[0].stored"));
    }

    #[test]
    fn validation_catches_duplicate_positions() {
        let mut cfg = ScenarioConfig::baseline();
        let first = cfg.banks[0].clone();
        cfg.banks.push(first);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "banks[11]"));
    }

    #[test]
    fn validation_catches_bad_chance() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.workload.output_chance = 1.5;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "workload.output_chance"));
    }

    #[test]
    fn validation_catches_place_without_tier() {
        let mut cfg = ScenarioConfig::split();
        cfg.events[1].tier = None;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "events[1].tier"));
    }

    #[test]
    fn validation_catches_event_outside_run() {
        let mut cfg = ScenarioConfig::split();
        cfg.events[0].tick = 5_000;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "events[0].tick"));
    }

    #[test]
    fn split_preset_has_cut_vertex_removal() {
        let cfg = ScenarioConfig::split();
        assert_eq!(cfg.events[0].pos(), NodePos::new(2, 0, 0));
        assert_eq!(cfg.events[0].action, EventAction::Remove);
    }
}
