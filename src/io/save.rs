//! World snapshots on disk.
//!
//! A save holds the next tick and every bank's record. Networks are
//! written for readers of the file only: loading re-integrates each bank
//! and rebuilds connectivity from neighbour queries, so a hand-edited
//! layout always yields consistent networks.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::ScenarioConfig;
use crate::devices::{IoConfig, IoMode};
use crate::network::{Direction, EqualizationScheduler, NodePos, StorageNode, Tier};
use crate::sim::event::LayoutEvent;
use crate::sim::workload::Workload;
use crate::sim::world::{World, WorldError};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot encode save: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("cannot decode save: {0}")]
    Decode(#[from] toml::de::Error),

    #[error("cannot rebuild world from save: {0}")]
    World(#[from] WorldError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldSave {
    /// Next tick to simulate.
    pub tick: u64,
    #[serde(default)]
    pub nodes: Vec<NodeSave>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<NetworkSave>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSave {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub tier: Tier,
    pub stored: u64,
    /// I/O counters of the unfinished averaging window.
    #[serde(default)]
    pub added: u64,
    #[serde(default)]
    pub removed: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faces: Vec<FaceSave>,
}

impl NodeSave {
    pub fn pos(&self) -> NodePos {
        NodePos::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaceSave {
    pub face: Direction,
    pub mode: IoMode,
}

/// Member list of one network as `[x, y, z]` triples, leader first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSave {
    pub members: Vec<[i32; 3]>,
}

impl WorldSave {
    /// Snapshots every bank of `world`.
    pub fn capture(world: &World) -> Self {
        let nodes = world
            .nodes()
            .map(|(pos, node)| NodeSave {
                x: pos.x,
                y: pos.y,
                z: pos.z,
                tier: node.tier(),
                stored: node.stored(),
                added: node.added(),
                removed: node.removed(),
                faces: world
                    .bank(pos)
                    .map(|bank| {
                        bank.io_config()
                            .overrides()
                            .map(|(face, mode)| FaceSave { face, mode })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();
        let networks = world
            .networks()
            .into_iter()
            .map(|net| NetworkSave {
                members: net.members.iter().map(|p| [p.x, p.y, p.z]).collect(),
            })
            .collect();
        Self {
            tick: world.tick(),
            nodes,
            networks,
        }
    }

    /// Rebuilds a world using the timing, tiers and workload of `cfg`.
    ///
    /// Capacities come from `cfg`, so stored amounts are clamped if a tier
    /// shrank. Scenario events at or after the saved tick are scheduled
    /// again. The workload is reseeded from the scenario seed and the saved
    /// tick (see [`Workload::resumed`]), so with a non-idle workload a
    /// resumed run draws different traffic than an uninterrupted one.
    ///
    /// # Errors
    ///
    /// Returns a `SaveError` if two saved banks share a position.
    pub fn restore(&self, cfg: &ScenarioConfig) -> Result<World, SaveError> {
        let sim = &cfg.simulation;
        let scheduler = EqualizationScheduler::new(sim.io_average_ticks, sim.equalize_interval);
        let mut world = World::new(scheduler, cfg.tiers, self.tick)
            .with_workload(Workload::resumed(cfg.workload, sim.seed, self.tick));

        for saved in &self.nodes {
            let capacity = cfg.tiers.capacity(saved.tier);
            let mut node = StorageNode::with_stored(saved.tier, capacity, saved.stored);
            node.restore_counters(saved.added, saved.removed);
            let mut io = IoConfig::default();
            for face in &saved.faces {
                io.set_mode(face.face, face.mode);
            }
            world.insert_bank(saved.pos(), node, io)?;
        }
        for saved in &self.nodes {
            world.activate(saved.pos())?;
        }

        for event in cfg.events.iter().filter_map(LayoutEvent::from_config) {
            if event.tick >= self.tick {
                world.schedule(event);
            }
        }
        info!(
            tick = self.tick,
            nodes = self.nodes.len(),
            networks = world.graph().component_count(),
            "restored world"
        );
        Ok(world)
    }

    /// Encodes the save as TOML.
    ///
    /// # Errors
    ///
    /// Returns `SaveError::Encode` if a value does not fit TOML's signed
    /// 64-bit integers.
    pub fn to_toml_string(&self) -> Result<String, SaveError> {
        Ok(toml::to_string(self)?)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, SaveError> {
        Ok(toml::from_str(s)?)
    }

    pub fn write_to_path(&self, path: &Path) -> Result<(), SaveError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn read_from_path(path: &Path) -> Result<Self, SaveError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }
}
