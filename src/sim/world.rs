//! In-process world that places banks and drives their networks tick by tick.

use std::collections::VecDeque;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ScenarioConfig, TierConfig};
use crate::devices::{BankRegistry, CapacitorBank, IoConfig, SpatialQuery};
use crate::network::{
    ApplyReport, ConnectivityGraph, EqualizationScheduler, MemberConfig, NetworkError,
    NetworkMembershipTracker, NodeArena, NodePos, StorageNode, Throughput, Tier,
};

use super::clock::Clock;
use super::event::{LayoutAction, LayoutEvent};
use super::types::{NetworkSummary, NodeView, TickResult};
use super::workload::Workload;

/// Rejected world mutations.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("position {0} is already occupied")]
    Occupied(NodePos),

    #[error("no bank at {0}")]
    Vacant(NodePos),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Owns the banks, their energy records, and the connectivity graph.
///
/// All mutation happens through [`World::place`], [`World::remove`] and
/// [`World::step`]. Within a tick, banks are visited in [`NodePos`] order:
/// scheduled layout events first, then random workload, then the cadence
/// checks of the scheduler.
#[derive(Debug, Clone)]
pub struct World {
    tick: u64,
    tiers: TierConfig,
    graph: ConnectivityGraph,
    arena: NodeArena,
    banks: BankRegistry,
    scheduler: EqualizationScheduler,
    workload: Workload,
    pending: VecDeque<LayoutEvent>,
}

impl World {
    /// Creates an empty world whose next tick is `start_tick`.
    pub fn new(scheduler: EqualizationScheduler, tiers: TierConfig, start_tick: u64) -> Self {
        Self {
            tick: start_tick,
            tiers,
            graph: ConnectivityGraph::new(),
            arena: NodeArena::new(),
            banks: BankRegistry::new(),
            scheduler,
            workload: Workload::idle(),
            pending: VecDeque::new(),
        }
    }

    pub fn with_workload(mut self, workload: Workload) -> Self {
        self.workload = workload;
        self
    }

    /// Builds the world described by a scenario: initial banks, workload
    /// and scheduled layout events.
    ///
    /// # Panics
    ///
    /// Panics if a cadence or workload chance is out of range. Run
    /// [`ScenarioConfig::validate`] first.
    ///
    /// # Errors
    ///
    /// Returns a `WorldError` if two banks share a position.
    pub fn from_config(cfg: &ScenarioConfig) -> Result<Self, WorldError> {
        let mut world = Self::empty_for(cfg);
        for bank in &cfg.banks {
            world.place(bank.pos(), bank.tier, bank.stored)?;
        }
        for event in cfg.events.iter().filter_map(LayoutEvent::from_config) {
            world.schedule(event);
        }
        Ok(world)
    }

    /// A world with the scenario's timing, tiers and workload but no banks.
    pub fn empty_for(cfg: &ScenarioConfig) -> Self {
        let sim = &cfg.simulation;
        let scheduler = EqualizationScheduler::new(sim.io_average_ticks, sim.equalize_interval);
        Self::new(scheduler, cfg.tiers, sim.start_tick)
            .with_workload(Workload::new(cfg.workload, sim.seed))
    }

    /// Queues a layout change. Events with equal ticks apply in the order
    /// they were scheduled.
    pub fn schedule(&mut self, event: LayoutEvent) {
        let at = self.pending.partition_point(|e| e.tick <= event.tick);
        self.pending.insert(at, event);
    }

    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Places a bank and joins it to every same-tier neighbour.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Occupied`] if a bank already sits at `pos`.
    pub fn place(&mut self, pos: NodePos, tier: Tier, stored: u64) -> Result<(), WorldError> {
        let node = StorageNode::with_stored(tier, self.tiers.capacity(tier), stored);
        self.insert_bank(pos, node, IoConfig::default())?;
        self.activate(pos)?;
        info!(%pos, %tier, stored, members = self.graph.component_of(pos).len(), "placed bank");
        Ok(())
    }

    /// Removes a bank, splitting its network if it was a cut point.
    ///
    /// Returns the removed record; its energy leaves the world with it.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Vacant`] if no bank sits at `pos`.
    pub fn remove(&mut self, pos: NodePos) -> Result<StorageNode, WorldError> {
        self.banks.remove(pos).ok_or(WorldError::Vacant(pos))?;
        self.graph.remove(pos);
        let node = self.arena.remove(pos).ok_or(WorldError::Vacant(pos))?;
        info!(
            %pos,
            stored = node.stored(),
            networks = self.graph.component_count(),
            "removed bank"
        );
        Ok(node)
    }

    /// Adds the device and its record without touching the graph.
    pub(crate) fn insert_bank(
        &mut self,
        pos: NodePos,
        node: StorageNode,
        io_config: IoConfig,
    ) -> Result<(), WorldError> {
        let mut bank = CapacitorBank::new(pos, node.tier());
        bank.set_io_config(io_config);
        self.banks
            .insert(bank)
            .map_err(|_| WorldError::Occupied(pos))?;
        self.arena.insert(pos, node);
        Ok(())
    }

    /// Integrates `pos` and connects it to every integrated same-tier neighbour.
    pub(crate) fn activate(&mut self, pos: NodePos) -> Result<(), WorldError> {
        let tier = self
            .banks
            .get(pos)
            .map(CapacitorBank::tier)
            .ok_or(WorldError::Vacant(pos))?;
        self.graph.integrate(pos, tier);
        for neighbour in self.banks.compatible_neighbours(pos, tier) {
            if self.graph.contains(neighbour) {
                self.graph.connect(pos, neighbour)?;
            }
        }
        Ok(())
    }

    /// Runs one tick and returns its record.
    pub fn step(&mut self) -> TickResult {
        let tick = self.tick;
        let layout_changes = self.apply_due_events(tick);
        let (energy_in, energy_out) = self.apply_workload();

        let mut averaging_passes = 0;
        let mut equalized_networks = 0;
        let positions: Vec<NodePos> = self.arena.iter().map(|(pos, _)| pos).collect();
        for pos in positions {
            let outcome = self.scheduler.on_tick(&self.graph, &mut self.arena, pos, tick);
            if outcome.averaged.is_some() {
                averaging_passes += 1;
            }
            if outcome.equalized.is_some() {
                equalized_networks += 1;
            }
        }
        if averaging_passes > 0 {
            self.sync_members();
        }

        self.tick += 1;
        let mut result = self.summarize(tick);
        result.energy_in = energy_in;
        result.energy_out = energy_out;
        result.averaging_passes = averaging_passes;
        result.equalized_networks = equalized_networks;
        result.layout_changes = layout_changes;
        result
    }

    /// Runs `ticks` consecutive ticks.
    pub fn run(&mut self, ticks: u64) -> Vec<TickResult> {
        let mut clock = Clock::new(self.tick, ticks);
        let mut results = Vec::with_capacity(usize::try_from(ticks).unwrap_or(0));
        clock.run(|_| results.push(self.step()));
        results
    }

    fn apply_due_events(&mut self, tick: u64) -> usize {
        let mut applied = 0;
        while self.pending.front().is_some_and(|e| e.is_due(tick)) {
            let Some(event) = self.pending.pop_front() else {
                break;
            };
            let outcome = match event.action {
                LayoutAction::Place { tier, stored } => self.place(event.pos, tier, stored),
                LayoutAction::Remove => self.remove(event.pos).map(|_| ()),
            };
            match outcome {
                Ok(()) => applied += 1,
                Err(e) => warn!(tick, pos = %event.pos, error = %e, "skipping layout event"),
            }
        }
        applied
    }

    fn apply_workload(&mut self) -> (u64, u64) {
        let mut energy_in = 0_u64;
        let mut energy_out = 0_u64;
        for (pos, node) in self.arena.iter_mut() {
            let (can_input, can_output) = self.banks.get(pos).map_or((false, false), |bank| {
                (
                    bank.input_faces(&self.graph) > 0,
                    bank.output_faces(&self.graph) > 0,
                )
            });
            let demand = self.workload.sample(can_input, can_output);
            energy_in = energy_in.saturating_add(node.receive(demand.input, false));
            energy_out = energy_out.saturating_add(node.extract(demand.output, false));
        }
        (energy_in, energy_out)
    }

    fn sync_members(&mut self) {
        let mut changed = 0;
        for bank in self.banks.iter_mut() {
            let members = NetworkMembershipTracker::new(&self.graph, bank.pos()).members();
            if bank.sync_members(members) {
                changed += 1;
            }
        }
        if changed > 0 {
            debug!(tick = self.tick, changed, "synced member lists");
        }
    }

    fn summarize(&self, tick: u64) -> TickResult {
        let networks = self.networks();
        TickResult {
            tick,
            nodes: self.arena.len(),
            networks: networks.len(),
            largest_network: networks.iter().map(|n| n.members.len()).max().unwrap_or(0),
            total_stored: saturate(self.total_stored()),
            total_capacity: networks
                .iter()
                .fold(0_u64, |acc, n| acc.saturating_add(n.capacity)),
            max_spread: networks.iter().map(|n| n.spread).max().unwrap_or(0),
            ..TickResult::default()
        }
    }

    /// Next tick to be simulated.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn tiers(&self) -> &TierConfig {
        &self.tiers
    }

    pub fn graph(&self) -> &ConnectivityGraph {
        &self.graph
    }

    pub fn scheduler(&self) -> &EqualizationScheduler {
        &self.scheduler
    }

    pub fn banks(&self) -> &BankRegistry {
        &self.banks
    }

    pub fn node(&self, pos: NodePos) -> Option<&StorageNode> {
        self.arena.get(pos)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodePos, &StorageNode)> {
        self.arena.iter()
    }

    pub fn bank(&self, pos: NodePos) -> Option<&CapacitorBank> {
        self.banks.get(pos)
    }

    /// Energy stored across every bank.
    pub fn total_stored(&self) -> u128 {
        self.arena.iter().map(|(_, node)| u128::from(node.stored())).sum()
    }

    /// Members of the network `pos` belongs to, empty if there is no bank.
    pub fn members_of(&self, pos: NodePos) -> Vec<NodePos> {
        NetworkMembershipTracker::new(&self.graph, pos).members()
    }

    /// Network-wide per-tick rates as reported for the bank at `pos`.
    pub fn reported_rates(&self, pos: NodePos) -> Option<Throughput> {
        self.arena
            .get(pos)
            .map(|node| self.scheduler.reported_rates(node))
    }

    pub fn set_io_config(&mut self, pos: NodePos, config: IoConfig) -> Result<(), WorldError> {
        let bank = self.banks.get_mut(pos).ok_or(WorldError::Vacant(pos))?;
        bank.set_io_config(config);
        Ok(())
    }

    /// I/O configuration of every other member of `owner`'s network.
    pub fn member_configs(
        &self,
        owner: NodePos,
    ) -> Result<Vec<MemberConfig<IoConfig>>, WorldError> {
        if !self.banks.contains(owner) {
            return Err(WorldError::Vacant(owner));
        }
        Ok(NetworkMembershipTracker::new(&self.graph, owner).collect(&self.banks))
    }

    /// Applies I/O configuration sent on behalf of `owner` to its network members.
    pub fn apply_member_configs(
        &mut self,
        owner: NodePos,
        updates: Vec<MemberConfig<IoConfig>>,
    ) -> Result<ApplyReport, WorldError> {
        if !self.banks.contains(owner) {
            return Err(WorldError::Vacant(owner));
        }
        let report =
            NetworkMembershipTracker::new(&self.graph, owner).apply(updates, &mut self.banks);
        debug!(
            %owner,
            applied = report.applied,
            skipped = report.skipped,
            "applied member configs"
        );
        Ok(report)
    }

    /// One summary per network, ordered by leader.
    pub fn networks(&self) -> Vec<NetworkSummary> {
        let mut summaries: Vec<NetworkSummary> = self
            .graph
            .components()
            .filter_map(|(_, members)| self.summarize_network(members.iter().copied().collect()))
            .collect();
        summaries.sort_by_key(|s| s.leader);
        summaries
    }

    fn summarize_network(&self, members: Vec<NodePos>) -> Option<NetworkSummary> {
        let leader = *members.first()?;
        let first = self.arena.get(leader)?;
        let mut stored = 0_u64;
        let mut capacity = 0_u64;
        let mut low = u64::MAX;
        let mut high = 0_u64;
        for node in members.iter().filter_map(|m| self.arena.get(*m)) {
            stored = stored.saturating_add(node.stored());
            capacity = capacity.saturating_add(node.capacity());
            low = low.min(node.stored());
            high = high.max(node.stored());
        }
        Some(NetworkSummary {
            leader,
            tier: first.tier(),
            stored,
            capacity,
            spread: high.saturating_sub(low),
            phase: self.scheduler.phase_of(leader),
            rates: self.scheduler.reported_rates(first),
            members,
        })
    }

    /// Everything a client shows for the bank at `pos`.
    pub fn node_view(&self, pos: NodePos) -> Option<NodeView> {
        let node = self.arena.get(pos)?;
        let members = self.members_of(pos);
        Some(NodeView {
            pos,
            tier: node.tier(),
            capacity: node.capacity(),
            stored: node.stored(),
            rates: self.scheduler.reported_rates(node),
            leader: members.first().copied().unwrap_or(pos),
            members,
        })
    }
}

fn saturate(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
