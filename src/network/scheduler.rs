//! Per-tick cadence driver for a storage network.
//!
//! Two independent cadences run off the global tick counter:
//!
//! - **I/O averaging** every `io_average_ticks` ticks: the first member of a
//!   network to tick sums every member's counters, resets them, and
//!   broadcasts the totals so all members report the same throughput. The
//!   `last_reset_tick` stamp on each record stops the other members from
//!   repeating the pass in the same tick.
//! - **Equalization** every `equalize_interval` ticks, offset by a phase
//!   derived from the leader's position so different networks spread out
//!   over the interval. Only the leader (first member in canonical order)
//!   redistributes.

use tracing::{debug, trace};

use super::arena::NodeArena;
use super::graph::ConnectivityGraph;
use super::node::{StorageNode, Throughput};
use super::pos::NodePos;

/// Default length of the I/O averaging window in ticks.
pub const DEFAULT_IO_AVERAGE_TICKS: u64 = 10;

/// Default number of ticks between equalization passes of one network.
pub const DEFAULT_EQUALIZE_INTERVAL: u64 = 200;

/// Result of one equalization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualizeOutcome {
    /// Member that ran the pass.
    pub leader: NodePos,
    /// Number of members redistributed.
    pub members: usize,
    /// Energy in the network before and after the pass.
    pub total: u128,
    /// Per-member share targeted by the first pass.
    pub share: u128,
    /// Energy that found no free space. Zero unless a member's stored
    /// amount exceeded its capacity before the pass.
    pub leftover: u128,
}

/// What the scheduler did for one node on one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Network totals, when this node ran the averaging pass.
    pub averaged: Option<Throughput>,
    /// Set when this node led an equalization pass.
    pub equalized: Option<EqualizeOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualizationScheduler {
    io_average_ticks: u64,
    equalize_interval: u64,
}

impl Default for EqualizationScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_IO_AVERAGE_TICKS, DEFAULT_EQUALIZE_INTERVAL)
    }
}

impl EqualizationScheduler {
    /// Creates a scheduler with the given cadences.
    ///
    /// # Panics
    ///
    /// Panics if either cadence is zero.
    pub fn new(io_average_ticks: u64, equalize_interval: u64) -> Self {
        assert!(io_average_ticks > 0, "io_average_ticks must be > 0");
        assert!(equalize_interval > 0, "equalize_interval must be > 0");
        Self {
            io_average_ticks,
            equalize_interval,
        }
    }

    pub fn io_average_ticks(&self) -> u64 {
        self.io_average_ticks
    }

    pub fn equalize_interval(&self) -> u64 {
        self.equalize_interval
    }

    pub fn is_averaging_tick(&self, tick: u64) -> bool {
        tick % self.io_average_ticks == 0
    }

    /// Tick offset within the equalization interval at which `pos` would lead.
    pub fn phase_of(&self, pos: NodePos) -> u64 {
        mix64(pos.as_long()) % self.equalize_interval
    }

    pub fn is_equalization_tick(&self, pos: NodePos, tick: u64) -> bool {
        tick % self.equalize_interval == self.phase_of(pos)
    }

    /// Runs both cadence checks on behalf of `pos`.
    pub fn on_tick(
        &self,
        graph: &ConnectivityGraph,
        arena: &mut NodeArena,
        pos: NodePos,
        tick: u64,
    ) -> TickOutcome {
        let averaged = if self.is_averaging_tick(tick) {
            self.average_io(graph, arena, pos, tick)
        } else {
            None
        };

        let equalized = if self.is_equalization_tick(pos, tick)
            && graph.contains(pos)
            && graph.leader_of(pos) == pos
        {
            self.equalize(graph, arena, pos)
        } else {
            None
        };

        TickOutcome {
            averaged,
            equalized,
        }
    }

    /// Sums, resets, and broadcasts the I/O counters of `pos`'s network.
    ///
    /// Returns `None` if `pos` is not integrated or the network already ran
    /// the pass at `tick`.
    pub fn average_io(
        &self,
        graph: &ConnectivityGraph,
        arena: &mut NodeArena,
        pos: NodePos,
        tick: u64,
    ) -> Option<Throughput> {
        if !graph.contains(pos) {
            return None;
        }
        let members = graph.component_of(pos);
        let already_ran = members
            .iter()
            .filter_map(|m| arena.get(*m))
            .any(|node| node.last_reset_tick() == Some(tick));
        if already_ran {
            trace!(%pos, tick, "averaging already done this tick");
            return None;
        }

        let mut totals = Throughput::default();
        for member in &members {
            if let Some(node) = arena.get_mut(*member) {
                totals.added = totals.added.saturating_add(node.added());
                totals.removed = totals.removed.saturating_add(node.removed());
                node.reset_counters(tick);
            }
        }
        for member in &members {
            if let Some(node) = arena.get_mut(*member) {
                node.set_network_io(totals);
            }
        }
        trace!(%pos, tick, added = totals.added, removed = totals.removed, "averaged network io");
        Some(totals)
    }

    /// Average per-tick throughput of the network `node` belongs to.
    pub fn reported_rates(&self, node: &StorageNode) -> Throughput {
        node.network_io().per_tick(self.io_average_ticks)
    }

    /// Equalizes stored energy across `pos`'s network, regardless of cadence
    /// or leadership.
    pub fn equalize(
        &self,
        graph: &ConnectivityGraph,
        arena: &mut NodeArena,
        pos: NodePos,
    ) -> Option<EqualizeOutcome> {
        if !graph.contains(pos) {
            return None;
        }
        let members = graph.component_of(pos);
        let outcome = redistribute(arena, &members)?;
        debug!(
            leader = %outcome.leader,
            members = outcome.members,
            total = %outcome.total,
            share = %outcome.share,
            "equalized network"
        );
        Some(outcome)
    }
}

/// Spreads the energy held by `members` evenly, in the order given.
///
/// Each member is first set to `min(share, remaining)` where
/// `share = total / n`. Whatever capacity limits or integer division left
/// over is then water-filled into the members that still have free space:
/// members with the least room are topped up first while that keeps them at
/// or below the common level, and the rest rise together, a division
/// remainder landing as `+1` on the leading members. Members that are not
/// full end within 1 of each other and no full member sits above them. The
/// sum of stored energy is unchanged. Returns `None` if no member has a
/// record in `arena`.
pub fn redistribute(arena: &mut NodeArena, members: &[NodePos]) -> Option<EqualizeOutcome> {
    let present: Vec<NodePos> = members
        .iter()
        .copied()
        .filter(|pos| arena.contains(*pos))
        .collect();
    let leader = *present.first()?;

    let total = arena.total_stored(&present);
    let share = total / present.len() as u128;

    let mut remaining = total;
    for pos in &present {
        if let Some(node) = arena.get_mut(*pos) {
            node.set_stored(saturate(share.min(remaining)));
            remaining -= u128::from(node.stored());
        }
    }

    // Every member with room now sits at `share`, so the leftover only has
    // to be levelled across those members.
    let mut open: Vec<(u64, usize)> = present
        .iter()
        .enumerate()
        .filter_map(|(i, pos)| arena.get(*pos).map(|node| (node.free_space(), i)))
        .filter(|(free, _)| *free > 0)
        .collect();
    open.sort_by_key(|(free, _)| *free);

    let mut rising = open.len();
    let mut filled = 0;
    for (free, i) in &open {
        if remaining == 0 || u128::from(*free) > remaining / rising as u128 {
            break;
        }
        if let Some(node) = arena.get_mut(present[*i]) {
            remaining -= u128::from(node.absorb(*free));
        }
        rising -= 1;
        filled += 1;
    }

    if rising > 0 && remaining > 0 {
        let mut rest: Vec<usize> = open[filled..].iter().map(|(_, i)| *i).collect();
        rest.sort_unstable();
        let lift = remaining / rising as u128;
        let extra = (remaining % rising as u128) as usize;
        for (rank, i) in rest.into_iter().enumerate() {
            let offer = lift + u128::from(rank < extra);
            if let Some(node) = arena.get_mut(present[i]) {
                remaining -= u128::from(node.absorb(saturate(offer)));
            }
        }
    }

    Some(EqualizeOutcome {
        leader,
        members: present.len(),
        total,
        share,
        leftover: remaining,
    })
}

fn saturate(amount: u128) -> u64 {
    u64::try_from(amount).unwrap_or(u64::MAX)
}

/// SplitMix64 finalizer.
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::network::node::Tier;

    fn p(x: i32) -> NodePos {
        NodePos::new(x, 0, 0)
    }

    /// Builds a line network `0-1-..-n` with the given capacities and stored amounts.
    fn line(capacities: &[u64], stored: &[u64]) -> (ConnectivityGraph, NodeArena) {
        let mut graph = ConnectivityGraph::new();
        let mut arena = NodeArena::new();
        for (i, (&cap, &s)) in capacities.iter().zip(stored).enumerate() {
            let pos = p(i as i32);
            graph.integrate(pos, Tier::Basic);
            arena.insert(pos, StorageNode::with_stored(Tier::Basic, cap, s));
            if i > 0 {
                graph.connect(p(i as i32 - 1), pos).unwrap();
            }
        }
        (graph, arena)
    }

    fn stored(arena: &NodeArena) -> Vec<u64> {
        arena.iter().map(|(_, n)| n.stored()).collect()
    }

    #[test]
    fn equal_capacities_get_remainder_on_first_member() {
        let (graph, mut arena) = line(&[100, 100, 100], &[90, 10, 0]);
        let outcome = EqualizationScheduler::default()
            .equalize(&graph, &mut arena, p(1))
            .unwrap();
        assert_eq!(stored(&arena), vec![34, 33, 33]);
        assert_eq!(outcome.total, 100);
        assert_eq!(outcome.share, 33);
        assert_eq!(outcome.leftover, 0);
        assert_eq!(outcome.leader, p(0));
    }

    #[test]
    fn small_member_clamps_and_rest_flows_to_larger() {
        let (graph, mut arena) = line(&[50, 200], &[0, 200]);
        EqualizationScheduler::default().equalize(&graph, &mut arena, p(0));
        assert_eq!(stored(&arena), vec![50, 150]);
    }

    #[test]
    fn division_remainder_spreads_one_unit_per_member() {
        let (graph, mut arena) = line(&[100, 100, 100], &[100, 100, 0]);
        EqualizationScheduler::default().equalize(&graph, &mut arena, p(0));
        assert_eq!(stored(&arena), vec![67, 67, 66]);
    }

    #[test]
    fn remainder_skips_full_members() {
        let (graph, mut arena) = line(&[10, 10, 100], &[10, 10, 12]);
        EqualizationScheduler::default().equalize(&graph, &mut arena, p(0));
        assert_eq!(stored(&arena), vec![10, 10, 12]);
    }

    #[test]
    fn equalization_leaves_counters_alone() {
        let (graph, mut arena) = line(&[100, 100], &[100, 0]);
        EqualizationScheduler::default().equalize(&graph, &mut arena, p(0));
        for (_, node) in arena.iter() {
            assert_eq!(node.added(), 0);
            assert_eq!(node.removed(), 0);
        }
    }

    #[test]
    fn conservation_and_fairness_hold_for_random_networks() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let n = rng.random_range(1..=12);
            let capacities: Vec<u64> = (0..n).map(|_| rng.random_range(1..=1_000)).collect();
            let stored_before: Vec<u64> = capacities
                .iter()
                .map(|&c| rng.random_range(0..=c))
                .collect();
            let (graph, mut arena) = line(&capacities, &stored_before);

            let outcome = EqualizationScheduler::default()
                .equalize(&graph, &mut arena, p(0))
                .unwrap();

            let after = stored(&arena);
            let before_sum: u64 = stored_before.iter().sum();
            assert_eq!(after.iter().sum::<u64>(), before_sum);
            assert_eq!(outcome.leftover, 0);

            let share = outcome.share as u64;
            for (i, (&a, &cap_a)) in after.iter().zip(&capacities).enumerate() {
                assert!(a <= cap_a);
                if cap_a >= share {
                    assert!(a >= share, "member {i} below share for {capacities:?}");
                }
                if a == cap_a {
                    continue;
                }
                // A member with room left sits at the top level, within 1.
                for (j, (&b, &cap_b)) in after.iter().zip(&capacities).enumerate() {
                    assert!(b <= a + 1, "{after:?} from {stored_before:?} caps {capacities:?}");
                    if b < cap_b {
                        assert!(a.abs_diff(b) <= 1, "members {i} and {j} in {after:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn full_member_in_the_middle_does_not_tilt_the_others() {
        let (graph, mut arena) = line(&[200, 52, 200], &[200, 52, 48]);
        let outcome = EqualizationScheduler::default()
            .equalize(&graph, &mut arena, p(0))
            .unwrap();
        assert_eq!(outcome.share, 100);
        assert_eq!(stored(&arena), vec![124, 52, 124]);
    }

    #[test]
    fn small_room_is_topped_up_before_the_rest_rise() {
        let (graph, mut arena) = line(&[10, 103, 1_000, 1_000], &[0, 0, 0, 400]);
        EqualizationScheduler::default().equalize(&graph, &mut arena, p(0));
        // share 100: 90 left over, 3 fit on member 1, 87 split between 2 and 3.
        assert_eq!(stored(&arena), vec![10, 103, 144, 143]);
    }

    #[test]
    fn one_large_member_among_many_tiny_ones_settles_quickly() {
        let n = 5_000;
        let mut capacities = vec![u64::MAX];
        capacities.extend(std::iter::repeat_n(1, n - 1));
        let mut stored_before = vec![u64::MAX];
        stored_before.extend(std::iter::repeat_n(0, n - 1));
        let mut arena = NodeArena::new();
        let members: Vec<NodePos> = (0..n as i32).map(p).collect();
        for (pos, (&cap, &s)) in members.iter().zip(capacities.iter().zip(&stored_before)) {
            arena.insert(*pos, StorageNode::with_stored(Tier::Basic, cap, s));
        }

        let started = std::time::Instant::now();
        let outcome = redistribute(&mut arena, &members).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        assert_eq!(outcome.leftover, 0);
        assert_eq!(arena.get(p(0)).map(StorageNode::stored), Some(u64::MAX - (n as u64 - 1)));
        assert!(members[1..].iter().all(|m| arena.get(*m).map(StorageNode::stored) == Some(1)));
    }

    #[test]
    fn totals_beyond_u64_are_conserved() {
        let (graph, mut arena) = line(&[u64::MAX, u64::MAX, u64::MAX], &[u64::MAX, u64::MAX, 0]);
        let outcome = EqualizationScheduler::default()
            .equalize(&graph, &mut arena, p(0))
            .unwrap();
        let after: u128 = arena.iter().map(|(_, n)| u128::from(n.stored())).sum();
        assert_eq!(after, 2 * u128::from(u64::MAX));
        assert_eq!(outcome.total, after);
    }

    #[test]
    fn equalize_ignores_unintegrated_nodes() {
        let mut arena = NodeArena::new();
        arena.insert(p(0), StorageNode::with_stored(Tier::Basic, 10, 5));
        let graph = ConnectivityGraph::new();
        assert!(EqualizationScheduler::default()
            .equalize(&graph, &mut arena, p(0))
            .is_none());
        assert!(redistribute(&mut arena, &[]).is_none());
    }

    #[test]
    fn averaging_sums_resets_and_broadcasts() {
        let (graph, mut arena) = line(&[100, 100, 100], &[50, 50, 50]);
        arena.get_mut(p(0)).unwrap().receive(20, false);
        arena.get_mut(p(1)).unwrap().extract(30, false);
        arena.get_mut(p(2)).unwrap().receive(10, false);

        let scheduler = EqualizationScheduler::default();
        let totals = scheduler.average_io(&graph, &mut arena, p(2), 10).unwrap();
        assert_eq!(
            totals,
            Throughput {
                added: 30,
                removed: 30
            }
        );
        for (_, node) in arena.iter() {
            assert_eq!(node.added(), 0);
            assert_eq!(node.removed(), 0);
            assert_eq!(node.last_reset_tick(), Some(10));
            assert_eq!(node.network_io(), totals);
            assert_eq!(
                scheduler.reported_rates(node),
                Throughput {
                    added: 3,
                    removed: 3
                }
            );
        }
    }

    #[test]
    fn averaging_twice_in_one_tick_matches_once() {
        let (graph, mut arena) = line(&[100, 100], &[0, 0]);
        arena.get_mut(p(0)).unwrap().receive(40, false);
        let scheduler = EqualizationScheduler::default();

        scheduler.average_io(&graph, &mut arena, p(0), 20);
        let once = arena.clone();

        arena.get_mut(p(1)).unwrap().receive(5, false);
        assert!(scheduler.average_io(&graph, &mut arena, p(1), 20).is_none());
        assert_eq!(
            arena.get(p(0)).unwrap().network_io(),
            once.get(p(0)).unwrap().network_io()
        );
        assert_eq!(arena.get(p(1)).unwrap().added(), 5);
        assert_eq!(arena.get(p(0)).unwrap().added(), 0);
    }

    #[test]
    fn on_tick_only_leader_equalizes_at_its_phase() {
        let (graph, mut arena) = line(&[100, 100, 100], &[90, 10, 0]);
        let scheduler = EqualizationScheduler::new(10, 200);
        let leader = p(0);
        let phase = scheduler.phase_of(leader);
        let tick = 400 + phase;

        for pos in [p(1), p(2)] {
            let outcome = scheduler.on_tick(&graph, &mut arena, pos, tick);
            assert!(outcome.equalized.is_none());
        }
        assert_eq!(stored(&arena), vec![90, 10, 0]);

        let outcome = scheduler.on_tick(&graph, &mut arena, leader, tick);
        assert_eq!(outcome.equalized.map(|o| o.leader), Some(leader));
        assert_eq!(stored(&arena), vec![34, 33, 33]);

        let off_phase = scheduler.on_tick(&graph, &mut arena, leader, tick + 1);
        assert!(off_phase.equalized.is_none());
    }

    #[test]
    fn on_tick_averages_only_on_cadence() {
        let (graph, mut arena) = line(&[100], &[0]);
        let scheduler = EqualizationScheduler::new(10, 200);
        arena.get_mut(p(0)).unwrap().receive(7, false);
        assert!(scheduler.on_tick(&graph, &mut arena, p(0), 13).averaged.is_none());
        assert_eq!(
            scheduler.on_tick(&graph, &mut arena, p(0), 20).averaged,
            Some(Throughput {
                added: 7,
                removed: 0
            })
        );
    }

    #[test]
    fn phase_stays_within_interval() {
        let scheduler = EqualizationScheduler::new(10, 200);
        for x in -50..50 {
            assert!(scheduler.phase_of(NodePos::new(x, x, -x)) < 200);
        }
    }

    #[test]
    #[should_panic]
    fn zero_cadence_panics() {
        EqualizationScheduler::new(0, 200);
    }
}
