//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use energy_pool::config::{BankConfig, ScenarioConfig, TierConfig, WorkloadConfig};
use energy_pool::network::{EqualizationScheduler, NodePos, StorageNode, Tier};
use energy_pool::sim::world::World;

/// Small capacities so hand-computed amounts stay readable.
pub fn small_tiers() -> TierConfig {
    TierConfig {
        basic: 100,
        advanced: 200,
        vibrant: 1_000,
    }
}

/// Empty world with averaging every 10 ticks and equalization every 200.
pub fn empty_world() -> World {
    World::new(EqualizationScheduler::default(), small_tiers(), 0)
}

/// Position on the x axis.
pub fn at(x: i32) -> NodePos {
    NodePos::new(x, 0, 0)
}

/// World holding one line of basic banks with the given stored amounts.
pub fn line(stored: &[u64]) -> World {
    let mut world = empty_world();
    for (x, amount) in stored.iter().enumerate() {
        world
            .place(at(x as i32), Tier::Basic, *amount)
            .expect("line positions are distinct");
    }
    world
}

/// Stored amount of every bank on the x axis from 0 to `n`.
pub fn stored_along(world: &World, n: i32) -> Vec<u64> {
    (0..n)
        .filter_map(|x| world.node(at(x)))
        .map(StorageNode::stored)
        .collect()
}

/// Runs until the leader at `leader` has equalized once.
pub fn run_through_equalization(world: &mut World, leader: NodePos) {
    let phase = world.scheduler().phase_of(leader);
    let interval = world.scheduler().equalize_interval();
    let now = world.tick();
    let wait = (phase + interval - now % interval) % interval;
    world.run(wait + 1);
}

/// Scenario without random traffic.
pub fn quiet_scenario(banks: Vec<BankConfig>) -> ScenarioConfig {
    ScenarioConfig {
        banks,
        workload: WorkloadConfig {
            input_chance: 0.0,
            output_chance: 0.0,
            ..WorkloadConfig::default()
        },
        ..ScenarioConfig::default()
    }
}
