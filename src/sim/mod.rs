/// Simulation clock for tick management.
pub mod clock;
/// Scheduled placements and removals.
pub mod event;
pub mod kpi;
pub mod types;
/// Banks, networks, and the per-tick driver.
pub mod world;
pub mod workload;
