//! Shared energy pools for adjacent storage devices.
//!
//! Capacitor banks of the same tier that touch face to face form one
//! network. The network layer tracks connectivity as banks come and go,
//! averages I/O counters across members, and periodically evens out stored
//! energy. The simulation layer places banks in a small world and drives it
//! tick by tick.

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod devices;
/// CSV export and world saves.
pub mod io;
/// Connectivity graph, energy records, and the equalization scheduler.
pub mod network;
/// World, workload, and per-tick records.
pub mod sim;
