//! Storage devices and the interfaces they expose to the world.

/// Capacitor bank device.
pub mod bank;
/// Per-face I/O policy blobs.
pub mod io_config;
pub mod registry;
pub mod types;

pub use bank::CapacitorBank;
pub use io_config::{IoConfig, IoMode};
pub use registry::BankRegistry;
pub use types::SpatialQuery;
