//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::sim::kpi::PoolReport;
use crate::sim::types::TickResult;

/// Combined state response: world position in time, report, and latest tick.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    /// Next tick the world would simulate.
    pub tick: u64,
    pub nodes: usize,
    pub networks: usize,
    /// Aggregate report of the finished run.
    pub report: PoolReport,
    /// Most recent tick record, absent for an empty run.
    pub latest_tick: Option<TickResult>,
}

/// Optional range query parameters for the telemetry endpoint.
#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// Start tick (inclusive).
    pub from: Option<u64>,
    /// End tick (inclusive).
    pub to: Option<u64>,
}

/// Error response body for 4xx and 5xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
