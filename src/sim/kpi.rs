//! Post-hoc run summary computed from tick records.

use std::fmt;

use serde::Serialize;

use super::types::TickResult;

/// Aggregate indicators of a complete run.
///
/// Computed from `Vec<TickResult>` so the report always agrees with the
/// exported per-tick data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolReport {
    /// Number of ticks simulated.
    pub ticks: usize,
    /// Energy accepted from the workload over the run.
    pub energy_in: u64,
    /// Energy handed to the workload over the run.
    pub energy_out: u64,
    /// Stored energy after the last tick.
    pub final_stored: u64,
    /// Mean fill level after each tick (0.0 to 1.0).
    pub mean_fill: f64,
    /// Total averaging passes across all networks.
    pub averaging_passes: usize,
    /// Total equalization passes across all networks.
    pub equalization_passes: usize,
    /// Placements and removals applied.
    pub layout_changes: usize,
    /// Most networks present at once.
    pub peak_networks: usize,
    /// Networks present after the last tick.
    pub final_networks: usize,
    /// Largest member spread seen right after an equalization tick.
    pub worst_post_equalize_spread: u64,
    /// Member spread after the last tick.
    pub final_spread: u64,
}

impl PoolReport {
    /// Computes all indicators from the complete tick record vector.
    pub fn from_results(results: &[TickResult]) -> Self {
        let Some(last) = results.last() else {
            return Self::default();
        };

        let mut report = Self {
            ticks: results.len(),
            final_stored: last.total_stored,
            final_networks: last.networks,
            final_spread: last.max_spread,
            ..Self::default()
        };
        let mut fill_sum = 0.0_f64;
        for r in results {
            report.energy_in = report.energy_in.saturating_add(r.energy_in);
            report.energy_out = report.energy_out.saturating_add(r.energy_out);
            report.averaging_passes += r.averaging_passes;
            report.equalization_passes += r.equalized_networks;
            report.layout_changes += r.layout_changes;
            report.peak_networks = report.peak_networks.max(r.networks);
            if r.equalized_networks > 0 {
                report.worst_post_equalize_spread =
                    report.worst_post_equalize_spread.max(r.max_spread);
            }
            if r.total_capacity > 0 {
                fill_sum += r.total_stored as f64 / r.total_capacity as f64;
            }
        }
        report.mean_fill = fill_sum / results.len() as f64;
        report
    }
}

impl fmt::Display for PoolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Pool Report ---")?;
        writeln!(f, "Ticks simulated:       {}", self.ticks)?;
        writeln!(f, "Energy in / out:       {} / {}", self.energy_in, self.energy_out)?;
        writeln!(f, "Final stored:          {}", self.final_stored)?;
        writeln!(f, "Mean fill:             {:.1}%", self.mean_fill * 100.0)?;
        writeln!(
            f,
            "Passes:                {} averaging, {} equalization",
            self.averaging_passes, self.equalization_passes
        )?;
        writeln!(f, "Layout changes:        {}", self.layout_changes)?;
        writeln!(
            f,
            "Networks:              {} final ({} peak)",
            self.final_networks, self.peak_networks
        )?;
        write!(
            f,
            "Spread:                {} final, {} worst after equalizing",
            self.final_spread, self.worst_post_equalize_spread
        )
    }
}
