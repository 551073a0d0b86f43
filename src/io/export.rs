//! CSV export for per-tick results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::TickResult;

/// Column header for CSV telemetry export.
const HEADER: &str = "tick,nodes,networks,largest_network,total_stored,total_capacity,\
                       energy_in,energy_out,averaging_passes,equalized_networks,\
                       layout_changes,max_spread";

/// Exports tick results to a CSV file at the given path.
///
/// Writes a header row followed by one data row per tick. Produces
/// deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[TickResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(results, buf)
}

/// Writes tick results as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &[TickResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in results {
        wtr.write_record(&[
            r.tick.to_string(),
            r.nodes.to_string(),
            r.networks.to_string(),
            r.largest_network.to_string(),
            r.total_stored.to_string(),
            r.total_capacity.to_string(),
            r.energy_in.to_string(),
            r.energy_out.to_string(),
            r.averaging_passes.to_string(),
            r.equalized_networks.to_string(),
            r.layout_changes.to_string(),
            r.max_spread.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
