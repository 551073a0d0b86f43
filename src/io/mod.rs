/// CSV export of per-tick results.
pub mod export;
pub mod save;
