use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::config::WorkloadConfig;

/// Energy offered to and requested from one bank on one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Demand {
    /// Energy a neighbouring generator tries to push in.
    pub input: u64,
    /// Energy a neighbouring consumer tries to pull out.
    pub output: u64,
}

/// Seeded random traffic standing in for the machines around each bank.
///
/// Every call draws the same number of random values whether or not the
/// bank has open faces, so a run is reproducible from its seed even when
/// I/O configurations change mid-run.
///
/// # Examples
///
/// ```
/// use energy_pool::config::WorkloadConfig;
/// use energy_pool::sim::workload::Workload;
///
/// let cfg = WorkloadConfig { input_chance: 1.0, input_max: 5, output_chance: 0.0, output_max: 5 };
/// let mut workload = Workload::new(cfg, 7);
/// let demand = workload.sample(true, true);
/// assert!(demand.input <= 5);
/// assert_eq!(demand.output, 0);
/// ```
#[derive(Debug, Clone)]
pub struct Workload {
    config: WorkloadConfig,
    rng: StdRng,
}

impl Workload {
    /// Creates a workload with its own random stream.
    ///
    /// # Panics
    ///
    /// Panics if either chance is outside `[0.0, 1.0]`.
    pub fn new(config: WorkloadConfig, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&config.input_chance),
            "input_chance must be in [0.0, 1.0]"
        );
        assert!(
            (0.0..=1.0).contains(&config.output_chance),
            "output_chance must be in [0.0, 1.0]"
        );
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Workload for a run resumed at `tick` from a save.
    ///
    /// The save holds no random state, so the stream is reseeded from
    /// `(seed, tick)`. It is reproducible for a given save but is not the
    /// stream an uninterrupted run would have drawn after `tick`. Tick 0
    /// keeps `seed` unchanged.
    pub fn resumed(config: WorkloadConfig, seed: u64, tick: u64) -> Self {
        Self::new(config, seed ^ tick.wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }

    /// A workload that never moves energy.
    pub fn idle() -> Self {
        Self::new(
            WorkloadConfig {
                input_chance: 0.0,
                input_max: 0,
                output_chance: 0.0,
                output_max: 0,
            },
            0,
        )
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    /// Draws the demand for one bank. Closed directions yield zero.
    pub fn sample(&mut self, can_input: bool, can_output: bool) -> Demand {
        let input_hit = self.rng.random_bool(self.config.input_chance);
        let input = self.rng.random_range(0..=self.config.input_max);
        let output_hit = self.rng.random_bool(self.config.output_chance);
        let output = self.rng.random_range(0..=self.config.output_max);
        Demand {
            input: if input_hit && can_input { input } else { 0 },
            output: if output_hit && can_output { output } else { 0 },
        }
    }
}
