/// A simulation clock that counts global ticks over a fixed run.
///
/// The `Clock` starts at an arbitrary tick so a resumed world keeps its
/// cadence phases, and yields each tick number once.
///
/// # Examples
///
/// ```
/// use energy_pool::sim::clock::Clock;
///
/// let mut clock = Clock::new(200, 3);
/// let mut ticks = Vec::new();
///
/// clock.run(|tick| ticks.push(tick));
/// assert_eq!(ticks, vec![200, 201, 202]);
/// ```
pub struct Clock {
    /// Next tick to hand out
    current: u64,
    /// First tick past the end of the run
    end: u64,
}

impl Clock {
    /// Creates a clock yielding `ticks` consecutive ticks from `start`.
    ///
    /// # Arguments
    ///
    /// * `start` - The first global tick of the run
    /// * `ticks` - The number of ticks the clock will yield
    pub fn new(start: u64, ticks: u64) -> Self {
        Self {
            current: start,
            end: start.saturating_add(ticks),
        }
    }

    /// Advances the clock by one tick.
    ///
    /// # Returns
    ///
    /// * `Some(tick)` - The global tick before advancing
    /// * `None` - If the run is over
    pub fn tick(&mut self) -> Option<u64> {
        if self.current < self.end {
            let tick = self.current;
            self.current += 1;
            Some(tick)
        } else {
            None
        }
    }

    /// Ticks left in the run.
    pub fn remaining(&self) -> u64 {
        self.end - self.current
    }

    /// Runs a function for each remaining tick.
    pub fn run(&mut self, mut f: impl FnMut(u64)) {
        while let Some(tick) = self.tick() {
            f(tick);
        }
    }
}
