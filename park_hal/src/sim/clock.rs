//! Monotonic microsecond clock shared by the simulated peripherals.

use std::time::Instant;

/// Microseconds since board construction, like `micros()` on the target.
#[derive(Debug, Clone, Copy)]
pub struct SimClock {
    origin: Instant,
}

impl SimClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Elapsed time [µs].
    pub fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}
