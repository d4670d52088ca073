//! Fixed-length moving average.

use park_common::consts::SMOOTH_LEN;

/// Ring of the last [`SMOOTH_LEN`] samples.
///
/// The first sample pre-fills every slot, so the filter starts at the first
/// reading instead of ramping up from zero.
#[derive(Debug, Clone, Copy)]
pub struct SmoothingRing {
    samples: [f32; SMOOTH_LEN],
    next: usize,
    primed: bool,
}

impl SmoothingRing {
    pub const fn new() -> Self {
        Self {
            samples: [0.0; SMOOTH_LEN],
            next: 0,
            primed: false,
        }
    }

    /// Add a sample and return the mean of the ring.
    pub fn push(&mut self, sample: f32) -> f32 {
        if !self.primed {
            self.samples = [sample; SMOOTH_LEN];
            self.primed = true;
            self.next = 1 % SMOOTH_LEN;
            return sample;
        }
        self.samples[self.next] = sample;
        self.next = (self.next + 1) % SMOOTH_LEN;
        self.mean()
    }

    /// Accumulates in f64 so a ring of equal samples averages back exactly.
    pub fn mean(&self) -> f32 {
        let sum: f64 = self.samples.iter().map(|&s| f64::from(s)).sum();
        (sum / SMOOTH_LEN as f64) as f32
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }
}

impl Default for SmoothingRing {
    fn default() -> Self {
        Self::new()
    }
}
