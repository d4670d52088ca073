//! Alert policy.
//!
//! ```text
//!   distance:  0 ──── red ─────────── yellow ──── ∞
//!   pattern:   continuous │ beep bpm_max → bpm_min │ silent
//! ```
//!
//! Between the thresholds the rate is interpolated linearly: `bpm_max` at
//! red, `bpm_min` at yellow, rounded and clamped. Each beep is 100 ms on,
//! then `60000 / bpm - 100` ms off (never negative). A zero rate keeps a
//! 500 ms gap.

use park_common::consts::{BEEP_ON_MS, CONTINUOUS_ON_MS, ZERO_BPM_OFF_MS};
use std::time::Duration;

use crate::state::shared::AlertInputs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPattern {
    Silent,
    /// 1000 ms on, no gap.
    Continuous,
    Beep { bpm: u16 },
}

impl AlertPattern {
    pub fn on_time(self) -> Duration {
        match self {
            Self::Silent => Duration::ZERO,
            Self::Continuous => Duration::from_millis(CONTINUOUS_ON_MS),
            Self::Beep { .. } => Duration::from_millis(BEEP_ON_MS),
        }
    }

    pub fn off_time(self) -> Duration {
        match self {
            Self::Silent | Self::Continuous => Duration::ZERO,
            Self::Beep { bpm: 0 } => Duration::from_millis(ZERO_BPM_OFF_MS),
            Self::Beep { bpm } => {
                Duration::from_millis((60_000 / u64::from(bpm)).saturating_sub(BEEP_ON_MS))
            }
        }
    }
}

/// Pattern for the current inputs.
pub fn alert_pattern(inputs: &AlertInputs) -> AlertPattern {
    let d = inputs.min_distance;
    let yellow = f32::from(inputs.thresh_yellow);
    let red = f32::from(inputs.thresh_red);

    if inputs.muted || d > yellow {
        AlertPattern::Silent
    } else if d <= red {
        AlertPattern::Continuous
    } else {
        AlertPattern::Beep {
            bpm: beep_rate(d, yellow, red, inputs.bpm_min, inputs.bpm_max),
        }
    }
}

/// Linear rate between `bpm_min` at `yellow` and `bpm_max` at `red`.
pub fn beep_rate(distance: f32, yellow: f32, red: f32, bpm_min: u16, bpm_max: u16) -> u16 {
    let (lo, hi) = (bpm_min.min(bpm_max), bpm_min.max(bpm_max));
    let span = yellow - red;
    if span <= 0.0 {
        return bpm_max;
    }
    let t = (yellow - distance) / span;
    let bpm = f32::from(bpm_min) + t * (f32::from(bpm_max) - f32::from(bpm_min));
    (bpm.round().clamp(f32::from(lo), f32::from(hi))) as u16
}

/// Map volume percent onto `0..=max_duty`.
#[inline]
pub fn volume_to_duty(volume: u8, max_duty: u32) -> u32 {
    u32::from(volume.min(100)) * max_duty / 100
}
