//! Ultrasonic ranging.
//!
//! - [`echo`] - Interrupt-shared edge capture cell
//! - [`smoothing`] - Per-sensor moving-average ring
//! - [`engine`] - Trigger/measure/smooth sweep loop

pub mod echo;
pub mod engine;
pub mod smoothing;

use park_common::consts::ECHO_US_PER_CM;

use crate::state::shared::clamp_distance;

/// Convert an echo pulse width [µs] to a clamped distance [cm].
#[inline]
pub fn duration_to_cm(duration_us: u64) -> f32 {
    clamp_distance(duration_us as f32 / ECHO_US_PER_CM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use park_common::consts::MAX_RANGE_CM;
    use proptest::prelude::*;

    #[test]
    fn test_duration_to_cm_reference_points() {
        assert_eq!(duration_to_cm(0), 0.0);
        assert!((duration_to_cm(200) - 3.448).abs() < 1e-3);
        assert!((duration_to_cm(5800) - 100.0).abs() < 1e-4);
        assert_eq!(duration_to_cm(1_000_000), MAX_RANGE_CM);
    }

    proptest! {
        #[test]
        fn prop_duration_to_cm_is_clamped_quotient(d in 0u64..200_000) {
            let expected = (d as f32 / 58.0).clamp(0.0, 400.0);
            let got = duration_to_cm(d);
            prop_assert!((got - expected).abs() <= f32::EPSILON * expected.max(1.0));
            prop_assert!((0.0..=400.0).contains(&got));
        }
    }
}
