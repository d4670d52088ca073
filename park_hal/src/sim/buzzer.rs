//! Piezo buzzer on a PWM channel.

use park_common::hal::driver::{HalError, ToneOutput};
use parking_lot::Mutex;
use std::sync::Arc;

/// Observable buzzer state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuzzerState {
    /// Last programmed carrier frequency [Hz].
    pub frequency_hz: u32,
    /// Current duty value; `0` = silent.
    pub duty: u32,
    /// Number of silent → sounding transitions.
    pub on_count: u32,
}

/// Read side of a [`SimBuzzer`].
#[derive(Debug, Clone, Default)]
pub struct BuzzerProbe(Arc<Mutex<BuzzerState>>);

impl BuzzerProbe {
    /// Copy of the current state.
    pub fn state(&self) -> BuzzerState {
        *self.0.lock()
    }

    /// True while the duty is non-zero.
    pub fn is_sounding(&self) -> bool {
        self.0.lock().duty > 0
    }
}

/// Simulated LEDC channel.
pub struct SimBuzzer {
    state: Arc<Mutex<BuzzerState>>,
    max_duty: u32,
}

impl SimBuzzer {
    /// Channel with `pwm_bits` of duty resolution. Full loudness is a 50%
    /// square wave, i.e. half the counter range.
    pub fn new(pwm_bits: u8) -> (Self, BuzzerProbe) {
        let bits = u32::from(pwm_bits.clamp(1, 16));
        let state = Arc::new(Mutex::new(BuzzerState::default()));
        (
            Self {
                state: Arc::clone(&state),
                max_duty: 1 << (bits - 1),
            },
            BuzzerProbe(state),
        )
    }
}

impl ToneOutput for SimBuzzer {
    fn set_frequency(&mut self, hz: u32) -> Result<(), HalError> {
        if hz == 0 {
            return Err(HalError::ConfigError("tone frequency must be non-zero".into()));
        }
        self.state.lock().frequency_hz = hz;
        Ok(())
    }

    fn set_duty(&mut self, duty: u32) {
        let mut state = self.state.lock();
        let duty = duty.min(self.max_duty);
        if state.duty == 0 && duty > 0 {
            state.on_count += 1;
        }
        state.duty = duty;
    }

    fn max_duty(&self) -> u32 {
        self.max_duty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_bit_channel_full_duty_is_128() {
        let (buzzer, _) = SimBuzzer::new(8);
        assert_eq!(buzzer.max_duty(), 128);
    }

    #[test]
    fn on_count_tracks_rising_duty() {
        let (mut buzzer, probe) = SimBuzzer::new(8);
        buzzer.set_duty(64);
        buzzer.set_duty(64);
        buzzer.set_duty(0);
        buzzer.set_duty(500);
        let state = probe.state();
        assert_eq!(state.on_count, 2);
        assert_eq!(state.duty, 128);
    }

    #[test]
    fn zero_frequency_rejected() {
        let (mut buzzer, probe) = SimBuzzer::new(8);
        assert!(buzzer.set_frequency(0).is_err());
        buzzer.set_frequency(1760).unwrap();
        assert_eq!(probe.state().frequency_hz, 1760);
    }
}
