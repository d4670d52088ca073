//! Buzzer loop.

use park_common::consts::LOCK_TIMEOUT_FAST;
use park_common::hal::driver::ToneOutput;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::pattern::{AlertPattern, alert_pattern, volume_to_duty};
use crate::state::shared::StateManager;
use crate::state::signals::{Signal, SignalBus, WaitOutcome};

pub struct AudioEngine {
    buzzer: Box<dyn ToneOutput>,
    state: Arc<StateManager>,
    bus: Arc<SignalBus>,
    idle_delay: Duration,
    tone_hz: Option<u32>,
    last_pattern: AlertPattern,
}

impl AudioEngine {
    pub fn new(
        mut buzzer: Box<dyn ToneOutput>,
        state: Arc<StateManager>,
        bus: Arc<SignalBus>,
        idle_delay: Duration,
    ) -> Self {
        buzzer.set_duty(0);
        Self {
            buzzer,
            state,
            bus,
            idle_delay,
            tone_hz: None,
            last_pattern: AlertPattern::Silent,
        }
    }

    fn silence(&mut self) {
        self.buzzer.set_duty(0);
    }

    /// Wait while the subsystem stays active. `false` once it is not.
    fn hold(&self, duration: Duration) -> bool {
        self.bus.wait_clear(Signal::SubsystemActive, Some(duration)) == WaitOutcome::TimedOut
    }

    /// One pattern period. Returns `false` when the subsystem went inactive
    /// (or shutdown was raised) during it.
    pub fn cycle(&mut self) -> bool {
        // A busy lock counts as silent for this period.
        let inputs = self.state.alert_inputs(LOCK_TIMEOUT_FAST).ok();
        let pattern = inputs.as_ref().map_or(AlertPattern::Silent, alert_pattern);

        if pattern != self.last_pattern {
            debug!("Alert pattern {:?}", pattern);
            self.last_pattern = pattern;
        }

        let Some(inputs) = inputs.filter(|_| pattern != AlertPattern::Silent) else {
            self.silence();
            return self.hold(self.idle_delay);
        };

        if self.tone_hz != Some(inputs.tone_hz) {
            match self.buzzer.set_frequency(inputs.tone_hz) {
                Ok(()) => self.tone_hz = Some(inputs.tone_hz),
                Err(e) => warn!("Buzzer frequency {}Hz rejected: {e}", inputs.tone_hz),
            }
        }

        let duty = volume_to_duty(inputs.volume, self.buzzer.max_duty());
        self.buzzer.set_duty(duty);
        let still_active = self.hold(pattern.on_time());
        self.silence();
        if !still_active {
            return false;
        }

        let off = pattern.off_time();
        off.is_zero() || self.hold(off)
    }

    /// Engine loop. Returns on shutdown with the buzzer silent.
    pub fn run(&mut self) {
        info!("Audio engine started (idle delay {:?})", self.idle_delay);
        loop {
            if self.bus.wait_set(Signal::SubsystemActive, None) == WaitOutcome::Shutdown {
                break;
            }
            while self.cycle() {}
            self.silence();
            self.last_pattern = AlertPattern::Silent;
        }
        self.silence();
        info!("Audio engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use park_common::consts::LOCK_TIMEOUT_NORMAL;
    use park_common::settings::Settings;
    use park_hal::sim::{BuzzerProbe, SimBuzzer};

    fn engine() -> (AudioEngine, BuzzerProbe, Arc<StateManager>, Arc<SignalBus>) {
        let (buzzer, probe) = SimBuzzer::new(8);
        let state = Arc::new(StateManager::new(Settings::default()));
        let bus = Arc::new(SignalBus::new());
        let engine = AudioEngine::new(
            Box::new(buzzer),
            Arc::clone(&state),
            Arc::clone(&bus),
            Duration::from_millis(5),
        );
        (engine, probe, state, bus)
    }

    #[test]
    fn test_far_obstacle_stays_silent() {
        let (mut engine, probe, _, bus) = engine();
        bus.set(Signal::SubsystemActive);
        assert!(engine.cycle());
        assert_eq!(probe.state().on_count, 0);
    }

    #[test]
    fn test_inactive_ends_cycle_and_silences() {
        let (mut engine, probe, state, _) = engine();
        state.set_distances([20.0, 300.0, 300.0], LOCK_TIMEOUT_NORMAL).unwrap();
        // Flag clear: the on-phase ends immediately.
        assert!(!engine.cycle());
        let s = probe.state();
        assert_eq!(s.on_count, 1);
        assert_eq!(s.duty, 0);
        assert_eq!(s.frequency_hz, 1760);
    }

    #[test]
    fn test_volume_sets_duty() {
        let (mut engine, probe, state, bus) = engine();
        let mut settings = Settings::default();
        settings.audio.volume = 50;
        state.set_settings(settings, LOCK_TIMEOUT_NORMAL).unwrap();
        state.set_distances([20.0, 20.0, 20.0], LOCK_TIMEOUT_NORMAL).unwrap();
        bus.set(Signal::SubsystemActive);

        let handle = std::thread::spawn(move || {
            engine.cycle();
            engine
        });
        std::thread::sleep(Duration::from_millis(200));
        // Mid continuous tone.
        assert_eq!(probe.state().duty, 64);
        bus.clear(Signal::SubsystemActive);
        handle.join().unwrap();
        assert_eq!(probe.state().duty, 0);
    }
}
