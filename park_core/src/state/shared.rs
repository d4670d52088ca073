//! Canonical shared state behind one bounded lock.
//!
//! Nothing outside [`StateManager`] sees the raw struct. Every accessor takes
//! a lock timeout; a timeout is reported as [`CoreError::LockTimeout`] and the
//! caller skips its cycle.
//!
//! Field ownership:
//! - ranging engine: `distances`
//! - camera manager: `camera_initialized`
//! - activation manager: `subsystem_active`
//! - Control API: `settings`, `manual_override`, `muted`

use park_common::consts::{MAX_RANGE_CM, NUM_SENSORS};
use park_common::link::SensorSnapshot;
use park_common::settings::{CameraSettings, Settings};
use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;

use crate::error::CoreError;

#[derive(Debug)]
struct SharedState {
    settings: Settings,
    distances: [f32; NUM_SENSORS],
    camera_initialized: bool,
    subsystem_active: bool,
    manual_override: bool,
    muted: bool,
}

/// Copy of every shared field except settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoreStatus {
    pub distances: [f32; NUM_SENSORS],
    pub camera_initialized: bool,
    pub subsystem_active: bool,
    pub manual_override: bool,
    pub muted: bool,
}

/// Activation manager inputs read in one lock section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationInputs {
    pub auto_start: bool,
    pub manual_override: bool,
}

/// Audio engine inputs read in one lock section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertInputs {
    /// Nearest of the three smoothed distances [cm].
    pub min_distance: f32,
    pub muted: bool,
    /// Percent, 0..=100.
    pub volume: u8,
    pub tone_hz: u32,
    pub thresh_red: u16,
    pub thresh_orange: u16,
    pub thresh_yellow: u16,
    pub bpm_min: u16,
    pub bpm_max: u16,
}

/// Lock-guarded owner of the shared state.
#[derive(Debug)]
pub struct StateManager {
    inner: Mutex<SharedState>,
}

impl StateManager {
    /// Boot state: the given settings, every sensor at maximum range, all
    /// flags clear.
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Mutex::new(SharedState {
                settings,
                distances: [MAX_RANGE_CM; NUM_SENSORS],
                camera_initialized: false,
                subsystem_active: false,
                manual_override: false,
                muted: false,
            }),
        }
    }

    fn read<R>(&self, timeout: Duration, f: impl FnOnce(&SharedState) -> R) -> Result<R, CoreError> {
        let guard = self
            .inner
            .try_lock_for(timeout)
            .ok_or(CoreError::LockTimeout { what: "state" })?;
        Ok(f(&guard))
    }

    fn write<R>(&self, timeout: Duration, f: impl FnOnce(&mut SharedState) -> R) -> Result<R, CoreError> {
        let mut guard = self
            .inner
            .try_lock_for(timeout)
            .ok_or(CoreError::LockTimeout { what: "state" })?;
        Ok(f(&mut guard))
    }

    // ─── Settings ───────────────────────────────────────────────────

    pub fn settings(&self, timeout: Duration) -> Result<Settings, CoreError> {
        self.read(timeout, |s| s.settings.clone())
    }

    /// Replace the settings. Callers validate first.
    pub fn set_settings(&self, settings: Settings, timeout: Duration) -> Result<(), CoreError> {
        self.write(timeout, |s| s.settings = settings)
    }

    pub fn camera_settings(&self, timeout: Duration) -> Result<CameraSettings, CoreError> {
        self.read(timeout, |s| s.settings.camera)
    }

    // ─── Distances ──────────────────────────────────────────────────

    pub fn distances(&self, timeout: Duration) -> Result<[f32; NUM_SENSORS], CoreError> {
        self.read(timeout, |s| s.distances)
    }

    /// Store one sweep's worth of distances. Values are clamped to the sensor
    /// range; NaN reads as maximum range.
    pub fn set_distances(&self, distances: [f32; NUM_SENSORS], timeout: Duration) -> Result<(), CoreError> {
        let clamped = distances.map(clamp_distance);
        self.write(timeout, |s| s.distances = clamped)
    }

    // ─── Flags ──────────────────────────────────────────────────────

    pub fn camera_initialized(&self, timeout: Duration) -> Result<bool, CoreError> {
        self.read(timeout, |s| s.camera_initialized)
    }

    pub fn set_camera_initialized(&self, value: bool, timeout: Duration) -> Result<(), CoreError> {
        self.write(timeout, |s| s.camera_initialized = value)
    }

    pub fn subsystem_active(&self, timeout: Duration) -> Result<bool, CoreError> {
        self.read(timeout, |s| s.subsystem_active)
    }

    pub fn set_subsystem_active(&self, value: bool, timeout: Duration) -> Result<(), CoreError> {
        self.write(timeout, |s| s.subsystem_active = value)
    }

    pub fn manual_override(&self, timeout: Duration) -> Result<bool, CoreError> {
        self.read(timeout, |s| s.manual_override)
    }

    pub fn set_manual_override(&self, value: bool, timeout: Duration) -> Result<(), CoreError> {
        self.write(timeout, |s| s.manual_override = value)
    }

    pub fn muted(&self, timeout: Duration) -> Result<bool, CoreError> {
        self.read(timeout, |s| s.muted)
    }

    pub fn set_muted(&self, value: bool, timeout: Duration) -> Result<(), CoreError> {
        self.write(timeout, |s| s.muted = value)
    }

    // ─── Composite reads ────────────────────────────────────────────

    pub fn activation_inputs(&self, timeout: Duration) -> Result<ActivationInputs, CoreError> {
        self.read(timeout, |s| ActivationInputs {
            auto_start: s.settings.proximity.auto_start,
            manual_override: s.manual_override,
        })
    }

    pub fn alert_inputs(&self, timeout: Duration) -> Result<AlertInputs, CoreError> {
        self.read(timeout, |s| {
            let p = &s.settings.proximity;
            AlertInputs {
                min_distance: s.distances.iter().copied().fold(f32::INFINITY, f32::min),
                muted: s.muted,
                volume: s.settings.audio.volume,
                tone_hz: s.settings.audio.tone_hz,
                thresh_red: p.thresh_red,
                thresh_orange: p.thresh_orange,
                thresh_yellow: p.thresh_yellow,
                bpm_min: p.bpm_min,
                bpm_max: p.bpm_max,
            }
        })
    }

    pub fn status(&self, timeout: Duration) -> Result<CoreStatus, CoreError> {
        self.read(timeout, |s| CoreStatus {
            distances: s.distances,
            camera_initialized: s.camera_initialized,
            subsystem_active: s.subsystem_active,
            manual_override: s.manual_override,
            muted: s.muted,
        })
    }

    pub fn telemetry(&self, timeout: Duration) -> Result<SensorSnapshot, CoreError> {
        self.read(timeout, |s| SensorSnapshot {
            sensors: s.distances,
            active: s.subsystem_active,
            muted: s.muted,
        })
    }
}

/// Clamp to `[0, MAX_RANGE_CM]`; NaN maps to "nothing in range".
#[inline]
pub fn clamp_distance(cm: f32) -> f32 {
    if cm.is_nan() {
        MAX_RANGE_CM
    } else {
        cm.clamp(0.0, MAX_RANGE_CM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use park_common::consts::LOCK_TIMEOUT_NORMAL;
    use std::sync::Arc;
    use std::thread;

    const T: Duration = LOCK_TIMEOUT_NORMAL;

    #[test]
    fn test_boot_state() {
        let state = StateManager::new(Settings::default());
        let status = state.status(T).unwrap();
        assert_eq!(status.distances, [MAX_RANGE_CM; NUM_SENSORS]);
        assert!(!status.subsystem_active);
        assert!(!status.camera_initialized);
    }

    #[test]
    fn test_distances_are_clamped() {
        let state = StateManager::new(Settings::default());
        state.set_distances([-5.0, 1000.0, f32::NAN], T).unwrap();
        assert_eq!(state.distances(T).unwrap(), [0.0, MAX_RANGE_CM, MAX_RANGE_CM]);
    }

    #[test]
    fn test_alert_inputs_pick_nearest() {
        let state = StateManager::new(Settings::default());
        state.set_distances([120.0, 45.5, 300.0], T).unwrap();
        state.set_muted(true, T).unwrap();
        let inputs = state.alert_inputs(T).unwrap();
        assert_eq!(inputs.min_distance, 45.5);
        assert!(inputs.muted);
        assert_eq!(inputs.thresh_red, 50);
        assert_eq!(inputs.tone_hz, 1760);
    }

    #[test]
    fn test_lock_timeout_is_reported() {
        let state = Arc::new(StateManager::new(Settings::default()));
        let holder = Arc::clone(&state);
        let (tx, rx) = std::sync::mpsc::channel();
        let t = thread::spawn(move || {
            holder
                .write(Duration::from_secs(1), |_| {
                    tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(200));
                })
                .unwrap();
        });
        rx.recv().unwrap();
        let err = state.muted(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, CoreError::LockTimeout { what: "state" }));
        t.join().unwrap();
        assert!(state.muted(T).is_ok());
    }

    #[test]
    fn test_activation_inputs() {
        let mut settings = Settings::default();
        settings.proximity.auto_start = false;
        let state = StateManager::new(settings);
        state.set_manual_override(true, T).unwrap();
        assert_eq!(
            state.activation_inputs(T).unwrap(),
            ActivationInputs {
                auto_start: false,
                manual_override: true
            }
        );
    }
}
