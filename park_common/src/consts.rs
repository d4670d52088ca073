//! System-wide constants.
//!
//! Timing values here are the defaults for [`crate::config::TimingConfig`];
//! deployments may override them in the `[timing]` section of the unit config.

use static_assertions::const_assert;
use static_assertions::const_assert_eq;
use std::time::Duration;

// ─── Sensor Array ───────────────────────────────────────────────────

/// Number of ultrasonic sensors (left, center, right).
pub const NUM_SENSORS: usize = 3;

/// Human-readable sensor positions, indexed like the distance array.
pub const SENSOR_NAMES: [&str; NUM_SENSORS] = ["left", "center", "right"];

/// Maximum reportable distance [cm]. Also substituted on echo timeout.
pub const MAX_RANGE_CM: f32 = 400.0;

/// Echo round-trip time per centimetre [µs/cm] at room temperature.
pub const ECHO_US_PER_CM: f32 = 58.0;

/// Length of the per-sensor smoothing ring.
pub const SMOOTH_LEN: usize = 6;

/// Low hold before the trigger pulse [µs].
pub const TRIGGER_LOW_US: u64 = 2;

/// Trigger pulse width [µs].
pub const TRIGGER_PULSE_US: u64 = 10;

const_assert_eq!(NUM_SENSORS, 3);
const_assert_eq!(SENSOR_NAMES.len(), NUM_SENSORS);
const_assert_eq!(SMOOTH_LEN, 6);

// ─── Ranging Timing ─────────────────────────────────────────────────

/// Maximum wait for an echo before assuming "no obstacle" [ms].
pub const ECHO_TIMEOUT_MS: u64 = 50;

/// Poll interval while waiting for an echo [ms].
pub const ECHO_POLL_MS: u64 = 1;

/// Pause between sensors to avoid cross-talk [ms].
pub const SENSOR_SETTLE_MS: u64 = 30;

/// Pause between full sweeps [ms].
pub const SWEEP_INTERVAL_MS: u64 = 50;

const_assert!(ECHO_POLL_MS <= ECHO_TIMEOUT_MS);

// ─── Activation ─────────────────────────────────────────────────────

/// Reverse-gear poll interval [ms].
pub const ACTIVATION_POLL_MS: u64 = 50;

/// Hysteresis window after reverse gear disengages [ms].
pub const GRACE_PERIOD_MS: u64 = 15_000;

// ─── Camera ─────────────────────────────────────────────────────────

/// Cooldown after a failed camera init [ms].
pub const CAMERA_INIT_COOLDOWN_MS: u64 = 1_500;

/// Upper bound on waiting for the camera to become ready [ms].
pub const CAMERA_READY_TIMEOUT_MS: u64 = 2_000;

/// Producer back-off when the driver yields no frame [ms].
pub const FRAME_RETRY_DELAY_MS: u64 = 10;

/// Bounded wait for the camera lock on the capture path [ms].
pub const CAMERA_LOCK_TIMEOUT_MS: u64 = 100;

/// Number of driver frame buffers.
pub const CAMERA_FB_COUNT: usize = 2;

// ─── Audio ──────────────────────────────────────────────────────────

/// Idle delay while silent (muted or nothing in range) [ms].
pub const AUDIO_IDLE_DELAY_MS: u64 = 100;

/// Beep on-time in the interpolated band [ms].
pub const BEEP_ON_MS: u64 = 100;

/// On-time of the continuous tone inside the red zone [ms].
pub const CONTINUOUS_ON_MS: u64 = 1_000;

/// Off-time used when the interpolated rate is zero [ms].
pub const ZERO_BPM_OFF_MS: u64 = 500;

// ─── Telemetry ──────────────────────────────────────────────────────

/// Sensor snapshot broadcast interval [ms].
pub const TELEMETRY_INTERVAL_MS: u64 = 100;

// ─── Shared-State Lock Tiers ────────────────────────────────────────

/// Lock budget for the audio loop.
pub const LOCK_TIMEOUT_FAST: Duration = Duration::from_millis(50);

/// Lock budget for routine periodic tasks.
pub const LOCK_TIMEOUT_NORMAL: Duration = Duration::from_millis(100);

/// Lock budget for settings and API calls.
pub const LOCK_TIMEOUT_SLOW: Duration = Duration::from_millis(1_000);
