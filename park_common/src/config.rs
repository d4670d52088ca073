//! Unit configuration and TOML loading.
//!
//! The unit config describes the board wiring, task layout and loop timing.
//! It is distinct from [`crate::settings::Settings`], which the user edits at
//! runtime through the dashboard.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "parkassist-rear"
//! log_level = "debug"
//!
//! [timing]
//! grace_period_ms = 10000
//!
//! [tasks.audio]
//! core = 1
//! priority = 6
//!
//! [hardware]
//! reverse_active_low = true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::consts::*;

/// Number of CPU cores tasks may be pinned to.
pub const CORE_COUNT: usize = 2;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log verbosity, lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Identification and logging shared by every binary in the workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Unit identifier, appears in logs.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "parkassist".to_string(),
        }
    }
}

impl SharedConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load any deserializable type from a TOML file.
///
/// - `ConfigError::FileNotFound` if the file does not exist
/// - `ConfigError::ParseError` for I/O or TOML syntax errors
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Timing ─────────────────────────────────────────────────────────

/// Loop delays and timeouts [ms]. Defaults come from [`crate::consts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub echo_timeout_ms: u64,
    pub echo_poll_ms: u64,
    pub sensor_settle_ms: u64,
    pub sweep_interval_ms: u64,
    pub activation_poll_ms: u64,
    pub grace_period_ms: u64,
    pub camera_init_cooldown_ms: u64,
    pub camera_ready_timeout_ms: u64,
    pub camera_lock_timeout_ms: u64,
    pub frame_retry_delay_ms: u64,
    pub audio_idle_delay_ms: u64,
    pub telemetry_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            echo_timeout_ms: ECHO_TIMEOUT_MS,
            echo_poll_ms: ECHO_POLL_MS,
            sensor_settle_ms: SENSOR_SETTLE_MS,
            sweep_interval_ms: SWEEP_INTERVAL_MS,
            activation_poll_ms: ACTIVATION_POLL_MS,
            grace_period_ms: GRACE_PERIOD_MS,
            camera_init_cooldown_ms: CAMERA_INIT_COOLDOWN_MS,
            camera_ready_timeout_ms: CAMERA_READY_TIMEOUT_MS,
            camera_lock_timeout_ms: CAMERA_LOCK_TIMEOUT_MS,
            frame_retry_delay_ms: FRAME_RETRY_DELAY_MS,
            audio_idle_delay_ms: AUDIO_IDLE_DELAY_MS,
            telemetry_interval_ms: TELEMETRY_INTERVAL_MS,
        }
    }
}

impl TimingConfig {
    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }

    pub fn echo_poll(&self) -> Duration {
        Duration::from_millis(self.echo_poll_ms)
    }

    pub fn sensor_settle(&self) -> Duration {
        Duration::from_millis(self.sensor_settle_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn activation_poll(&self) -> Duration {
        Duration::from_millis(self.activation_poll_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn camera_init_cooldown(&self) -> Duration {
        Duration::from_millis(self.camera_init_cooldown_ms)
    }

    pub fn camera_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.camera_ready_timeout_ms)
    }

    pub fn camera_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.camera_lock_timeout_ms)
    }

    pub fn frame_retry_delay(&self) -> Duration {
        Duration::from_millis(self.frame_retry_delay_ms)
    }

    pub fn audio_idle_delay(&self) -> Duration {
        Duration::from_millis(self.audio_idle_delay_ms)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms)
    }

    /// Reject zero values where a zero would turn a loop into a busy spin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("echo_timeout_ms", self.echo_timeout_ms),
            ("echo_poll_ms", self.echo_poll_ms),
            ("activation_poll_ms", self.activation_poll_ms),
            ("camera_ready_timeout_ms", self.camera_ready_timeout_ms),
            ("camera_lock_timeout_ms", self.camera_lock_timeout_ms),
            ("frame_retry_delay_ms", self.frame_retry_delay_ms),
            ("audio_idle_delay_ms", self.audio_idle_delay_ms),
            ("telemetry_interval_ms", self.telemetry_interval_ms),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "timing.{name} must be greater than zero"
                )));
            }
        }
        if self.echo_poll_ms > self.echo_timeout_ms {
            return Err(ConfigError::ValidationError(
                "timing.echo_poll_ms exceeds echo_timeout_ms".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Task Layout ────────────────────────────────────────────────────

/// Placement of one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlacement {
    /// CPU core (0 or 1).
    pub core: usize,
    /// `SCHED_FIFO` priority with the `rt` feature; ignored otherwise.
    pub priority: i32,
}

impl TaskPlacement {
    pub const fn new(core: usize, priority: i32) -> Self {
        Self { core, priority }
    }
}

/// Per-thread placement. Sensor-facing loops share core 1; camera,
/// persistence and telemetry share core 0 with the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskLayout {
    pub activation: TaskPlacement,
    pub ranging: TaskPlacement,
    pub audio: TaskPlacement,
    pub camera_manager: TaskPlacement,
    pub frame_producer: TaskPlacement,
    pub frame_consumer: TaskPlacement,
    pub persistence: TaskPlacement,
    pub telemetry: TaskPlacement,
}

impl Default for TaskLayout {
    fn default() -> Self {
        Self {
            activation: TaskPlacement::new(1, 4),
            ranging: TaskPlacement::new(1, 6),
            audio: TaskPlacement::new(1, 5),
            camera_manager: TaskPlacement::new(0, 3),
            frame_producer: TaskPlacement::new(0, 5),
            frame_consumer: TaskPlacement::new(0, 4),
            persistence: TaskPlacement::new(0, 1),
            telemetry: TaskPlacement::new(0, 2),
        }
    }
}

impl TaskLayout {
    fn entries(&self) -> [(&'static str, TaskPlacement); 8] {
        [
            ("activation", self.activation),
            ("ranging", self.ranging),
            ("audio", self.audio),
            ("camera_manager", self.camera_manager),
            ("frame_producer", self.frame_producer),
            ("frame_consumer", self.frame_consumer),
            ("persistence", self.persistence),
            ("telemetry", self.telemetry),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, placement) in self.entries() {
            if placement.core >= CORE_COUNT {
                return Err(ConfigError::ValidationError(format!(
                    "tasks.{name}.core = {} (only {CORE_COUNT} cores)",
                    placement.core
                )));
            }
            if !(1..=99).contains(&placement.priority) {
                return Err(ConfigError::ValidationError(format!(
                    "tasks.{name}.priority = {} outside 1..=99",
                    placement.priority
                )));
            }
        }
        Ok(())
    }
}

// ─── Hardware Wiring ────────────────────────────────────────────────

/// GPIO assignment of one ultrasonic sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorPins {
    pub trig: u8,
    pub echo: u8,
}

/// Board wiring. The simulation board ignores pin numbers but the core
/// honours `reverse_active_low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Left, center, right.
    pub sensors: [SensorPins; NUM_SENSORS],
    pub reverse_pin: u8,
    /// Reverse gear pulls the line low (input with pull-up).
    pub reverse_active_low: bool,
    pub sensor_power_pin: u8,
    pub buzzer_pin: u8,
    /// PWM resolution of the buzzer channel [bits].
    pub buzzer_pwm_bits: u8,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            sensors: [
                SensorPins { trig: 42, echo: 41 },
                SensorPins { trig: 45, echo: 48 },
                SensorPins { trig: 47, echo: 21 },
            ],
            reverse_pin: 1,
            reverse_active_low: true,
            sensor_power_pin: 2,
            buzzer_pin: 14,
            buzzer_pwm_bits: 8,
        }
    }
}

impl HardwareConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        let pins = self
            .sensors
            .iter()
            .flat_map(|s| [s.trig, s.echo])
            .chain([self.reverse_pin, self.sensor_power_pin, self.buzzer_pin]);
        for pin in pins {
            if !seen.insert(pin) {
                return Err(ConfigError::ValidationError(format!(
                    "GPIO {pin} assigned more than once"
                )));
            }
        }
        if !(1..=16).contains(&self.buzzer_pwm_bits) {
            return Err(ConfigError::ValidationError(format!(
                "buzzer_pwm_bits = {} outside 1..=16",
                self.buzzer_pwm_bits
            )));
        }
        Ok(())
    }
}

// ─── Unit Config ────────────────────────────────────────────────────

/// Complete unit configuration (`parkassist.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConfig {
    pub shared: SharedConfig,
    pub timing: TimingConfig,
    pub tasks: TaskLayout,
    pub hardware: HardwareConfig,
}

impl UnitConfig {
    /// Load from `path`, falling back to defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Parse and validation errors are returned; a missing file is not an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let config = match Self::load(path) {
            Ok(cfg) => cfg,
            Err(ConfigError::FileNotFound) => {
                tracing::info!("No unit config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.timing.validate()?;
        self.tasks.validate()?;
        self.hardware.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_validate() {
        let cfg = UnitConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.timing.grace_period(), Duration::from_millis(15_000));
        assert_eq!(cfg.timing.echo_timeout(), Duration::from_millis(50));
        assert!(cfg.hardware.reverse_active_low);
    }

    #[test]
    fn test_log_level_roundtrip_in_table() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Wrapper {
            level: LogLevel,
        }
        let text = toml::to_string(&Wrapper {
            level: LogLevel::Warn,
        })
        .unwrap();
        assert!(text.contains("warn"));
        let back: Wrapper = toml::from_str("level = \"trace\"").unwrap();
        assert_eq!(back.level, LogLevel::Trace);
        assert_eq!(LogLevel::Debug.as_directive(), "debug");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let cfg = UnitConfig::load_or_default(Path::new("/nonexistent/parkassist.toml")).unwrap();
        assert_eq!(cfg.shared.service_name, "parkassist");
    }

    #[test]
    fn test_parse_error_reported() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[timing\ngrace_period_ms = ").unwrap();
        let result = UnitConfig::load_or_default(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_partial_file_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[shared]
service_name = "rear-unit"
log_level = "debug"

[timing]
grace_period_ms = 5000

[tasks.audio]
core = 0
priority = 9
"#
        )
        .unwrap();
        file.flush().unwrap();

        let cfg = UnitConfig::load_or_default(file.path()).unwrap();
        assert_eq!(cfg.shared.service_name, "rear-unit");
        assert_eq!(cfg.shared.log_level, LogLevel::Debug);
        assert_eq!(cfg.timing.grace_period_ms, 5000);
        assert_eq!(cfg.timing.sweep_interval_ms, SWEEP_INTERVAL_MS);
        assert_eq!(cfg.tasks.audio, TaskPlacement::new(0, 9));
        assert_eq!(cfg.tasks.ranging, TaskLayout::default().ranging);
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/parkassist.toml");
        let cfg = UnitConfig::load_or_default(&path).unwrap();
        assert_eq!(cfg.shared.service_name, "parkassist-rear");
        assert_eq!(cfg.hardware, HardwareConfig::default());
        assert_eq!(cfg.timing, TimingConfig::default());
    }

    #[test]
    fn test_core_out_of_range_rejected() {
        let mut cfg = UnitConfig::default();
        cfg.tasks.frame_producer.core = 2;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("frame_producer")
        ));
    }

    #[test]
    fn test_duplicate_pin_rejected() {
        let mut cfg = UnitConfig::default();
        cfg.hardware.buzzer_pin = cfg.hardware.sensors[1].echo;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("GPIO 48")
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut cfg = UnitConfig::default();
        cfg.timing.echo_timeout_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_service_name_rejected() {
        let shared = SharedConfig {
            log_level: LogLevel::Info,
            service_name: String::new(),
        };
        assert!(matches!(
            shared.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
