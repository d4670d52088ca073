//! Common re-exports: `use park_common::prelude::*;`

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, UnitConfig};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{MAX_RANGE_CM, NUM_SENSORS, SMOOTH_LEN};

// ─── Hardware ───────────────────────────────────────────────────────
pub use crate::hal::board::{Board, SensorChannel};
pub use crate::hal::camera::{CameraConfig, CameraDriver, RawFrame};
pub use crate::hal::driver::{EchoEdge, EchoPin, HalError, InputPin, OutputPin, ToneOutput};

// ─── Collaborators ──────────────────────────────────────────────────
pub use crate::link::{FrameTransport, SensorSnapshot, SettingsStore, StoreError, TelemetrySink};

// ─── Settings ───────────────────────────────────────────────────────
pub use crate::settings::{Resolution, Settings, SettingsError};
