//! # Parking-Assist Core
//!
//! Real-time core of a rear parking-assistance unit: three ultrasonic
//! sensors, a reverse-gear input, a piezo buzzer and an on-demand camera.
//!
//! ## Tasks
//!
//! | Thread             | Module          | Wakes on                     |
//! |--------------------|-----------------|------------------------------|
//! | `activation`       | [`activation`]  | poll interval                |
//! | `ranging`          | [`ranging`]     | `SUBSYSTEM_ACTIVE`           |
//! | `audio`            | [`audio`]       | `SUBSYSTEM_ACTIVE`           |
//! | `camera-manager`   | [`camera`]      | `STREAM_REQUESTED`           |
//! | `frame-producer`   | [`camera`]      | `CAMERA_READY`               |
//! | `frame-consumer`   | [`camera`]      | frame slot                   |
//! | `settings-persist` | [`persistence`] | `SETTINGS_SAVE_REQUESTED`    |
//! | `telemetry`        | [`telemetry`]   | broadcast interval           |
//!
//! All tasks share one [`state::shared::StateManager`] (bounded-wait lock)
//! and one [`state::signals::SignalBus`]. No task ever blocks on a lock
//! without a timeout, except the frame return path.
//!
//! ## Entry Points
//!
//! - [`runtime::ParkAssist`] - Build and start the core from a board bundle
//! - [`api::ControlApi`] - What the web layer calls

pub mod activation;
pub mod api;
pub mod audio;
pub mod camera;
pub mod error;
pub mod persistence;
pub mod ranging;
pub mod runtime;
pub mod state;
pub mod telemetry;

pub use api::ControlApi;
pub use error::CoreError;
pub use runtime::{ParkAssist, RuntimeHandle};
