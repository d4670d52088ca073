//! Parking-Assist Common Library
//!
//! Shared constants, settings, hardware traits and configuration loading for
//! all crates in the parking-assist workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Sensor geometry, timing defaults and lock tiers
//! - [`settings`] - Persisted user settings and their validation
//! - [`hal`] - Hardware abstraction traits (pins, buzzer, camera, board)
//! - [`link`] - Collaborator interfaces (frame transport, telemetry, settings store)
//! - [`config`] - Configuration loading traits and the unit configuration
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use park_common::consts::NUM_SENSORS;
//! use park_common::settings::Settings;
//!
//! let settings = Settings::default();
//! assert!(settings.validate().is_ok());
//! assert_eq!(NUM_SENSORS, 3);
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod link;
pub mod prelude;
pub mod settings;
