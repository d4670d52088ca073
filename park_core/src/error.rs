//! Core error type.
//!
//! Steady-state loops never return these to the top: a lock timeout skips a
//! cycle, a driver failure goes through cooldown. They surface through the
//! Control API and during startup.

use park_common::hal::driver::HalError;
use park_common::settings::SettingsError;
use thiserror::Error;

/// Errors reported by the core.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Bounded lock acquisition gave up.
    #[error("timed out acquiring {what} lock")]
    LockTimeout {
        /// Which lock (`"state"`, `"camera"`).
        what: &'static str,
    },

    /// Camera not ready to serve frames.
    #[error("camera not ready")]
    NotReady,

    /// A bounded wait elapsed without the awaited event.
    #[error("timed out waiting for {0}")]
    TimedOut(&'static str),

    /// Orderly shutdown in progress.
    #[error("core is shutting down")]
    Shutdown,

    /// Settings rejected by validation.
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),

    /// Peripheral failure.
    #[error("hardware error: {0}")]
    Hal(#[from] HalError),

    /// Thread could not be started.
    #[error("failed to spawn {name} thread: {reason}")]
    Spawn {
        /// Thread name.
        name: &'static str,
        /// OS error text.
        reason: String,
    },
}
