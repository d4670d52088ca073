//! Pin and tone-output traits plus the HAL error type.
//!
//! This module defines:
//! - `HalError` enum - Error types for HAL operations
//! - `OutputPin` / `InputPin` - Plain digital I/O
//! - `EchoPin` - Interrupt-capable input delivering timestamped edges
//! - `ToneOutput` - PWM channel driving the buzzer

use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Peripheral initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Operation requires an initialized peripheral
    #[error("Peripheral not initialized: {0}")]
    NotInitialized(&'static str),
}

/// Echo edge direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Rising,
    Falling,
}

/// One timestamped echo-pin transition, produced in interrupt context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoEdge {
    pub kind: EdgeKind,
    /// Monotonic timestamp [µs].
    pub timestamp_us: u64,
}

impl EchoEdge {
    /// Rising edge at `timestamp_us`.
    pub const fn rising(timestamp_us: u64) -> Self {
        Self {
            kind: EdgeKind::Rising,
            timestamp_us,
        }
    }

    /// Falling edge at `timestamp_us`.
    pub const fn falling(timestamp_us: u64) -> Self {
        Self {
            kind: EdgeKind::Falling,
            timestamp_us,
        }
    }
}

/// Edge callback. Runs in interrupt context: it must not block or allocate.
pub type EdgeHandler = Box<dyn Fn(EchoEdge) + Send + Sync + 'static>;

/// Push-pull digital output.
pub trait OutputPin: Send {
    /// Drive the pin high (`true`) or low (`false`).
    fn set_level(&mut self, high: bool);
}

/// Digital input sampled on demand.
pub trait InputPin: Send {
    /// Current electrical level.
    fn is_high(&self) -> bool;
}

/// Interrupt-capable input that reports both edges.
pub trait EchoPin: Send {
    /// Install the edge handler. Replaces any previous handler.
    ///
    /// # Errors
    /// Returns `HalError::InitFailed` if the interrupt cannot be attached.
    fn attach(&mut self, handler: EdgeHandler) -> Result<(), HalError>;
}

/// PWM channel driving a piezo buzzer.
pub trait ToneOutput: Send {
    /// Change the carrier frequency [Hz].
    fn set_frequency(&mut self, hz: u32) -> Result<(), HalError>;

    /// Set the duty value; `0` silences the output.
    fn set_duty(&mut self, duty: u32);

    /// Duty value corresponding to full loudness.
    fn max_duty(&self) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hal_error_display() {
        let err = HalError::InitFailed("sccb timeout".to_string());
        assert!(err.to_string().contains("sccb timeout"));

        let err = HalError::NotInitialized("camera");
        assert!(err.to_string().contains("camera"));
    }

    #[test]
    fn test_hal_error_variants() {
        // Exhaustive over every variant.
        let label = |e: &HalError| match e {
            HalError::InitFailed(_) => "init",
            HalError::ConfigError(_) => "config",
            HalError::NotInitialized(_) => "uninit",
        };
        assert_eq!(label(&HalError::ConfigError("fb_count".into())), "config");
        assert_eq!(label(&HalError::NotInitialized("buzzer")), "uninit");
    }

    #[test]
    fn test_edge_constructors() {
        assert_eq!(EchoEdge::rising(5).kind, EdgeKind::Rising);
        assert_eq!(EchoEdge::falling(9).timestamp_us, 9);
    }
}
