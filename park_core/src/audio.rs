//! Audio feedback.
//!
//! - [`pattern`] - Distance → alert pattern and volume → duty mapping
//! - [`engine`] - Buzzer loop gated on `SUBSYSTEM_ACTIVE`

pub mod engine;
pub mod pattern;
