//! Shared state and signal bus.
//!
//! Every task talks to the others only through these two objects.

pub mod shared;
pub mod signals;
