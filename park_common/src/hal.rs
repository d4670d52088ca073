//! Hardware abstraction layer traits.
//!
//! The core never touches registers directly; a board support crate
//! implements these traits and hands the result to the runtime as a
//! [`board::Board`].

pub mod board;
pub mod camera;
pub mod driver;
