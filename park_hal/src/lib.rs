//! # Parking-Assist HAL
//!
//! Software implementations of every hardware trait in
//! `park_common::hal` and every collaborator trait in `park_common::link`.
//! The core binary runs on them without hardware, and the integration tests
//! use the probes to observe what the core did.
//!
//! # Module Structure
//!
//! - [`sim`] - Simulated peripherals, collaborators and the [`sim::SimBoard`] bundle
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        SimBoard                              │
//! │  ┌────────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │ ObstacleField  │─►│ SimTrigger ×3│─►│ EdgeHandler (ISR)│  │
//! │  └────────────────┘  └──────────────┘  └──────────────────┘  │
//! │  ┌────────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │ ReverseLever   │  │ SimBuzzer    │  │ SimCamera (pool) │  │
//! │  └────────────────┘  └──────────────┘  └──────────────────┘  │
//! │                  probes ◄── tests / binary                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod sim;

pub use crate::sim::{SimBoard, SimProbes};
