//! Integration tests for the parking-assist core.
//!
//! Each test starts the full runtime on a simulation board with shortened
//! timing and observes it through the Control API and the board probes.

mod integration;
