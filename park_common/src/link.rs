//! Collaborator interfaces.
//!
//! The core talks to the web layer, the video transport and the settings
//! store only through these traits. Wire formats and storage schemas belong
//! to the implementors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::NUM_SENSORS;
use crate::settings::Settings;

/// Video transport (e.g. a binary WebSocket endpoint).
pub trait FrameTransport: Send + Sync {
    /// Number of clients currently subscribed to the stream.
    fn subscriber_count(&self) -> usize;

    /// True if every subscriber can accept another frame without queueing.
    fn is_writable(&self) -> bool;

    /// Send one encoded frame to all subscribers.
    fn broadcast_binary(&self, data: &[u8]);
}

/// Periodic distance snapshot for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Smoothed distances [cm], left/center/right.
    pub sensors: [f32; NUM_SENSORS],
    pub active: bool,
    pub muted: bool,
}

/// Dashboard telemetry channel.
pub trait TelemetrySink: Send + Sync {
    /// Number of connected dashboard clients.
    fn client_count(&self) -> usize;

    /// Publish one snapshot to all clients.
    fn publish(&self, snapshot: &SensorSnapshot);
}

/// Settings store failures.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Backing medium could not be read or written.
    #[error("settings storage I/O failed: {0}")]
    Io(String),

    /// Stored record could not be decoded.
    #[error("stored settings are corrupt: {0}")]
    Corrupt(String),
}

/// Persistence collaborator. Called only from the persistence worker, never
/// from a real-time loop.
pub trait SettingsStore: Send {
    /// Load the saved record, `Ok(None)` if nothing has been saved yet.
    fn load(&mut self) -> Result<Option<Settings>, StoreError>;

    /// Persist the record.
    fn save(&mut self, settings: &Settings) -> Result<(), StoreError>;
}
