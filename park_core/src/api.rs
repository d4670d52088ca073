//! Control API for the web-facing layer.
//!
//! Cheap to clone. Every call is bounded: state access uses the slow lock
//! tier, and the snapshot path waits at most the camera-ready timeout plus the
//! caller's frame timeout.

use park_common::consts::{LOCK_TIMEOUT_SLOW, NUM_SENSORS};
use park_common::settings::Settings;
use parking_lot::Mutex;
use static_assertions::assert_impl_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::camera::frame::FrameBuffer;
use crate::camera::manager::{CameraState, CameraStateCell};
use crate::camera::pipeline;
use crate::camera::queue::FrameSlot;
use crate::error::CoreError;
use crate::state::shared::{CoreStatus, StateManager};
use crate::state::signals::{Signal, SignalBus};

#[derive(Clone)]
pub struct ControlApi {
    state: Arc<StateManager>,
    bus: Arc<SignalBus>,
    queue: Arc<FrameSlot<FrameBuffer>>,
    camera_state: Arc<CameraStateCell>,
    /// Held across the `STREAM_REQUESTED` update so count and flag agree.
    stream_clients: Arc<Mutex<usize>>,
    ready_timeout: Duration,
}

assert_impl_all!(ControlApi: Send, Sync, Clone);

impl ControlApi {
    pub(crate) fn new(
        state: Arc<StateManager>,
        bus: Arc<SignalBus>,
        queue: Arc<FrameSlot<FrameBuffer>>,
        camera_state: Arc<CameraStateCell>,
        ready_timeout: Duration,
    ) -> Self {
        Self {
            state,
            bus,
            queue,
            camera_state,
            stream_clients: Arc::new(Mutex::new(0)),
            ready_timeout,
        }
    }

    // ─── Streaming ──────────────────────────────────────────────────

    /// A stream client connected.
    ///
    /// Raises `STREAM_REQUESTED` on every call, so a request dropped by a
    /// failed camera init is renewed by the next client. Returns the client
    /// count.
    pub fn request_stream(&self) -> usize {
        let mut clients = self.stream_clients.lock();
        *clients += 1;
        if self.bus.set(Signal::StreamRequested) {
            info!("Stream requested ({} client(s))", *clients);
        }
        *clients
    }

    /// A stream client disconnected. The last one clears `STREAM_REQUESTED`.
    pub fn release_stream(&self) -> usize {
        let mut clients = self.stream_clients.lock();
        *clients = clients.saturating_sub(1);
        if *clients == 0 && self.bus.clear(Signal::StreamRequested) {
            info!("Last stream client left");
        }
        *clients
    }

    pub fn stream_clients(&self) -> usize {
        *self.stream_clients.lock()
    }

    pub fn camera_ready(&self) -> bool {
        self.bus.is_set(Signal::CameraReady)
    }

    pub fn camera_state(&self) -> CameraState {
        self.camera_state.load()
    }

    /// Next frame from the pipeline, ahead of the stream.
    ///
    /// The handle returns the buffer to the driver when dropped.
    pub fn snapshot(&self, timeout: Duration) -> Result<FrameBuffer, CoreError> {
        pipeline::snapshot(&self.bus, &self.queue, self.ready_timeout, timeout)
    }

    // ─── State ──────────────────────────────────────────────────────

    pub fn distances(&self) -> Result<[f32; NUM_SENSORS], CoreError> {
        self.state.distances(LOCK_TIMEOUT_SLOW)
    }

    pub fn status(&self) -> Result<CoreStatus, CoreError> {
        self.state.status(LOCK_TIMEOUT_SLOW)
    }

    pub fn subsystem_active(&self) -> bool {
        self.bus.is_set(Signal::SubsystemActive)
    }

    pub fn manual_override(&self) -> Result<bool, CoreError> {
        self.state.manual_override(LOCK_TIMEOUT_SLOW)
    }

    pub fn set_manual_override(&self, value: bool) -> Result<(), CoreError> {
        debug!("Manual override -> {value}");
        self.state.set_manual_override(value, LOCK_TIMEOUT_SLOW)
    }

    pub fn muted(&self) -> Result<bool, CoreError> {
        self.state.muted(LOCK_TIMEOUT_SLOW)
    }

    pub fn set_muted(&self, value: bool) -> Result<(), CoreError> {
        debug!("Muted -> {value}");
        self.state.set_muted(value, LOCK_TIMEOUT_SLOW)
    }

    // ─── Settings ───────────────────────────────────────────────────

    pub fn settings(&self) -> Result<Settings, CoreError> {
        self.state.settings(LOCK_TIMEOUT_SLOW)
    }

    /// Validate, store, and schedule a save.
    ///
    /// # Errors
    /// `CoreError::Settings` if validation fails; nothing is changed.
    pub fn update_settings(&self, settings: Settings) -> Result<(), CoreError> {
        settings.validate()?;
        self.state.set_settings(settings, LOCK_TIMEOUT_SLOW)?;
        self.bus.set(Signal::SettingsSaveRequested);
        info!("Settings updated");
        Ok(())
    }

    /// Restore defaults and schedule a save.
    pub fn reset_settings(&self) -> Result<(), CoreError> {
        self.state.set_settings(Settings::default(), LOCK_TIMEOUT_SLOW)?;
        self.bus.set(Signal::SettingsSaveRequested);
        info!("Settings reset to defaults");
        Ok(())
    }
}
