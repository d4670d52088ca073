//! Camera lifecycle: Idle → Initializing → Ready → Deinitializing → Idle.
//!
//! Driven entirely by the level of `STREAM_REQUESTED`:
//!
//! | From | Event | To |
//! |------|-------|----|
//! | Idle | `StreamRequested` | Initializing |
//! | Initializing | `InitSucceeded` | Ready |
//! | Initializing | `InitFailed` | Idle (after cooldown, flag cleared) |
//! | Initializing | `StreamReleased` | Deinitializing (request withdrawn during init) |
//! | Ready | `StreamReleased` | Deinitializing |
//! | Deinitializing | `DeinitComplete` | Idle |
//!
//! Deinitializing clears `CAMERA_READY`, drains the frame queue while the
//! driver is still live, releases the driver, then clears
//! `camera_initialized`.

use park_common::consts::LOCK_TIMEOUT_SLOW;
use park_common::hal::camera::CameraConfig;
use park_common::settings::CameraSettings;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::frame::{CameraResource, FrameBuffer};
use super::queue::FrameSlot;
use crate::error::CoreError;
use crate::state::shared::StateManager;
use crate::state::signals::{Signal, SignalBus, WaitOutcome};

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CameraState {
    #[default]
    Idle = 0,
    Initializing = 1,
    Ready = 2,
    Deinitializing = 3,
}

impl CameraState {
    const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Initializing,
            2 => Self::Ready,
            3 => Self::Deinitializing,
            _ => Self::Idle,
        }
    }
}

/// Lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraEvent {
    StreamRequested,
    InitSucceeded,
    InitFailed,
    StreamReleased,
    DeinitComplete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    Ok(CameraState),
    Rejected(&'static str),
}

/// Transition table only; no side effects.
#[derive(Debug, Clone, Default)]
pub struct CameraStateMachine {
    state: CameraState,
}

impl CameraStateMachine {
    pub const fn new() -> Self {
        Self {
            state: CameraState::Idle,
        }
    }

    #[inline]
    pub const fn state(&self) -> CameraState {
        self.state
    }

    pub fn handle_event(&mut self, event: CameraEvent) -> TransitionResult {
        use CameraEvent::*;
        use CameraState::*;

        let next = match (self.state, event) {
            (Idle, StreamRequested) => Initializing,
            (Initializing, InitSucceeded) => Ready,
            (Initializing, InitFailed) => Idle,
            (Initializing, StreamReleased) => Deinitializing,
            (Ready, StreamReleased) => Deinitializing,
            (Deinitializing, DeinitComplete) => Idle,
            (_, StreamRequested) => return TransitionResult::Rejected("camera already active"),
            _ => return TransitionResult::Rejected("event not valid in current state"),
        };
        self.state = next;
        TransitionResult::Ok(next)
    }
}

/// Lock-free view of the manager's state for the Control API.
#[derive(Debug, Default)]
pub struct CameraStateCell(AtomicU8);

impl CameraStateCell {
    pub fn load(&self) -> CameraState {
        CameraState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn store(&self, state: CameraState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

pub struct CameraManager {
    fsm: CameraStateMachine,
    cell: Arc<CameraStateCell>,
    camera: Arc<CameraResource>,
    queue: Arc<FrameSlot<FrameBuffer>>,
    state: Arc<StateManager>,
    bus: Arc<SignalBus>,
    cooldown: Duration,
    /// Used when the state lock is busy at init time.
    last_settings: CameraSettings,
    consecutive_failures: u32,
}

impl CameraManager {
    pub fn new(
        camera: Arc<CameraResource>,
        queue: Arc<FrameSlot<FrameBuffer>>,
        cell: Arc<CameraStateCell>,
        state: Arc<StateManager>,
        bus: Arc<SignalBus>,
        cooldown: Duration,
    ) -> Self {
        Self {
            fsm: CameraStateMachine::new(),
            cell,
            camera,
            queue,
            state,
            bus,
            cooldown,
            last_settings: CameraSettings::default(),
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> CameraState {
        self.fsm.state()
    }

    fn fire(&mut self, event: CameraEvent) {
        let from = self.fsm.state();
        match self.fsm.handle_event(event) {
            TransitionResult::Ok(to) => {
                self.cell.store(to);
                debug!("Camera {:?} --{:?}--> {:?}", from, event, to);
            }
            TransitionResult::Rejected(reason) => {
                warn!("Camera event {:?} rejected in {:?}: {}", event, from, reason);
            }
        }
    }

    /// Manager loop. Returns on shutdown with the driver released.
    pub fn run(&mut self) {
        info!("Camera manager started (cooldown {:?})", self.cooldown);
        loop {
            if self.bus.wait_set(Signal::StreamRequested, None) == WaitOutcome::Shutdown {
                break;
            }
            self.fire(CameraEvent::StreamRequested);
            self.serve_request();
            if self.bus.is_shutdown() {
                break;
            }
        }
        if self.camera.is_initialized() {
            self.tear_down();
        }
        info!("Camera manager stopped");
    }

    /// Handle one request from Initializing back to Idle.
    fn serve_request(&mut self) {
        let settings = match self.state.camera_settings(LOCK_TIMEOUT_SLOW) {
            Ok(settings) => {
                self.last_settings = settings;
                settings
            }
            Err(e) => {
                warn!("Using previous camera settings: {e}");
                self.last_settings
            }
        };

        if let Err(e) = self.camera.init(&CameraConfig::from(&settings)) {
            self.consecutive_failures += 1;
            error!(
                "Camera init failed ({} consecutive): {e}; retry after {:?}",
                self.consecutive_failures, self.cooldown
            );
            self.bus.clear(Signal::StreamRequested);
            self.bus.sleep(self.cooldown);
            self.fire(CameraEvent::InitFailed);
            return;
        }
        self.consecutive_failures = 0;
        self.publish_initialized(true);

        if !self.bus.is_set(Signal::StreamRequested) || self.bus.is_shutdown() {
            info!("Stream request withdrawn during camera init");
        } else {
            self.bus.set(Signal::CameraReady);
            self.fire(CameraEvent::InitSucceeded);
            // Ready until the last subscriber leaves or shutdown.
            self.bus.wait_clear(Signal::StreamRequested, None);
        }

        self.fire(CameraEvent::StreamReleased);
        self.tear_down();
        self.fire(CameraEvent::DeinitComplete);
    }

    fn tear_down(&mut self) {
        self.bus.clear(Signal::CameraReady);
        // Returned to the still-live driver.
        drop(self.queue.drain());

        loop {
            match self.camera.deinit() {
                Ok(()) => break,
                Err(CoreError::LockTimeout { .. }) => warn!("Camera busy, retrying deinit"),
                Err(e) => {
                    warn!("Camera deinit reported: {e}");
                    break;
                }
            }
        }

        // Anything pushed during deinit belongs to the ended session.
        drop(self.queue.drain());
        self.publish_initialized(false);
    }

    fn publish_initialized(&self, value: bool) {
        while let Err(e) = self.state.set_camera_initialized(value, LOCK_TIMEOUT_SLOW) {
            warn!("Could not publish camera_initialized={value}: {e}");
            if self.bus.is_shutdown() {
                break;
            }
        }
    }
}
