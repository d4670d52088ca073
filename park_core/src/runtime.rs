//! Startup, task placement and orderly shutdown.
//!
//! ## Startup Sequence
//! 1. Load boot settings from the store (defaults + save on failure).
//! 2. Build shared state, signal bus, camera resource and frame slot.
//! 3. Construct every engine on the calling thread, so hardware errors
//!    surface before any thread exists.
//! 4. Spawn one named thread per task; each pins itself per [`TaskLayout`].
//!
//! ## Placement
//! With the `rt` feature each thread sets its CPU affinity and
//! `SCHED_FIFO` priority. Without it both steps are no-ops and the layout is
//! only logged. A placement failure is a warning, never fatal.
//!
//! ## Shutdown
//! Raise `SHUTDOWN` on the bus, close the frame slot, join every thread, then
//! drop any frame still parked in the slot.

use park_common::config::{TaskLayout, TaskPlacement, UnitConfig};
use park_common::consts::LOCK_TIMEOUT_SLOW;
use park_common::hal::board::Board;
use park_common::link::{FrameTransport, SettingsStore, TelemetrySink};
use static_assertions::assert_impl_all;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::activation::ActivationManager;
use crate::api::ControlApi;
use crate::audio::engine::AudioEngine;
use crate::camera::frame::{CameraResource, FrameBuffer};
use crate::camera::manager::{CameraManager, CameraStateCell};
use crate::camera::pipeline::{FrameConsumer, FrameProducer};
use crate::camera::queue::FrameSlot;
use crate::error::CoreError;
use crate::persistence::{PersistenceWorker, load_boot_settings};
use crate::ranging::engine::{RangingEngine, RangingTiming};
use crate::state::shared::StateManager;
use crate::state::signals::{Signal, SignalBus};
use crate::telemetry::TelemetryBroadcaster;

// ─── Thread Placement ───────────────────────────────────────────────

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), String> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| format!("CpuSet::set({cpu}) failed: {e}"))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| format!("sched_setaffinity failed: {e}"))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), String> {
    Ok(()) // No-op in simulation mode
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), String> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: pid 0 targets the calling thread; `param` outlives the call.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(format!("sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), String> {
    Ok(()) // No-op in simulation mode
}

/// Apply `placement` to the calling thread. Failures are logged.
pub fn pin_current_thread(task: &str, placement: TaskPlacement) {
    if let Err(e) = rt_set_affinity(placement.core) {
        warn!("{task}: {e}; running unpinned");
    }
    if let Err(e) = rt_set_scheduler(placement.priority) {
        warn!("{task}: {e}; running at default priority");
    }
    debug!(
        "{task} thread on core {} at priority {}",
        placement.core, placement.priority
    );
}

struct TaskSet {
    threads: Vec<(&'static str, JoinHandle<()>)>,
}

impl TaskSet {
    fn new() -> Self {
        Self {
            threads: Vec::with_capacity(8),
        }
    }

    fn spawn<F>(&mut self, name: &'static str, placement: TaskPlacement, body: F) -> Result<(), CoreError>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                pin_current_thread(name, placement);
                body();
            })
            .map_err(|e| CoreError::Spawn {
                name,
                reason: e.to_string(),
            })?;
        self.threads.push((name, handle));
        Ok(())
    }

    fn join_all(&mut self) {
        for (name, handle) in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!("{name} thread panicked");
            }
        }
    }
}

// ─── Runtime ────────────────────────────────────────────────────────

/// Everything the core needs before it can start.
pub struct ParkAssist {
    config: UnitConfig,
    board: Board,
    store: Box<dyn SettingsStore>,
    transport: Arc<dyn FrameTransport>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl ParkAssist {
    pub fn new(
        config: UnitConfig,
        board: Board,
        store: Box<dyn SettingsStore>,
        transport: Arc<dyn FrameTransport>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            config,
            board,
            store,
            transport,
            telemetry,
        }
    }

    /// Build every engine and start the task threads.
    ///
    /// # Errors
    /// `CoreError::Hal` if a peripheral cannot be set up, `CoreError::Spawn`
    /// if a thread cannot be started. Threads already running are stopped
    /// before the error is returned.
    pub fn start(self) -> Result<RuntimeHandle, CoreError> {
        let Self {
            config,
            board,
            mut store,
            transport,
            telemetry,
        } = self;
        let timing = config.timing;
        let hw = config.hardware;

        let (settings, needs_save) = load_boot_settings(store.as_mut());
        let state = Arc::new(StateManager::new(settings));
        let bus = Arc::new(SignalBus::new());
        if needs_save {
            bus.set(Signal::SettingsSaveRequested);
        }

        let camera = CameraResource::new(board.camera, timing.camera_lock_timeout(), LOCK_TIMEOUT_SLOW);
        let queue: Arc<FrameSlot<FrameBuffer>> = Arc::new(FrameSlot::new());
        let camera_cell = Arc::new(CameraStateCell::default());

        let mut ranging = RangingEngine::new(
            board.sensors,
            RangingTiming::from(&timing),
            Arc::clone(&state),
            Arc::clone(&bus),
        )?;
        let mut activation = ActivationManager::new(
            board.reverse_sense,
            hw.reverse_active_low,
            board.sensor_power,
            timing.grace_period(),
            timing.activation_poll(),
            Arc::clone(&state),
            Arc::clone(&bus),
        );
        let mut audio = AudioEngine::new(
            board.buzzer,
            Arc::clone(&state),
            Arc::clone(&bus),
            timing.audio_idle_delay(),
        );
        let mut camera_manager = CameraManager::new(
            Arc::clone(&camera),
            Arc::clone(&queue),
            Arc::clone(&camera_cell),
            Arc::clone(&state),
            Arc::clone(&bus),
            timing.camera_init_cooldown(),
        );
        let mut producer = FrameProducer::new(
            Arc::clone(&camera),
            Arc::clone(&queue),
            Arc::clone(&bus),
            timing.frame_retry_delay(),
        );
        let mut consumer = FrameConsumer::new(Arc::clone(&queue), transport);
        let mut persistence = PersistenceWorker::new(
            store,
            Arc::clone(&state),
            Arc::clone(&bus),
            timing.activation_poll(),
        );
        let broadcaster = TelemetryBroadcaster::new(
            telemetry,
            Arc::clone(&state),
            Arc::clone(&bus),
            timing.telemetry_interval(),
        );

        let api = ControlApi::new(
            Arc::clone(&state),
            Arc::clone(&bus),
            Arc::clone(&queue),
            Arc::clone(&camera_cell),
            timing.camera_ready_timeout(),
        );

        let mut handle = RuntimeHandle {
            api,
            bus,
            queue,
            camera,
            tasks: TaskSet::new(),
        };

        let layout: TaskLayout = config.tasks;
        let spawned = (|| {
            let tasks = &mut handle.tasks;
            tasks.spawn("activation", layout.activation, move || activation.run())?;
            tasks.spawn("ranging", layout.ranging, move || ranging.run())?;
            tasks.spawn("audio", layout.audio, move || audio.run())?;
            tasks.spawn("camera-manager", layout.camera_manager, move || camera_manager.run())?;
            tasks.spawn("frame-producer", layout.frame_producer, move || producer.run())?;
            tasks.spawn("frame-consumer", layout.frame_consumer, move || consumer.run())?;
            tasks.spawn("settings-persist", layout.persistence, move || persistence.run())?;
            tasks.spawn("telemetry", layout.telemetry, move || broadcaster.run())
        })();

        if let Err(e) = spawned {
            handle.stop();
            return Err(e);
        }

        info!(
            "{} running ({} tasks, rt={})",
            config.shared.service_name,
            handle.tasks.threads.len(),
            cfg!(feature = "rt")
        );
        Ok(handle)
    }
}

/// A running core.
pub struct RuntimeHandle {
    api: ControlApi,
    bus: Arc<SignalBus>,
    queue: Arc<FrameSlot<FrameBuffer>>,
    camera: Arc<CameraResource>,
    tasks: TaskSet,
}

assert_impl_all!(RuntimeHandle: Send);
assert_impl_all!(FrameBuffer: Send, Sync);

impl RuntimeHandle {
    pub fn api(&self) -> &ControlApi {
        &self.api
    }

    fn stop(&mut self) {
        self.bus.shutdown();
        self.queue.close();
        self.tasks.join_all();
        drop(self.queue.drain());
    }

    /// Stop every task and release the camera.
    pub fn shutdown(mut self) {
        info!("Shutting down");
        self.stop();
        info!(
            "Shutdown complete (camera initialized: {}, {} frames released, {} discarded)",
            self.camera.is_initialized(),
            self.camera.released(),
            self.camera.discarded()
        );
    }
}

impl Drop for RuntimeHandle {
    fn drop(&mut self) {
        if !self.tasks.threads.is_empty() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "rt"))]
    #[test]
    fn test_placement_is_noop_without_rt() {
        assert!(rt_set_affinity(7).is_ok());
        assert!(rt_set_scheduler(99).is_ok());
        pin_current_thread("test", TaskPlacement::new(1, 50));
    }

    #[test]
    fn test_task_set_joins_all() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let count = Arc::new(AtomicUsize::new(0));
        let mut tasks = TaskSet::new();
        for name in ["a", "b", "c"] {
            let c = Arc::clone(&count);
            tasks
                .spawn(name, TaskPlacement::new(0, 1), move || {
                    c.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        tasks.join_all();
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(tasks.threads.is_empty());
    }
}
