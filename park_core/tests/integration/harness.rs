//! Shared rig: fast timing, simulation board, running core.

use park_common::prelude::*;
use park_core::{ControlApi, ParkAssist, RuntimeHandle};
use park_hal::sim::{LogTelemetrySink, MemoryStore, SimTransport};
use park_hal::{SimBoard, SimProbes};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const GRACE: Duration = Duration::from_millis(400);

/// Default config with every loop tightened for test speed.
pub fn fast_config() -> UnitConfig {
    let mut config = UnitConfig::default();
    let t = &mut config.timing;
    t.echo_timeout_ms = 20;
    t.sensor_settle_ms = 1;
    t.sweep_interval_ms = 5;
    t.activation_poll_ms = 5;
    t.grace_period_ms = GRACE.as_millis() as u64;
    t.camera_init_cooldown_ms = 50;
    t.camera_ready_timeout_ms = 150;
    t.frame_retry_delay_ms = 2;
    t.audio_idle_delay_ms = 5;
    t.telemetry_interval_ms = 10;
    config
}

pub struct Rig {
    pub core: RuntimeHandle,
    pub probes: SimProbes,
    pub transport: Arc<SimTransport>,
    pub telemetry: Arc<LogTelemetrySink>,
    pub store: MemoryStore,
}

impl Rig {
    pub fn start() -> Self {
        Self::start_with(fast_config(), MemoryStore::new())
    }

    pub fn start_with(config: UnitConfig, store: MemoryStore) -> Self {
        let SimBoard { board, probes } =
            SimBoard::with_frame_interval(&config.hardware, Duration::from_millis(5));
        let transport = Arc::new(SimTransport::new());
        let telemetry = Arc::new(LogTelemetrySink::new());
        let core = ParkAssist::new(
            config,
            board,
            Box::new(store.clone()),
            transport.clone(),
            telemetry.clone(),
        )
        .start()
        .unwrap();
        Self {
            core,
            probes,
            transport,
            telemetry,
            store,
        }
    }

    pub fn api(&self) -> &ControlApi {
        self.core.api()
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}
