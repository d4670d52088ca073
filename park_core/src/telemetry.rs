//! Periodic distance snapshots for the dashboard.

use park_common::consts::LOCK_TIMEOUT_NORMAL;
use park_common::link::TelemetrySink;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, trace};

use crate::state::shared::StateManager;
use crate::state::signals::SignalBus;

pub struct TelemetryBroadcaster {
    sink: Arc<dyn TelemetrySink>,
    state: Arc<StateManager>,
    bus: Arc<SignalBus>,
    interval: Duration,
}

impl TelemetryBroadcaster {
    pub fn new(sink: Arc<dyn TelemetrySink>, state: Arc<StateManager>, bus: Arc<SignalBus>, interval: Duration) -> Self {
        Self {
            sink,
            state,
            bus,
            interval,
        }
    }

    /// Publish one snapshot if anyone is listening. Returns `true` if sent.
    pub fn tick(&self) -> bool {
        if self.sink.client_count() == 0 {
            return false;
        }
        match self.state.telemetry(LOCK_TIMEOUT_NORMAL) {
            Ok(snapshot) => {
                self.sink.publish(&snapshot);
                true
            }
            Err(e) => {
                trace!("Telemetry tick skipped: {e}");
                false
            }
        }
    }

    pub fn run(&self) {
        info!("Telemetry broadcaster started (every {:?})", self.interval);
        while self.bus.sleep(self.interval) {
            self.tick();
        }
        info!("Telemetry broadcaster stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use park_common::settings::Settings;
    use park_hal::sim::LogTelemetrySink;

    #[test]
    fn test_tick_requires_clients() {
        let sink = Arc::new(LogTelemetrySink::new());
        let state = Arc::new(StateManager::new(Settings::default()));
        state.set_muted(true, LOCK_TIMEOUT_NORMAL).unwrap();
        let b = TelemetryBroadcaster::new(sink.clone(), state, Arc::new(SignalBus::new()), Duration::from_millis(100));

        assert!(!b.tick());
        assert_eq!(sink.published(), 0);

        sink.set_clients(1);
        assert!(b.tick());
        let snap = sink.last().unwrap();
        assert!(snap.muted);
        assert_eq!(snap.sensors, [400.0; 3]);
    }
}
