//! Settings persistence worker.
//!
//! Services `SETTINGS_SAVE_REQUESTED` off the real-time threads: clear the
//! flag, snapshot the settings under the slow lock tier, then hand the copy to
//! the store with no lock held. A store failure is logged and the in-memory
//! settings stay authoritative.

use park_common::consts::LOCK_TIMEOUT_SLOW;
use park_common::link::SettingsStore;
use park_common::settings::Settings;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::state::shared::StateManager;
use crate::state::signals::{Signal, SignalBus, WaitOutcome};

/// Settings to boot with, and whether they must be written back.
pub fn load_boot_settings(store: &mut dyn SettingsStore) -> (Settings, bool) {
    match store.load() {
        Ok(Some(settings)) => match settings.validate() {
            Ok(()) => {
                info!("Loaded saved settings");
                (settings, false)
            }
            Err(e) => {
                warn!("Saved settings invalid ({e}); using defaults");
                (Settings::default(), true)
            }
        },
        Ok(None) => {
            info!("No saved settings; using defaults");
            (Settings::default(), true)
        }
        Err(e) => {
            warn!("Settings store unreadable ({e}); using defaults");
            (Settings::default(), true)
        }
    }
}

pub struct PersistenceWorker {
    store: Box<dyn SettingsStore>,
    state: Arc<StateManager>,
    bus: Arc<SignalBus>,
    backoff: Duration,
    saved: u64,
    failed: u64,
}

impl PersistenceWorker {
    pub fn new(store: Box<dyn SettingsStore>, state: Arc<StateManager>, bus: Arc<SignalBus>, backoff: Duration) -> Self {
        Self {
            store,
            state,
            bus,
            backoff,
            saved: 0,
            failed: 0,
        }
    }

    /// Service one request. Returns `true` if the store accepted the write.
    pub fn service(&mut self) -> bool {
        self.bus.clear(Signal::SettingsSaveRequested);

        let settings = match self.state.settings(LOCK_TIMEOUT_SLOW) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Settings snapshot failed ({e}); retrying");
                self.bus.set(Signal::SettingsSaveRequested);
                self.bus.sleep(self.backoff);
                return false;
            }
        };

        match self.store.save(&settings) {
            Ok(()) => {
                self.saved += 1;
                info!("Settings saved");
                true
            }
            Err(e) => {
                self.failed += 1;
                error!("Settings save failed: {e}");
                false
            }
        }
    }

    pub fn run(&mut self) {
        info!("Settings persistence started");
        while self.bus.wait_set(Signal::SettingsSaveRequested, None) == WaitOutcome::Ready {
            self.service();
        }
        // Flush a request raised just before shutdown.
        if self.bus.is_set(Signal::SettingsSaveRequested) {
            self.service();
        }
        info!(
            "Settings persistence stopped ({} saved, {} failed)",
            self.saved, self.failed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use park_common::consts::LOCK_TIMEOUT_NORMAL;
    use park_hal::sim::MemoryStore;

    #[test]
    fn test_boot_with_empty_store_requests_save() {
        let mut store = MemoryStore::new();
        let (settings, save) = load_boot_settings(&mut store);
        assert_eq!(settings, Settings::default());
        assert!(save);
    }

    #[test]
    fn test_boot_with_saved_settings() {
        let mut saved = Settings::default();
        saved.audio.tone_hz = 2000;
        let mut store = MemoryStore::with_record(saved.clone());
        assert_eq!(load_boot_settings(&mut store), (saved, false));
    }

    #[test]
    fn test_boot_rejects_invalid_record() {
        let mut bad = Settings::default();
        bad.proximity.thresh_red = 300;
        let mut store = MemoryStore::with_record(bad);
        let (settings, save) = load_boot_settings(&mut store);
        assert_eq!(settings, Settings::default());
        assert!(save);
    }

    #[test]
    fn test_service_clears_flag_and_saves_snapshot() {
        let store = MemoryStore::new();
        let state = Arc::new(StateManager::new(Settings::default()));
        let bus = Arc::new(SignalBus::new());
        let mut worker = PersistenceWorker::new(
            Box::new(store.clone()),
            Arc::clone(&state),
            Arc::clone(&bus),
            Duration::from_millis(10),
        );

        let mut settings = Settings::default();
        settings.audio.volume = 30;
        state.set_settings(settings, LOCK_TIMEOUT_NORMAL).unwrap();
        bus.set(Signal::SettingsSaveRequested);

        assert!(worker.service());
        assert!(!bus.is_set(Signal::SettingsSaveRequested));
        assert_eq!(store.record().map(|s| s.audio.volume), Some(30));
    }

    #[test]
    fn test_store_failure_is_not_fatal() {
        let store = MemoryStore::new();
        store.set_fail_saves(true);
        let state = Arc::new(StateManager::new(Settings::default()));
        let bus = Arc::new(SignalBus::new());
        let mut worker = PersistenceWorker::new(Box::new(store.clone()), state, Arc::clone(&bus), Duration::ZERO);
        assert!(!worker.service());
        store.set_fail_saves(false);
        assert!(worker.service());
        assert_eq!(store.saves(), 1);
    }
}
