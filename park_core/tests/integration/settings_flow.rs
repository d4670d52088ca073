//! Integration test: boot settings, persistence and telemetry.

use park_common::prelude::Settings;
use park_hal::sim::MemoryStore;
use std::time::Duration;

use super::harness::{Rig, fast_config, wait_until};

const SECOND: Duration = Duration::from_secs(1);

#[test]
fn test_empty_store_gets_defaults_written() {
    let rig = Rig::start();
    assert!(wait_until(SECOND, || rig.store.saves() == 1));
    assert_eq!(rig.store.record(), Some(Settings::default()));
    assert_eq!(rig.api().settings().unwrap(), Settings::default());
    rig.core.shutdown();
}

#[test]
fn test_saved_settings_survive_boot() {
    let mut saved = Settings::default();
    saved.audio.volume = 40;
    saved.proximity.auto_start = false;
    let rig = Rig::start_with(fast_config(), MemoryStore::with_record(saved.clone()));

    assert_eq!(rig.api().settings().unwrap(), saved);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(rig.store.saves(), 0);
    rig.core.shutdown();
}

#[test]
fn test_corrupt_store_falls_back_to_defaults() {
    let store = MemoryStore::new();
    store.set_corrupt(true);
    let rig = Rig::start_with(fast_config(), store);
    assert_eq!(rig.api().settings().unwrap(), Settings::default());
    rig.core.shutdown();
}

#[test]
fn test_update_is_persisted() {
    let rig = Rig::start();
    assert!(wait_until(SECOND, || rig.store.saves() == 1));

    let mut s = Settings::default();
    s.audio.tone_hz = 2400;
    rig.api().update_settings(s.clone()).unwrap();
    assert!(wait_until(SECOND, || rig.store.record() == Some(s.clone())));

    rig.api().reset_settings().unwrap();
    assert!(wait_until(SECOND, || rig.store.record() == Some(Settings::default())));
    rig.core.shutdown();
}

#[test]
fn test_telemetry_only_with_clients() {
    let rig = Rig::start();
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(rig.telemetry.published(), 0);

    rig.telemetry.set_clients(2);
    assert!(wait_until(SECOND, || rig.telemetry.published() >= 3));
    let snap = rig.telemetry.last().unwrap();
    assert!(!snap.active);
    assert_eq!(snap.sensors, [400.0; 3]);
    rig.core.shutdown();
}
