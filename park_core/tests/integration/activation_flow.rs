//! Integration test: reverse gear → ranging → buzzer → grace → idle.

use park_common::consts::MAX_RANGE_CM;
use std::time::Duration;

use super::harness::{GRACE, Rig, wait_until};

const SECOND: Duration = Duration::from_secs(1);

#[test]
fn test_reverse_drives_full_cycle() {
    let rig = Rig::start();
    let api = rig.api();
    rig.probes
        .obstacles
        .set_all([Some(120.0), Some(30.0), Some(150.0)]);

    assert!(!api.subsystem_active());
    assert!(!rig.probes.sensor_power.is_high());

    rig.probes.reverse.set_engaged(true);
    assert!(wait_until(SECOND, || api.subsystem_active()));
    assert!(rig.probes.sensor_power.is_high());

    // Stable obstacles: the smoothed value equals the raw one.
    assert!(wait_until(SECOND, || {
        api.distances()
            .is_ok_and(|d| (d[1] - 30.0).abs() < 0.5 && (d[0] - 120.0).abs() < 0.5)
    }));
    assert!(wait_until(SECOND, || rig.probes.buzzer.state().on_count > 0));
    assert_eq!(rig.probes.buzzer.state().frequency_hz, 1760);
    assert!(api.status().unwrap().subsystem_active);

    rig.probes.reverse.set_engaged(false);
    std::thread::sleep(GRACE / 4);
    assert!(api.subsystem_active(), "grace window keeps the subsystem on");

    assert!(wait_until(GRACE * 4, || !api.subsystem_active()));
    assert!(!rig.probes.sensor_power.is_high());
    assert!(wait_until(SECOND, || !rig.probes.buzzer.is_sounding()));

    rig.core.shutdown();
}

#[test]
fn test_no_obstacle_reads_max_range_and_stays_quiet() {
    let rig = Rig::start();
    let api = rig.api();
    rig.probes.reverse.set_engaged(true);

    assert!(wait_until(SECOND, || api.subsystem_active()));
    assert!(wait_until(SECOND, || {
        api.distances().is_ok_and(|d| d == [MAX_RANGE_CM; 3])
    }));
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(rig.probes.buzzer.state().on_count, 0);

    rig.core.shutdown();
}

#[test]
fn test_manual_override_without_reverse() {
    let rig = Rig::start();
    let api = rig.api();

    api.set_manual_override(true).unwrap();
    assert!(wait_until(SECOND, || api.subsystem_active()));

    // Reverse was never engaged, so there is no grace to wait out.
    api.set_manual_override(false).unwrap();
    assert!(wait_until(GRACE / 2, || !api.subsystem_active()));

    rig.core.shutdown();
}

#[test]
fn test_mute_silences_close_obstacle() {
    let rig = Rig::start();
    let api = rig.api();
    api.set_muted(true).unwrap();
    rig.probes
        .obstacles
        .set_all([Some(20.0), Some(20.0), Some(20.0)]);
    rig.probes.reverse.set_engaged(true);

    assert!(wait_until(SECOND, || {
        api.distances().is_ok_and(|d| d[1] < 25.0)
    }));
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(rig.probes.buzzer.state().on_count, 0);

    api.set_muted(false).unwrap();
    assert!(wait_until(SECOND, || rig.probes.buzzer.state().on_count > 0));

    rig.core.shutdown();
}

#[test]
fn test_shutdown_powers_down_sensors() {
    let rig = Rig::start();
    rig.probes.reverse.set_engaged(true);
    assert!(wait_until(SECOND, || rig.probes.sensor_power.is_high()));

    let probes = rig.probes.clone();
    rig.core.shutdown();
    assert!(!probes.sensor_power.is_high());
    assert!(!probes.buzzer.is_sounding());
}
