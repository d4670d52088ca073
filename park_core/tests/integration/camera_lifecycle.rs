//! Integration test: on-demand camera init/deinit.

use park_core::camera::manager::CameraState;
use std::time::Duration;

use super::harness::{Rig, wait_until};

const SECOND: Duration = Duration::from_secs(1);

#[test]
fn test_request_and_release() {
    let rig = Rig::start();
    let api = rig.api();
    let cam = &rig.probes.camera;

    assert_eq!(api.camera_state(), CameraState::Idle);
    assert_eq!(cam.init_calls(), 0);

    api.request_stream();
    assert!(wait_until(SECOND, || api.camera_state() == CameraState::Ready));
    assert!(api.camera_ready());
    assert!(cam.is_initialized());
    assert!(api.status().unwrap().camera_initialized);
    assert!(wait_until(SECOND, || cam.captures() > 3));

    api.release_stream();
    assert!(wait_until(SECOND, || api.camera_state() == CameraState::Idle));
    assert!(!api.camera_ready());
    assert!(!cam.is_initialized());
    assert_eq!(cam.deinit_calls(), 1);
    assert_eq!(cam.outstanding(), 0);
    assert_eq!(cam.invalid_releases(), 0);
    assert!(wait_until(SECOND, || !api.status().unwrap().camera_initialized));

    rig.core.shutdown();
}

#[test]
fn test_release_during_init_leaves_nothing_held() {
    let rig = Rig::start();
    let api = rig.api();
    let cam = &rig.probes.camera;
    cam.set_init_delay(Duration::from_millis(150));

    api.request_stream();
    assert!(wait_until(SECOND, || cam.init_calls() == 1));
    api.release_stream();

    assert!(wait_until(SECOND, || cam.deinit_calls() == 1));
    assert!(wait_until(SECOND, || api.camera_state() == CameraState::Idle));
    assert!(!api.camera_ready());
    assert!(!cam.is_initialized());
    assert_eq!(cam.captures(), 0);

    // A later request starts a clean session.
    cam.set_init_delay(Duration::ZERO);
    api.request_stream();
    assert!(wait_until(SECOND, || api.camera_ready()));
    assert!(wait_until(SECOND, || cam.captures() > 0));
    assert_eq!(cam.init_calls(), 2);

    api.release_stream();
    assert!(wait_until(SECOND, || api.camera_state() == CameraState::Idle));
    assert_eq!(cam.invalid_releases(), 0);

    rig.core.shutdown();
}

#[test]
fn test_init_failure_drops_request_until_renewed() {
    let rig = Rig::start();
    let api = rig.api();
    let cam = &rig.probes.camera;
    cam.fail_next_inits(1);

    api.request_stream();
    assert!(wait_until(SECOND, || cam.init_calls() == 1));
    assert!(wait_until(SECOND, || api.camera_state() == CameraState::Idle));
    assert!(!api.camera_ready());
    assert!(!cam.is_initialized());

    // No retry on its own.
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(cam.init_calls(), 1);

    // A new client renews the request.
    api.request_stream();
    assert!(wait_until(SECOND, || api.camera_ready()));
    assert_eq!(cam.init_calls(), 2);

    api.release_stream();
    api.release_stream();
    assert!(wait_until(SECOND, || api.camera_state() == CameraState::Idle));

    rig.core.shutdown();
}

#[test]
fn test_shutdown_while_streaming_releases_camera() {
    let rig = Rig::start();
    rig.transport.set_subscribers(1);
    rig.api().request_stream();
    assert!(wait_until(SECOND, || rig.api().camera_ready()));
    assert!(wait_until(SECOND, || rig.transport.frames_sent() > 0));

    let cam = rig.probes.camera.clone();
    rig.core.shutdown();
    assert!(!cam.is_initialized());
    assert_eq!(cam.invalid_releases(), 0);
}
