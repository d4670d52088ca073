//! Integration test: producer → single slot → consumer / snapshot.
//!
//! Every buffer the driver hands out must go back exactly once, whether it
//! was streamed, dropped for lack of subscribers, or overwritten in the slot.

use park_core::CoreError;
use park_core::camera::manager::CameraState;
use std::time::Duration;

use super::harness::{Rig, wait_until};

const SECOND: Duration = Duration::from_secs(1);

fn stop_stream(rig: &Rig) {
    rig.api().release_stream();
    assert!(wait_until(SECOND, || rig.api().camera_state() == CameraState::Idle));
}

#[test]
fn test_frames_returned_without_subscribers() {
    let rig = Rig::start();
    let cam = rig.probes.camera.clone();
    rig.api().request_stream();

    assert!(wait_until(SECOND * 2, || cam.captures() >= 20));
    // The pool never starves: frames keep coming.
    let seen = cam.captures();
    assert!(wait_until(SECOND, || cam.captures() > seen + 5));
    assert!(cam.outstanding() <= 2);
    assert_eq!(rig.transport.frames_sent(), 0);

    stop_stream(&rig);
    assert_eq!(cam.outstanding(), 0);
    assert_eq!(cam.invalid_releases(), 0);

    rig.core.shutdown();
}

#[test]
fn test_frames_streamed_to_subscriber() {
    let rig = Rig::start();
    rig.transport.set_subscribers(1);
    rig.api().request_stream();

    assert!(wait_until(SECOND * 2, || rig.transport.frames_sent() >= 10));
    assert!(rig.transport.bytes_sent() > 0);

    stop_stream(&rig);
    assert_eq!(rig.probes.camera.invalid_releases(), 0);
    rig.core.shutdown();
}

#[test]
fn test_congested_transport_drops_frames() {
    let rig = Rig::start();
    rig.transport.set_subscribers(1);
    rig.transport.set_writable(false);
    rig.api().request_stream();

    let cam = rig.probes.camera.clone();
    assert!(wait_until(SECOND * 2, || cam.captures() >= 10));
    assert_eq!(rig.transport.frames_sent(), 0);
    assert!(cam.releases() > 0);

    stop_stream(&rig);
    assert_eq!(cam.invalid_releases(), 0);
    rig.core.shutdown();
}

#[test]
fn test_snapshot_returns_jpeg() {
    let rig = Rig::start();
    rig.api().request_stream();

    let frame = rig.api().snapshot(SECOND).unwrap();
    assert!(frame.len() > 4);
    assert_eq!(&frame.data()[..2], &[0xFF, 0xD8]);
    assert_eq!(&frame.data()[frame.len() - 2..], &[0xFF, 0xD9]);
    assert_eq!((frame.width(), frame.height()), (1024, 768));
    drop(frame);

    stop_stream(&rig);
    assert_eq!(rig.probes.camera.invalid_releases(), 0);
    rig.core.shutdown();
}

#[test]
fn test_snapshot_without_stream_is_not_ready() {
    let rig = Rig::start();
    // camera_ready_timeout is 150 ms in the fast config.
    let result = rig.api().snapshot(SECOND);
    assert!(matches!(result, Err(CoreError::NotReady)));
    assert_eq!(rig.probes.camera.init_calls(), 0);
    rig.core.shutdown();
}

#[test]
fn test_frame_held_across_release_is_discarded_not_released() {
    let rig = Rig::start();
    rig.api().request_stream();
    let frame = rig.api().snapshot(SECOND).unwrap();

    stop_stream(&rig);
    let cam = rig.probes.camera.clone();
    let releases = cam.releases();
    drop(frame);

    // The driver session that owned the buffer is gone.
    assert_eq!(cam.releases(), releases);
    assert_eq!(cam.invalid_releases(), 0);
    rig.core.shutdown();
}
