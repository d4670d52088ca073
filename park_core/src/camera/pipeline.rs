//! Frame producer, streaming consumer and the snapshot path.

use park_common::link::FrameTransport;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use super::frame::{CameraResource, FrameBuffer};
use super::queue::{FrameSlot, RecvError};
use crate::error::CoreError;
use crate::state::signals::{Signal, SignalBus, WaitOutcome};

/// Frames between two consumer statistics log lines.
const STATS_LOG_INTERVAL: u64 = 500;

// ─── Producer ───────────────────────────────────────────────────────

/// Captures while `CAMERA_READY` is set and overwrites the queue slot.
pub struct FrameProducer {
    camera: Arc<CameraResource>,
    queue: Arc<FrameSlot<FrameBuffer>>,
    bus: Arc<SignalBus>,
    retry_delay: Duration,
    captured: u64,
}

impl FrameProducer {
    pub fn new(
        camera: Arc<CameraResource>,
        queue: Arc<FrameSlot<FrameBuffer>>,
        bus: Arc<SignalBus>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            camera,
            queue,
            bus,
            retry_delay,
            captured: 0,
        }
    }

    /// One capture attempt. Returns `true` if a frame was queued.
    pub fn step(&mut self) -> bool {
        match self.camera.capture() {
            Ok(Some(frame)) => {
                self.captured += 1;
                // The displaced frame goes back to the driver here, outside
                // the queue lock.
                drop(self.queue.push(frame));
                true
            }
            Ok(None) => false,
            Err(e) => {
                trace!("Capture skipped: {e}");
                false
            }
        }
    }

    pub fn run(&mut self) {
        info!("Frame producer started");
        loop {
            if self.bus.wait_set(Signal::CameraReady, None) == WaitOutcome::Shutdown {
                break;
            }
            if !self.step() && !self.bus.sleep(self.retry_delay) {
                break;
            }
        }
        info!(
            "Frame producer stopped ({} captured, {} overwritten)",
            self.captured,
            self.queue.overwritten()
        );
    }
}

// ─── Consumer ───────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsumerStats {
    pub received: u64,
    pub forwarded: u64,
    pub bytes: u64,
    /// Frames from an ended camera session, dropped unsent.
    pub stale: u64,
}

/// Forwards frames to the transport; every frame is released afterwards.
pub struct FrameConsumer {
    queue: Arc<FrameSlot<FrameBuffer>>,
    transport: Arc<dyn FrameTransport>,
    stats: ConsumerStats,
}

impl FrameConsumer {
    pub fn new(queue: Arc<FrameSlot<FrameBuffer>>, transport: Arc<dyn FrameTransport>) -> Self {
        Self {
            queue,
            transport,
            stats: ConsumerStats::default(),
        }
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    /// Deliver one frame (if anyone is listening) and release it.
    pub fn deliver(&mut self, frame: FrameBuffer) {
        if !frame.is_live() {
            self.stats.stale += 1;
            trace!(generation = frame.generation(), "Dropping frame from ended session");
            return;
        }
        self.stats.received += 1;
        if self.transport.subscriber_count() > 0 && self.transport.is_writable() {
            self.transport.broadcast_binary(frame.data());
            self.stats.forwarded += 1;
            self.stats.bytes += frame.len() as u64;
        }
        drop(frame);

        if self.stats.received % STATS_LOG_INTERVAL == 0 {
            debug!(
                "Stream: {} frames received, {} forwarded, {} KiB",
                self.stats.received,
                self.stats.forwarded,
                self.stats.bytes / 1024
            );
        }
    }

    pub fn run(&mut self) {
        info!("Frame consumer started");
        loop {
            match self.queue.recv(None) {
                Ok(frame) => self.deliver(frame),
                Err(RecvError::Closed) => break,
                Err(RecvError::Timeout) => continue,
            }
        }
        info!(
            "Frame consumer stopped ({} received, {} forwarded, {} stale)",
            self.stats.received, self.stats.forwarded, self.stats.stale
        );
    }
}

// ─── Snapshot ───────────────────────────────────────────────────────

/// Take the next frame from the queue ahead of the streaming consumer.
///
/// Waits up to `ready_timeout` for `CAMERA_READY`, then up to
/// `frame_timeout` for a live frame. Frames from an ended session are
/// dropped and the wait continues. Never captures directly.
///
/// # Errors
/// `NotReady` if the camera did not become ready, `TimedOut` if no frame
/// arrived, `Shutdown` during orderly shutdown.
pub fn snapshot(
    bus: &SignalBus,
    queue: &FrameSlot<FrameBuffer>,
    ready_timeout: Duration,
    frame_timeout: Duration,
) -> Result<FrameBuffer, CoreError> {
    match bus.wait_set(Signal::CameraReady, Some(ready_timeout)) {
        WaitOutcome::Ready => {}
        WaitOutcome::TimedOut => return Err(CoreError::NotReady),
        WaitOutcome::Shutdown => return Err(CoreError::Shutdown),
    }
    let deadline = Instant::now().checked_add(frame_timeout);
    loop {
        let remaining = deadline.map_or(frame_timeout, |d| d.saturating_duration_since(Instant::now()));
        let frame = queue.recv_priority(remaining).map_err(|e| match e {
            RecvError::Timeout => CoreError::TimedOut("snapshot frame"),
            RecvError::Closed => CoreError::Shutdown,
        })?;
        if frame.is_live() {
            return Ok(frame);
        }
        trace!(generation = frame.generation(), "Snapshot skipped stale frame");
    }
}
