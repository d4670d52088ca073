//! Echo edge capture shared between interrupt and task context.
//!
//! One [`EchoCapture`] per sensor holds, as a single unit:
//!
//! | Field | Written by | Meaning |
//! |-------|------------|---------|
//! | `rise_us` | ISR (rising edge) | timestamp of the last rising edge |
//! | `duration_us` | ISR (paired falling edge) | fall − rise, saturating at 0 |
//! | `RISE_PENDING` | ISR | a rising edge is waiting for its falling edge |
//! | `PULSE_READY` | ISR | `duration_us` holds a complete measurement |
//!
//! A falling edge only produces a measurement while `RISE_PENDING` is set, so
//! a stray falling edge or a second falling edge never pairs with a stale
//! rise. The task side arms the cell before each trigger and polls
//! `PULSE_READY`. A measurement that lands one sweep late is tolerated; the
//! fields are plain atomics so nothing can tear.

use park_common::hal::driver::{EchoEdge, EdgeKind};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

const RISE_PENDING: u8 = 0x01;
const PULSE_READY: u8 = 0x02;

#[derive(Debug, Default)]
pub struct EchoCapture {
    rise_us: AtomicU64,
    duration_us: AtomicU64,
    flags: AtomicU8,
}

impl EchoCapture {
    pub const fn new() -> Self {
        Self {
            rise_us: AtomicU64::new(0),
            duration_us: AtomicU64::new(0),
            flags: AtomicU8::new(0),
        }
    }

    /// Forget any previous pulse, including a rise still pending from an
    /// earlier trigger.
    #[inline]
    pub fn arm(&self) {
        self.flags.store(0, Ordering::Release);
    }

    /// Edge handler body. Interrupt context: no locks, no allocation.
    #[inline]
    pub fn on_edge(&self, edge: EchoEdge) {
        match edge.kind {
            EdgeKind::Rising => {
                self.rise_us.store(edge.timestamp_us, Ordering::Relaxed);
                self.flags.fetch_or(RISE_PENDING, Ordering::Release);
            }
            EdgeKind::Falling => {
                if self.flags.load(Ordering::Acquire) & RISE_PENDING == 0 {
                    return;
                }
                let rise = self.rise_us.load(Ordering::Relaxed);
                self.duration_us
                    .store(edge.timestamp_us.saturating_sub(rise), Ordering::Relaxed);
                // Publishes the duration and drops RISE_PENDING in one store.
                self.flags.store(PULSE_READY, Ordering::Release);
            }
        }
    }

    /// Completed pulse width [µs], if one arrived since the last `arm()`.
    #[inline]
    pub fn take_duration(&self) -> Option<u64> {
        if self.flags.load(Ordering::Acquire) & PULSE_READY != 0 {
            Some(self.duration_us.load(Ordering::Relaxed))
        } else {
            None
        }
    }

    #[inline]
    pub fn rise_pending(&self) -> bool {
        self.flags.load(Ordering::Acquire) & RISE_PENDING != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paired_edges_produce_duration() {
        let cap = EchoCapture::new();
        cap.arm();
        cap.on_edge(EchoEdge::rising(100));
        assert!(cap.rise_pending());
        assert_eq!(cap.take_duration(), None);
        cap.on_edge(EchoEdge::falling(300));
        assert_eq!(cap.take_duration(), Some(200));
        assert!(!cap.rise_pending());
    }

    #[test]
    fn test_falling_without_rise_is_ignored() {
        let cap = EchoCapture::new();
        cap.arm();
        cap.on_edge(EchoEdge::falling(300));
        assert_eq!(cap.take_duration(), None);
    }

    #[test]
    fn test_second_falling_edge_does_not_repair() {
        let cap = EchoCapture::new();
        cap.arm();
        cap.on_edge(EchoEdge::rising(1_000));
        cap.on_edge(EchoEdge::falling(1_580));
        cap.on_edge(EchoEdge::falling(9_000));
        assert_eq!(cap.take_duration(), Some(580));
    }

    #[test]
    fn test_out_of_order_timestamps_saturate() {
        let cap = EchoCapture::new();
        cap.arm();
        cap.on_edge(EchoEdge::rising(500));
        cap.on_edge(EchoEdge::falling(400));
        assert_eq!(cap.take_duration(), Some(0));
    }

    #[test]
    fn test_arm_clears_stale_rise() {
        let cap = EchoCapture::new();
        cap.on_edge(EchoEdge::rising(10));
        cap.arm();
        cap.on_edge(EchoEdge::falling(50));
        assert_eq!(cap.take_duration(), None);
    }
}
