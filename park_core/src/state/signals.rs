//! Level-triggered condition flags.
//!
//! A flag stays set until the transition that owns it clears it. Waiters
//! observe the level, not an edge, so any number of them can wait on the same
//! flag and none of them consumes another's wakeup. Every state change
//! notifies all waiters; each one re-checks its own predicate.
//!
//! The bus also carries a terminal shutdown condition. Once raised it wakes
//! every waiter and every subsequent wait returns [`WaitOutcome::Shutdown`].
//!
//! | Flag | Set by | Cleared by |
//! |------|--------|------------|
//! | `STREAM_REQUESTED` | Control API (each client connect) | Control API (last subscriber), camera manager on init failure |
//! | `CAMERA_READY` | camera manager after init | camera manager before deinit |
//! | `SUBSYSTEM_ACTIVE` | activation manager | activation manager |
//! | `SETTINGS_SAVE_REQUESTED` | Control API, boot | persistence worker |

use bitflags::bitflags;
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

bitflags! {
    /// Raw flag storage.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SignalBits: u8 {
        /// A client wants video.
        const STREAM_REQUESTED        = 0x01;
        /// Camera initialized and capturing.
        const CAMERA_READY            = 0x02;
        /// Parking assist live: sensors powered, ranging and audio running.
        const SUBSYSTEM_ACTIVE        = 0x04;
        /// In-memory settings differ from the stored record.
        const SETTINGS_SAVE_REQUESTED = 0x08;
        /// Orderly shutdown. Terminal.
        const SHUTDOWN                = 0x80;
    }
}

/// Named condition on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    StreamRequested,
    CameraReady,
    SubsystemActive,
    SettingsSaveRequested,
}

impl Signal {
    /// Storage bit.
    pub const fn bit(self) -> SignalBits {
        match self {
            Self::StreamRequested => SignalBits::STREAM_REQUESTED,
            Self::CameraReady => SignalBits::CAMERA_READY,
            Self::SubsystemActive => SignalBits::SUBSYSTEM_ACTIVE,
            Self::SettingsSaveRequested => SignalBits::SETTINGS_SAVE_REQUESTED,
        }
    }
}

/// Result of a bounded or unbounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The awaited level was observed.
    Ready,
    /// Timeout elapsed first.
    TimedOut,
    /// Shutdown was raised.
    Shutdown,
}

impl WaitOutcome {
    #[inline]
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

/// Process-wide condition flags with wait/notify.
#[derive(Debug)]
pub struct SignalBus {
    bits: Mutex<SignalBits>,
    changed: Condvar,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalBus {
    pub fn new() -> Self {
        Self {
            bits: Mutex::new(SignalBits::empty()),
            changed: Condvar::new(),
        }
    }

    /// Raise `signal`. Returns `true` if it was previously clear.
    pub fn set(&self, signal: Signal) -> bool {
        self.update(|bits| bits.insert(signal.bit()), signal)
    }

    /// Lower `signal`. Returns `true` if it was previously set.
    pub fn clear(&self, signal: Signal) -> bool {
        self.update(|bits| bits.remove(signal.bit()), signal)
    }

    fn update(&self, op: impl FnOnce(&mut SignalBits), signal: Signal) -> bool {
        let mut bits = self.bits.lock();
        let before = bits.contains(signal.bit());
        op(&mut bits);
        let after = bits.contains(signal.bit());
        if before != after {
            self.changed.notify_all();
        }
        before != after
    }

    /// Current level of `signal`.
    pub fn is_set(&self, signal: Signal) -> bool {
        self.bits.lock().contains(signal.bit())
    }

    /// Copy of all bits.
    pub fn bits(&self) -> SignalBits {
        *self.bits.lock()
    }

    /// Block until `signal` is set. `None` waits without a deadline.
    pub fn wait_set(&self, signal: Signal, timeout: Option<Duration>) -> WaitOutcome {
        self.wait_until(timeout, |bits| bits.contains(signal.bit()))
    }

    /// Block until `signal` is clear. `None` waits without a deadline.
    pub fn wait_clear(&self, signal: Signal, timeout: Option<Duration>) -> WaitOutcome {
        self.wait_until(timeout, |bits| !bits.contains(signal.bit()))
    }

    /// Sleep for `duration`, returning early on shutdown.
    ///
    /// Returns `false` if shutdown was raised.
    pub fn sleep(&self, duration: Duration) -> bool {
        self.wait_until(Some(duration), |_| false) != WaitOutcome::Shutdown
    }

    /// Raise the terminal shutdown condition and wake every waiter.
    pub fn shutdown(&self) {
        let mut bits = self.bits.lock();
        bits.insert(SignalBits::SHUTDOWN);
        self.changed.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.bits.lock().contains(SignalBits::SHUTDOWN)
    }

    fn wait_until(&self, timeout: Option<Duration>, done: impl Fn(SignalBits) -> bool) -> WaitOutcome {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut bits = self.bits.lock();
        loop {
            if bits.contains(SignalBits::SHUTDOWN) {
                return WaitOutcome::Shutdown;
            }
            if done(*bits) {
                return WaitOutcome::Ready;
            }
            match deadline {
                // No timeout, or one too large for `Instant`.
                None => self.changed.wait(&mut bits),
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return WaitOutcome::TimedOut;
                    }
                    // Spurious and foreign wakeups loop back to the checks.
                    let _ = self.changed.wait_until(&mut bits, deadline);
                }
            }
        }
    }
}
