//! Exclusive camera access and the move-only frame handle.
//!
//! [`CameraResource`] wraps the driver in its own lock, separate from the
//! shared-state lock, and serializes every driver call behind it. Each
//! successful init starts a new *generation*. A [`FrameBuffer`] remembers the
//! generation it was captured in; its `Drop` takes the camera lock, re-checks
//! that the driver is still initialized and still in that generation, and
//! only then releases the buffer. A frame outliving its session is discarded
//! instead, because deinit already reclaimed the pool.

use park_common::hal::camera::{CameraConfig, CameraDriver, RawFrame};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::CoreError;

struct CameraDevice {
    driver: Box<dyn CameraDriver>,
    initialized: bool,
    generation: u64,
}

/// Driver behind the camera lock.
pub struct CameraResource {
    device: Mutex<CameraDevice>,
    /// Bound for capture-path lock acquisition.
    lock_timeout: Duration,
    /// Bound for init/deinit lock acquisition.
    lifecycle_timeout: Duration,
    /// Lock-free copy of `device.initialized` for observers.
    initialized: AtomicBool,
    /// Lock-free copy of `device.generation`.
    generation: AtomicU64,
    released: AtomicU64,
    discarded: AtomicU64,
}

impl fmt::Debug for CameraResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraResource")
            .field("initialized", &self.is_initialized())
            .field("released", &self.released())
            .field("discarded", &self.discarded())
            .finish_non_exhaustive()
    }
}

impl CameraResource {
    pub fn new(driver: Box<dyn CameraDriver>, lock_timeout: Duration, lifecycle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            device: Mutex::new(CameraDevice {
                driver,
                initialized: false,
                generation: 0,
            }),
            lock_timeout,
            lifecycle_timeout,
            initialized: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            released: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        })
    }

    /// Initialize the driver. Returns the new generation.
    ///
    /// Holds the camera lock for the whole driver init.
    pub fn init(&self, config: &CameraConfig) -> Result<u64, CoreError> {
        let mut dev = self
            .device
            .try_lock_for(self.lifecycle_timeout)
            .ok_or(CoreError::LockTimeout { what: "camera" })?;
        if dev.initialized {
            return Ok(dev.generation);
        }
        dev.driver.init(config)?;
        dev.initialized = true;
        dev.generation += 1;
        self.generation.store(dev.generation, Ordering::SeqCst);
        self.initialized.store(true, Ordering::SeqCst);
        info!(
            "Camera '{}' initialized (generation {}, {} q={})",
            dev.driver.name(),
            dev.generation,
            config.resolution,
            config.jpeg_quality
        );
        Ok(dev.generation)
    }

    /// Release the driver. A no-op if it is not initialized.
    pub fn deinit(&self) -> Result<(), CoreError> {
        let mut dev = self
            .device
            .try_lock_for(self.lifecycle_timeout)
            .ok_or(CoreError::LockTimeout { what: "camera" })?;
        if !dev.initialized {
            return Ok(());
        }
        dev.initialized = false;
        self.initialized.store(false, Ordering::SeqCst);
        let result = dev.driver.deinit();
        info!("Camera '{}' released (generation {})", dev.driver.name(), dev.generation);
        result.map_err(CoreError::from)
    }

    /// Capture one frame.
    ///
    /// `Ok(None)` means the driver had no buffer ready.
    ///
    /// # Errors
    /// `NotReady` if the driver is not initialized, `LockTimeout` if the
    /// camera lock is busy.
    pub fn capture(self: &Arc<Self>) -> Result<Option<FrameBuffer>, CoreError> {
        let mut dev = self
            .device
            .try_lock_for(self.lock_timeout)
            .ok_or(CoreError::LockTimeout { what: "camera" })?;
        // Re-checked under the lock: deinit may have won the race.
        if !dev.initialized {
            return Err(CoreError::NotReady);
        }
        let generation = dev.generation;
        Ok(dev.driver.capture().map(|raw| FrameBuffer {
            raw: Some(raw),
            generation,
            owner: Arc::clone(self),
        }))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// `true` while the driver is initialized in `generation`.
    pub fn is_current(&self, generation: u64) -> bool {
        self.initialized.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }

    /// Frames handed back to the driver.
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// Frames dropped because their driver session had ended.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::SeqCst)
    }

    fn give_back(&self, raw: RawFrame, generation: u64) {
        // Unbounded: skipping a release would starve the pool.
        let mut dev = self.device.lock();
        if dev.initialized && dev.generation == generation {
            dev.driver.release(raw);
            self.released.fetch_add(1, Ordering::Relaxed);
        } else {
            debug!(
                sequence = raw.sequence,
                generation,
                current = dev.generation,
                "Discarding frame from ended camera session"
            );
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// One captured frame on loan from the driver.
///
/// Move-only. Dropping it returns the buffer exactly once.
pub struct FrameBuffer {
    raw: Option<RawFrame>,
    generation: u64,
    owner: Arc<CameraResource>,
}

impl FrameBuffer {
    /// Encoded bytes.
    pub fn data(&self) -> &[u8] {
        match &self.raw {
            Some(raw) => &raw.data,
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    pub fn width(&self) -> u16 {
        self.raw.as_ref().map_or(0, |r| r.width)
    }

    pub fn height(&self) -> u16 {
        self.raw.as_ref().map_or(0, |r| r.height)
    }

    pub fn sequence(&self) -> u64 {
        self.raw.as_ref().map_or(0, |r| r.sequence)
    }

    /// Driver session the frame belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `false` once the session that captured this frame has ended.
    pub fn is_live(&self) -> bool {
        self.owner.is_current(self.generation)
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("sequence", &self.sequence())
            .field("generation", &self.generation)
            .field("len", &self.len())
            .finish()
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            self.owner.give_back(raw, self.generation);
        } else {
            warn!("FrameBuffer dropped without a buffer");
        }
    }
}
