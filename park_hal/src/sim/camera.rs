//! Simulated camera with a fixed buffer pool.
//!
//! Buffers really move: `capture()` takes one out of the pool and `release()`
//! puts it back, so a leaked frame shows up as a starved pool and a double or
//! stale release shows up in [`CameraProbe::invalid_releases`].

use park_common::hal::camera::{CameraConfig, CameraDriver, RawFrame};
use park_common::hal::driver::HalError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct Counters {
    init_calls: AtomicU32,
    deinit_calls: AtomicU32,
    captures: AtomicU64,
    releases: AtomicU64,
    invalid_releases: AtomicU64,
    initialized: AtomicBool,
    outstanding: AtomicUsize,
    fail_next_inits: AtomicU32,
    init_delay_ms: AtomicU64,
}

/// Counters and fault injection for a [`SimCamera`].
#[derive(Debug, Clone, Default)]
pub struct CameraProbe(Arc<Counters>);

impl CameraProbe {
    /// Number of `init()` calls, successful or not.
    pub fn init_calls(&self) -> u32 {
        self.0.init_calls.load(Ordering::SeqCst)
    }

    /// Number of `deinit()` calls.
    pub fn deinit_calls(&self) -> u32 {
        self.0.deinit_calls.load(Ordering::SeqCst)
    }

    /// Frames handed out.
    pub fn captures(&self) -> u64 {
        self.0.captures.load(Ordering::SeqCst)
    }

    /// Frames returned to the pool.
    pub fn releases(&self) -> u64 {
        self.0.releases.load(Ordering::SeqCst)
    }

    /// Releases that did not match an outstanding buffer of the live session.
    pub fn invalid_releases(&self) -> u64 {
        self.0.invalid_releases.load(Ordering::SeqCst)
    }

    /// True between a successful `init()` and the next `deinit()`.
    pub fn is_initialized(&self) -> bool {
        self.0.initialized.load(Ordering::SeqCst)
    }

    /// Buffers currently on loan.
    pub fn outstanding(&self) -> usize {
        self.0.outstanding.load(Ordering::SeqCst)
    }

    /// Make the next `count` calls to `init()` fail.
    pub fn fail_next_inits(&self, count: u32) {
        self.0.fail_next_inits.store(count, Ordering::SeqCst);
    }

    /// Make `init()` take `delay` before returning.
    pub fn set_init_delay(&self, delay: Duration) {
        self.0
            .init_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

/// Simulated OV-series sensor producing synthetic JPEG frames.
pub struct SimCamera {
    probe: CameraProbe,
    config: Option<CameraConfig>,
    /// `Some` = buffer available in the pool, `None` = on loan.
    pool: Vec<Option<Vec<u8>>>,
    /// Bumped on every init so releases from a previous session are caught.
    session: u64,
    sequence: u64,
    frame_interval: Duration,
    last_capture: Option<Instant>,
}

/// Sequence numbers carry the session in the upper bits.
const SESSION_SHIFT: u32 = 40;

impl SimCamera {
    /// Camera producing at most one frame per `frame_interval`.
    pub fn new(frame_interval: Duration) -> (Self, CameraProbe) {
        let probe = CameraProbe::default();
        (
            Self {
                probe: probe.clone(),
                config: None,
                pool: Vec::new(),
                session: 0,
                sequence: 0,
                frame_interval,
                last_capture: None,
            },
            probe,
        )
    }

    fn encode(&self, config: &CameraConfig) -> Vec<u8> {
        // Size scales with pixel count and inversely with quality setting.
        let (w, h) = config.resolution.dimensions();
        let pixels = u64::from(w) * u64::from(h);
        let body = (pixels / (8 + u64::from(config.jpeg_quality))).max(64) as usize / 16;
        let mut data = Vec::with_capacity(body + 4);
        data.extend_from_slice(&[0xFF, 0xD8]);
        data.extend((0..body).map(|i| (self.sequence as usize + i) as u8));
        data.extend_from_slice(&[0xFF, 0xD9]);
        data
    }

    fn pace(&mut self) {
        if let Some(last) = self.last_capture {
            let elapsed = last.elapsed();
            if elapsed < self.frame_interval {
                std::thread::sleep(self.frame_interval - elapsed);
            }
        }
        self.last_capture = Some(Instant::now());
    }
}

impl CameraDriver for SimCamera {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn init(&mut self, config: &CameraConfig) -> Result<(), HalError> {
        let c = &self.probe.0;
        c.init_calls.fetch_add(1, Ordering::SeqCst);

        let delay = c.init_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }

        let failing = c
            .fail_next_inits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            warn!("Simulated camera init failure");
            return Err(HalError::InitFailed("simulated SCCB probe timeout".into()));
        }

        if config.fb_count == 0 {
            return Err(HalError::ConfigError("fb_count must be at least 1".into()));
        }

        self.session += 1;
        self.sequence = 0;
        self.last_capture = None;
        self.pool = (0..config.fb_count).map(|_| Some(Vec::new())).collect();
        self.config = Some(*config);
        c.outstanding.store(0, Ordering::SeqCst);
        c.initialized.store(true, Ordering::SeqCst);

        let (w, h) = config.resolution.dimensions();
        info!(
            "Simulated camera up: {} {}x{} q={} fb={}",
            config.resolution, w, h, config.jpeg_quality, config.fb_count
        );
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), HalError> {
        let c = &self.probe.0;
        c.deinit_calls.fetch_add(1, Ordering::SeqCst);
        if self.config.is_none() {
            return Err(HalError::NotInitialized("camera"));
        }
        let outstanding = c.outstanding.swap(0, Ordering::SeqCst);
        if outstanding > 0 {
            warn!("Camera deinit reclaimed {} buffer(s) still on loan", outstanding);
        }
        self.pool.clear();
        self.config = None;
        c.initialized.store(false, Ordering::SeqCst);
        debug!("Simulated camera down");
        Ok(())
    }

    fn capture(&mut self) -> Option<RawFrame> {
        let config = self.config?;
        let slot = self.pool.iter().position(Option::is_some)?;
        self.pace();

        let mut data = self.pool[slot].take()?;
        data.clear();
        data.extend_from_slice(&self.encode(&config));

        self.sequence += 1;
        let c = &self.probe.0;
        c.captures.fetch_add(1, Ordering::SeqCst);
        c.outstanding.fetch_add(1, Ordering::SeqCst);

        let (width, height) = config.resolution.dimensions();
        Some(RawFrame {
            slot,
            sequence: (self.session << SESSION_SHIFT) | self.sequence,
            width,
            height,
            data,
        })
    }

    fn release(&mut self, frame: RawFrame) {
        let c = &self.probe.0;
        let same_session = frame.sequence >> SESSION_SHIFT == self.session;
        let entry = self
            .pool
            .get_mut(frame.slot)
            .filter(|entry| same_session && entry.is_none());
        if let Some(entry) = entry {
            *entry = Some(frame.data);
            c.releases.fetch_add(1, Ordering::SeqCst);
            c.outstanding.fetch_sub(1, Ordering::SeqCst);
        } else {
            warn!(
                slot = frame.slot,
                sequence = frame.sequence,
                "Release of a buffer not on loan"
            );
            c.invalid_releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}
