//! Camera driver trait and frame types.
//!
//! The driver owns a small pool of frame buffers. `capture()` moves one
//! buffer out of the pool inside a [`RawFrame`]; `release()` moves it back.
//! A buffer that is never released starves the pool.

use crate::consts::CAMERA_FB_COUNT;
use crate::hal::driver::HalError;
use crate::settings::{CameraSettings, Resolution};

/// Parameters applied at driver init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConfig {
    pub resolution: Resolution,
    /// JPEG quality, 0 (best) ..= 63 (worst).
    pub jpeg_quality: u8,
    pub hmirror: bool,
    pub vflip: bool,
    pub xclk_freq_hz: u32,
    /// Number of driver-owned frame buffers.
    pub fb_count: usize,
}

impl From<&CameraSettings> for CameraConfig {
    fn from(s: &CameraSettings) -> Self {
        Self {
            resolution: s.resolution,
            jpeg_quality: s.jpeg_quality,
            hmirror: s.flip_h,
            vflip: s.flip_v,
            xclk_freq_hz: u32::from(s.xclk_mhz) * 1_000_000,
            fb_count: CAMERA_FB_COUNT,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self::from(&CameraSettings::default())
    }
}

/// One captured image on loan from the driver.
///
/// Deliberately not `Clone`: the buffer exists exactly once.
#[derive(Debug)]
pub struct RawFrame {
    /// Driver pool slot the buffer belongs to.
    pub slot: usize,
    /// Capture counter, monotonically increasing per driver session.
    pub sequence: u64,
    pub width: u16,
    pub height: u16,
    /// Encoded (JPEG) bytes.
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Encoded length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the driver produced an empty buffer.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Trait defining the interface for camera drivers.
///
/// # Lifecycle
///
/// 1. `init()` - Powers the sensor and allocates the buffer pool
/// 2. `capture()` / `release()` - Any number of times while initialized
/// 3. `deinit()` - Powers down; outstanding buffers are reclaimed
///
/// # Timing Contracts
///
/// | Operation | Typical Duration | Notes |
/// |-----------|------------------|-------|
/// | `init()` | 100 ms .. 1 s | SCCB probe + PLL lock |
/// | `capture()` | one frame period | blocks until a buffer is filled |
/// | `release()` | µs | returns buffer to the pool |
/// | `deinit()` | < 100 ms | |
///
/// Callers serialize every call behind a single camera lock; implementations
/// need not be re-entrant.
pub trait CameraDriver: Send {
    /// Returns the driver's identifier (e.g., "ov5640", "simulation").
    fn name(&self) -> &'static str;

    /// Power up and configure the sensor.
    ///
    /// # Errors
    /// Returns `HalError::InitFailed` if the sensor does not respond.
    fn init(&mut self, config: &CameraConfig) -> Result<(), HalError>;

    /// Power down and reclaim all buffers, including ones still on loan.
    fn deinit(&mut self) -> Result<(), HalError>;

    /// Take the next filled buffer, or `None` if none is available.
    fn capture(&mut self) -> Option<RawFrame>;

    /// Give a buffer back to the pool.
    fn release(&mut self, frame: RawFrame);
}
