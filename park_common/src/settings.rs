//! User settings shared between the core and its collaborators.
//!
//! The persistence collaborator owns the on-disk form; the core only sees the
//! in-memory copy held in shared state. Every field has a default so that a
//! partially written record still loads (missing keys fall back per field).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::consts::MAX_RANGE_CM;

/// Access-point SSID used until the user configures one.
pub const DEFAULT_WIFI_SSID: &str = "ESP32_Park_AP";

/// Access-point passphrase used until the user configures one.
pub const DEFAULT_WIFI_PASS: &str = "12345678";

/// Fixed-capacity SSID (802.11 limit).
pub type Ssid = heapless::String<32>;

/// Fixed-capacity WPA passphrase.
pub type Passphrase = heapless::String<64>;

/// Validation failures for externally supplied settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Thresholds must satisfy red < orange < yellow.
    #[error("thresholds must be ordered red < orange < yellow (got {red}/{orange}/{yellow})")]
    ThresholdOrder { red: u16, orange: u16, yellow: u16 },

    /// Yellow threshold beyond the sensor range.
    #[error("yellow threshold {0}cm exceeds sensor range")]
    ThresholdRange(u16),

    /// Alert rate range is inverted.
    #[error("bpm_min {min} greater than bpm_max {max}")]
    BpmRange { min: u16, max: u16 },

    /// Volume above 100 %.
    #[error("volume {0}% out of range 0..=100")]
    Volume(u8),

    /// Buzzer tone outside the audible band.
    #[error("tone {0}Hz out of range 20..=20000")]
    Tone(u32),

    /// JPEG quality outside the sensor's 0..=63 scale.
    #[error("jpeg quality {0} out of range 0..=63")]
    JpegQuality(u8),

    /// Empty SSID.
    #[error("wifi ssid cannot be empty")]
    EmptySsid,

    /// WPA2 needs at least 8 characters (or an open network).
    #[error("wifi passphrase must be empty or at least 8 characters")]
    ShortPassphrase,

    /// String does not fit its fixed-capacity field.
    #[error("{field} longer than {capacity} bytes")]
    TooLong {
        field: &'static str,
        capacity: usize,
    },
}

// ─── Camera Resolution ──────────────────────────────────────────────

/// Camera frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Resolution {
    /// 160×120
    Qqvga,
    /// 320×240
    Qvga,
    /// 640×480
    Vga,
    /// 800×600
    Svga,
    /// 1024×768
    #[default]
    Xga,
}

impl Resolution {
    /// Pixel dimensions (width, height).
    pub const fn dimensions(self) -> (u16, u16) {
        match self {
            Self::Qqvga => (160, 120),
            Self::Qvga => (320, 240),
            Self::Vga => (640, 480),
            Self::Svga => (800, 600),
            Self::Xga => (1024, 768),
        }
    }

    /// Canonical name as used by the dashboard.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Qqvga => "QQVGA",
            Self::Qvga => "QVGA",
            Self::Vga => "VGA",
            Self::Svga => "SVGA",
            Self::Xga => "XGA",
        }
    }

    /// Lenient parse: unknown names map to VGA, matching the camera firmware.
    pub fn from_name_or_vga(name: &str) -> Self {
        name.parse().unwrap_or(Self::Vga)
    }
}

impl FromStr for Resolution {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QQVGA" => Ok(Self::Qqvga),
            "QVGA" => Ok(Self::Qvga),
            "VGA" => Ok(Self::Vga),
            "SVGA" => Ok(Self::Svga),
            "XGA" => Ok(Self::Xga),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Setting Groups ─────────────────────────────────────────────────

/// Proximity zones and alert rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximitySettings {
    /// Outer zone boundary [cm]; beeping starts below it.
    pub thresh_yellow: u16,
    /// Middle zone boundary [cm].
    pub thresh_orange: u16,
    /// Inner zone boundary [cm]; continuous tone at or below it.
    pub thresh_red: u16,
    /// Beep rate at the yellow boundary.
    pub bpm_min: u16,
    /// Beep rate at the red boundary.
    pub bpm_max: u16,
    /// Activate automatically when reverse gear is engaged.
    pub auto_start: bool,
}

impl Default for ProximitySettings {
    fn default() -> Self {
        Self {
            thresh_yellow: 200,
            thresh_orange: 100,
            thresh_red: 50,
            bpm_min: 0,
            bpm_max: 300,
            auto_start: true,
        }
    }
}

/// Camera capture parameters applied at driver init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub resolution: Resolution,
    /// JPEG quality, 0 (best) ..= 63 (worst).
    pub jpeg_quality: u8,
    /// Horizontal mirror.
    pub flip_h: bool,
    /// Vertical flip.
    pub flip_v: bool,
    /// Sensor clock [MHz].
    pub xclk_mhz: u8,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::Xga,
            jpeg_quality: 20,
            flip_h: true,
            flip_v: false,
            xclk_mhz: 22,
        }
    }
}

/// Buzzer output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Loudness 0..=100 %.
    pub volume: u8,
    /// Tone frequency [Hz].
    pub tone_hz: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            volume: 100,
            tone_hz: 1760,
        }
    }
}

/// Access-point credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub wifi_ssid: Ssid,
    pub wifi_pass: Passphrase,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            wifi_ssid: fixed_string(DEFAULT_WIFI_SSID),
            wifi_pass: fixed_string(DEFAULT_WIFI_PASS),
        }
    }
}

impl NetworkSettings {
    /// Build credentials, rejecting strings that exceed their capacity.
    pub fn new(ssid: &str, pass: &str) -> Result<Self, SettingsError> {
        Ok(Self {
            wifi_ssid: Ssid::try_from(ssid).map_err(|_| SettingsError::TooLong {
                field: "wifi_ssid",
                capacity: 32,
            })?,
            wifi_pass: Passphrase::try_from(pass).map_err(|_| SettingsError::TooLong {
                field: "wifi_pass",
                capacity: 64,
            })?,
        })
    }
}

/// Dashboard overlay preferences. Carried for the dashboard, not interpreted
/// by the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub show_grid: bool,
    pub cam_angle: i16,
    pub grid_opacity: f32,
    pub grid_offset_x: i16,
    pub grid_offset_y: i16,
    pub grid_offset_z: i16,
    pub rotation: i16,
    pub stream_active: bool,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            show_grid: true,
            cam_angle: 45,
            grid_opacity: 80.0,
            grid_offset_x: 0,
            grid_offset_y: 0,
            grid_offset_z: 0,
            rotation: 90,
            stream_active: true,
        }
    }
}

// ─── Settings ───────────────────────────────────────────────────────

/// Complete persisted settings record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub proximity: ProximitySettings,
    pub camera: CameraSettings,
    pub audio: AudioSettings,
    pub network: NetworkSettings,
    pub overlay: OverlaySettings,
}

impl Settings {
    /// Validate every user-editable field.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let p = &self.proximity;
        if !(p.thresh_red < p.thresh_orange && p.thresh_orange < p.thresh_yellow) {
            return Err(SettingsError::ThresholdOrder {
                red: p.thresh_red,
                orange: p.thresh_orange,
                yellow: p.thresh_yellow,
            });
        }
        if f32::from(p.thresh_yellow) > MAX_RANGE_CM {
            return Err(SettingsError::ThresholdRange(p.thresh_yellow));
        }
        if p.bpm_min > p.bpm_max {
            return Err(SettingsError::BpmRange {
                min: p.bpm_min,
                max: p.bpm_max,
            });
        }
        if self.audio.volume > 100 {
            return Err(SettingsError::Volume(self.audio.volume));
        }
        if !(20..=20_000).contains(&self.audio.tone_hz) {
            return Err(SettingsError::Tone(self.audio.tone_hz));
        }
        if self.camera.jpeg_quality > 63 {
            return Err(SettingsError::JpegQuality(self.camera.jpeg_quality));
        }
        if self.network.wifi_ssid.is_empty() {
            return Err(SettingsError::EmptySsid);
        }
        let pass_len = self.network.wifi_pass.len();
        if pass_len > 0 && pass_len < 8 {
            return Err(SettingsError::ShortPassphrase);
        }
        Ok(())
    }
}

/// Copy a compile-time default into a fixed-capacity string, truncating if needed.
fn fixed_string<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
