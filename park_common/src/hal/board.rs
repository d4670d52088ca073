//! Board bundle handed to the runtime at startup.

use crate::consts::NUM_SENSORS;
use crate::hal::camera::CameraDriver;
use crate::hal::driver::{EchoPin, InputPin, OutputPin, ToneOutput};

/// Trigger/echo pin pair of one ultrasonic sensor.
pub struct SensorChannel {
    pub trigger: Box<dyn OutputPin>,
    pub echo: Box<dyn EchoPin>,
}

/// All peripherals the core drives.
///
/// Built once by the board support crate, then split up among the tasks.
pub struct Board {
    /// Left, center, right.
    pub sensors: [SensorChannel; NUM_SENSORS],
    /// Reverse-gear sense line (raw level; polarity comes from config).
    pub reverse_sense: Box<dyn InputPin>,
    /// Sensor array power enable.
    pub sensor_power: Box<dyn OutputPin>,
    pub buzzer: Box<dyn ToneOutput>,
    pub camera: Box<dyn CameraDriver>,
}
