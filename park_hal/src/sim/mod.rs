//! Simulated board.
//!
//! `SimBoard::new` builds a [`Board`] whose peripherals are backed by shared
//! state, plus a [`SimProbes`] bundle for steering and observing them.

pub mod buzzer;
pub mod camera;
pub mod clock;
pub mod collab;
pub mod gpio;
pub mod ultrasonic;

use park_common::config::HardwareConfig;
use park_common::hal::board::{Board, SensorChannel};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use buzzer::{BuzzerProbe, SimBuzzer};
pub use camera::{CameraProbe, SimCamera};
pub use clock::SimClock;
pub use collab::{LogTelemetrySink, MemoryStore, SimTransport};
pub use gpio::{ReverseLever, SimInput, SimLine, SimOutput};
pub use ultrasonic::{ObstacleField, SimEcho, SimTrigger};

/// Default simulated frame period (25 fps).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(40);

/// Handles for steering and observing a simulated board.
#[derive(Clone)]
pub struct SimProbes {
    /// Obstacle distances seen by each sensor.
    pub obstacles: Arc<ObstacleField>,
    /// Reverse-gear lever.
    pub reverse: ReverseLever,
    /// Sensor power-enable output.
    pub sensor_power: SimLine,
    /// Buzzer output state.
    pub buzzer: BuzzerProbe,
    /// Camera driver counters and fault injection.
    pub camera: CameraProbe,
}

/// A [`Board`] plus its probes.
pub struct SimBoard {
    /// Peripherals for the runtime.
    pub board: Board,
    /// Test and demo handles.
    pub probes: SimProbes,
}

impl SimBoard {
    /// Build a board with the default frame period.
    pub fn new(hw: &HardwareConfig) -> Self {
        Self::with_frame_interval(hw, DEFAULT_FRAME_INTERVAL)
    }

    /// Build a board whose camera produces one frame per `frame_interval`.
    pub fn with_frame_interval(hw: &HardwareConfig, frame_interval: Duration) -> Self {
        let clock = SimClock::new();
        let obstacles = Arc::new(ObstacleField::new());

        let sensors = std::array::from_fn(|index| {
            let (trigger, echo) = ultrasonic::sensor_pair(index, Arc::clone(&obstacles), clock.clone());
            SensorChannel {
                trigger: Box::new(trigger),
                echo: Box::new(echo),
            }
        });

        let reverse_line = SimLine::new(hw.reverse_active_low);
        let reverse = ReverseLever::new(reverse_line.clone(), hw.reverse_active_low);
        let sensor_power = SimLine::new(false);

        let (buzzer, buzzer_probe) = SimBuzzer::new(hw.buzzer_pwm_bits);
        let (camera, camera_probe) = SimCamera::new(frame_interval);

        info!(
            "Simulation board ready (reverse active-{}, buzzer {}-bit, frame period {:?})",
            if hw.reverse_active_low { "low" } else { "high" },
            hw.buzzer_pwm_bits,
            frame_interval
        );

        Self {
            board: Board {
                sensors,
                reverse_sense: Box::new(SimInput::new(reverse_line)),
                sensor_power: Box::new(SimOutput::new(sensor_power.clone())),
                buzzer: Box::new(buzzer),
                camera: Box::new(camera),
            },
            probes: SimProbes {
                obstacles,
                reverse,
                sensor_power,
                buzzer: buzzer_probe,
                camera: camera_probe,
            },
        }
    }
}
