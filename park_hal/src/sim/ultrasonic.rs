//! Ultrasonic sensor model.
//!
//! The trigger pin watches for the falling edge that ends the trigger pulse
//! and immediately replays the echo the sensor would produce for the current
//! obstacle distance: a rising edge after the transducer latency, then a
//! falling edge `distance × 58 µs` later. An empty [`ObstacleField`] slot
//! means nothing in range, so no edges are produced at all.

use park_common::consts::{ECHO_US_PER_CM, NUM_SENSORS};
use park_common::hal::driver::{EchoEdge, EchoPin, EdgeHandler, HalError, OutputPin};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

use super::clock::SimClock;

/// Delay between the end of the trigger pulse and the echo going high [µs].
pub const TRANSDUCER_LATENCY_US: u64 = 450;

/// Obstacle distance per sensor [cm]; `None` = no reflection.
#[derive(Debug, Default)]
pub struct ObstacleField {
    distances: Mutex<[Option<f32>; NUM_SENSORS]>,
}

impl ObstacleField {
    /// Field with nothing in range.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place (or remove) the obstacle seen by `sensor`. Out-of-range indices
    /// are ignored.
    pub fn set(&self, sensor: usize, distance_cm: Option<f32>) {
        if let Some(slot) = self.distances.lock().get_mut(sensor) {
            *slot = distance_cm;
        }
    }

    /// Replace all three distances at once.
    pub fn set_all(&self, distances_cm: [Option<f32>; NUM_SENSORS]) {
        *self.distances.lock() = distances_cm;
    }

    /// Current obstacle for `sensor`.
    pub fn get(&self, sensor: usize) -> Option<f32> {
        self.distances.lock().get(sensor).copied().flatten()
    }
}

/// Installed edge handler shared by a trigger/echo pair.
type EchoLine = Arc<Mutex<Option<EdgeHandler>>>;

/// Trigger pin of one simulated sensor.
pub struct SimTrigger {
    index: usize,
    level: bool,
    obstacles: Arc<ObstacleField>,
    clock: SimClock,
    line: EchoLine,
}

impl OutputPin for SimTrigger {
    fn set_level(&mut self, high: bool) {
        let falling = self.level && !high;
        self.level = high;
        if !falling {
            return;
        }

        let Some(distance) = self.obstacles.get(self.index) else {
            return;
        };
        let rise = self.clock.now_us() + TRANSDUCER_LATENCY_US;
        let width = (distance.max(0.0) * ECHO_US_PER_CM).round() as u64;

        let guard = self.line.lock();
        if let Some(handler) = guard.as_ref() {
            trace!(sensor = self.index, width_us = width, "echo");
            handler(EchoEdge::rising(rise));
            handler(EchoEdge::falling(rise + width));
        }
    }
}

/// Echo pin of one simulated sensor.
pub struct SimEcho {
    line: EchoLine,
}

impl EchoPin for SimEcho {
    fn attach(&mut self, handler: EdgeHandler) -> Result<(), HalError> {
        *self.line.lock() = Some(handler);
        Ok(())
    }
}

/// Build the trigger/echo pair for sensor `index`.
pub fn sensor_pair(index: usize, obstacles: Arc<ObstacleField>, clock: SimClock) -> (SimTrigger, SimEcho) {
    let line: EchoLine = Arc::new(Mutex::new(None));
    (
        SimTrigger {
            index,
            level: false,
            obstacles,
            clock,
            line: Arc::clone(&line),
        },
        SimEcho { line },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use park_common::hal::driver::EdgeKind;

    fn recorder() -> (EdgeHandler, Arc<Mutex<Vec<EchoEdge>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (Box::new(move |edge| sink.lock().push(edge)), seen)
    }

    #[test]
    fn falling_trigger_replays_echo_width() {
        let field = Arc::new(ObstacleField::new());
        field.set(1, Some(100.0));
        let (mut trig, mut echo) = sensor_pair(1, Arc::clone(&field), SimClock::new());
        let (handler, seen) = recorder();
        echo.attach(handler).unwrap();

        trig.set_level(true);
        assert!(seen.lock().is_empty());
        trig.set_level(false);

        let edges = seen.lock();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].kind, EdgeKind::Rising);
        assert_eq!(edges[1].kind, EdgeKind::Falling);
        assert_eq!(edges[1].timestamp_us - edges[0].timestamp_us, 5800);
    }

    #[test]
    fn empty_field_produces_no_edges() {
        let field = Arc::new(ObstacleField::new());
        let (mut trig, mut echo) = sensor_pair(0, field, SimClock::new());
        let (handler, seen) = recorder();
        echo.attach(handler).unwrap();
        trig.set_level(true);
        trig.set_level(false);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let field = ObstacleField::new();
        field.set(7, Some(10.0));
        assert_eq!(field.get(7), None);
        field.set_all([Some(1.0), None, Some(3.0)]);
        assert_eq!(field.get(2), Some(3.0));
    }
}
