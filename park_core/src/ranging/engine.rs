//! Ranging engine: round-robin trigger, echo wait, smoothing, publish.
//!
//! One sweep measures left, center and right in turn. Each measurement
//! arms the sensor's [`EchoCapture`], emits a 2 µs low / 10 µs high trigger,
//! then polls for the paired echo for up to `echo_timeout`. No echo means
//! nothing in range and reads as [`MAX_RANGE_CM`]. A settle delay between
//! sensors keeps one sensor's ring-down out of the next one's window.
//!
//! The engine only runs while `SUBSYSTEM_ACTIVE` is set.

use park_common::config::TimingConfig;
use park_common::consts::{
    LOCK_TIMEOUT_NORMAL, MAX_RANGE_CM, NUM_SENSORS, SENSOR_NAMES, TRIGGER_LOW_US, TRIGGER_PULSE_US,
};
use park_common::hal::board::SensorChannel;
use park_common::hal::driver::{EchoPin, OutputPin};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use super::duration_to_cm;
use super::echo::EchoCapture;
use super::smoothing::SmoothingRing;
use crate::error::CoreError;
use crate::state::shared::StateManager;
use crate::state::signals::{Signal, SignalBus, WaitOutcome};

/// Sweeps between two statistics log lines.
const STATS_LOG_INTERVAL: u64 = 200;

struct Channel {
    trigger: Box<dyn OutputPin>,
    /// Held so the interrupt stays attached.
    _echo: Box<dyn EchoPin>,
    capture: Arc<EchoCapture>,
    ring: SmoothingRing,
}

/// Ranging timing, copied out of [`TimingConfig`].
#[derive(Debug, Clone, Copy)]
pub struct RangingTiming {
    pub echo_timeout: Duration,
    pub echo_poll: Duration,
    pub sensor_settle: Duration,
    pub sweep_interval: Duration,
}

impl From<&TimingConfig> for RangingTiming {
    fn from(t: &TimingConfig) -> Self {
        Self {
            echo_timeout: t.echo_timeout(),
            echo_poll: t.echo_poll(),
            sensor_settle: t.sensor_settle(),
            sweep_interval: t.sweep_interval(),
        }
    }
}

#[derive(Debug, Default)]
struct SweepStats {
    sweeps: u64,
    echo_timeouts: u64,
    lock_skips: u64,
    max_sweep_us: u64,
}

pub struct RangingEngine {
    channels: Vec<Channel>,
    timing: RangingTiming,
    state: Arc<StateManager>,
    bus: Arc<SignalBus>,
    stats: SweepStats,
}

impl RangingEngine {
    /// Take ownership of the sensor pins and attach the echo interrupts.
    ///
    /// # Errors
    /// Returns `CoreError::Hal` if an interrupt cannot be attached.
    pub fn new(
        sensors: [SensorChannel; NUM_SENSORS],
        timing: RangingTiming,
        state: Arc<StateManager>,
        bus: Arc<SignalBus>,
    ) -> Result<Self, CoreError> {
        let mut channels = Vec::with_capacity(NUM_SENSORS);
        for (index, SensorChannel { mut trigger, mut echo }) in sensors.into_iter().enumerate() {
            let capture = Arc::new(EchoCapture::new());
            let isr = Arc::clone(&capture);
            echo.attach(Box::new(move |edge| isr.on_edge(edge)))?;
            trigger.set_level(false);
            debug!("Echo interrupt attached for {} sensor", SENSOR_NAMES[index]);
            channels.push(Channel {
                trigger,
                _echo: echo,
                capture,
                ring: SmoothingRing::new(),
            });
        }

        Ok(Self {
            channels,
            timing,
            state,
            bus,
            stats: SweepStats::default(),
        })
    }

    /// Raw (unsmoothed) distance from one trigger/echo exchange [cm].
    pub fn measure(&mut self, index: usize) -> f32 {
        let Some(ch) = self.channels.get_mut(index) else {
            return MAX_RANGE_CM;
        };

        ch.capture.arm();
        ch.trigger.set_level(false);
        thread::sleep(Duration::from_micros(TRIGGER_LOW_US));
        ch.trigger.set_level(true);
        thread::sleep(Duration::from_micros(TRIGGER_PULSE_US));
        ch.trigger.set_level(false);

        let deadline = Instant::now() + self.timing.echo_timeout;
        loop {
            if let Some(duration_us) = ch.capture.take_duration() {
                return duration_to_cm(duration_us);
            }
            if Instant::now() >= deadline {
                self.stats.echo_timeouts += 1;
                trace!("No echo from {} sensor", SENSOR_NAMES[index]);
                return MAX_RANGE_CM;
            }
            thread::sleep(self.timing.echo_poll);
        }
    }

    /// Measure all sensors once and return the smoothed distances.
    pub fn sweep(&mut self) -> [f32; NUM_SENSORS] {
        let mut out = [MAX_RANGE_CM; NUM_SENSORS];
        for (index, slot) in out.iter_mut().enumerate() {
            let raw = self.measure(index);
            *slot = self.channels[index].ring.push(raw);
            thread::sleep(self.timing.sensor_settle);
        }
        out
    }

    /// Engine loop. Returns on shutdown.
    pub fn run(&mut self) {
        info!(
            "Ranging engine started (echo timeout {:?}, settle {:?}, interval {:?})",
            self.timing.echo_timeout, self.timing.sensor_settle, self.timing.sweep_interval
        );

        loop {
            if self.bus.wait_set(Signal::SubsystemActive, None) == WaitOutcome::Shutdown {
                break;
            }

            let started = Instant::now();
            let distances = self.sweep();
            self.record(started.elapsed());

            match self.state.set_distances(distances, LOCK_TIMEOUT_NORMAL) {
                Ok(()) => trace!(
                    "Distances L:{:.1} C:{:.1} R:{:.1}",
                    distances[0], distances[1], distances[2]
                ),
                Err(e) => {
                    self.stats.lock_skips += 1;
                    debug!("Sweep result dropped: {e}");
                }
            }

            if !self.bus.sleep(self.timing.sweep_interval) {
                break;
            }
        }

        info!(
            "Ranging engine stopped after {} sweeps ({} echo timeouts, {} lock skips)",
            self.stats.sweeps, self.stats.echo_timeouts, self.stats.lock_skips
        );
    }

    fn record(&mut self, elapsed: Duration) {
        let us = elapsed.as_micros() as u64;
        self.stats.sweeps += 1;
        self.stats.max_sweep_us = self.stats.max_sweep_us.max(us);
        if self.stats.sweeps % STATS_LOG_INTERVAL == 0 {
            debug!(
                "Ranging: {} sweeps, max sweep {}µs, {} echo timeouts, {} lock skips",
                self.stats.sweeps, self.stats.max_sweep_us, self.stats.echo_timeouts, self.stats.lock_skips
            );
        }
    }
}
