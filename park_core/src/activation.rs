//! Activation manager.
//!
//! Decides every poll whether the parking assist is live:
//!
//! ```text
//! desired = (reverse && auto_start) || manual_override
//! active  = desired || (now - last_reverse < grace)
//! ```
//!
//! The grace window keeps the sensors running through a brief shift out of
//! reverse. It applies whether or not `auto_start` is enabled. Before reverse
//! has ever been seen there is no grace.
//!
//! On a transition the manager drives the sensor power output, sets or clears
//! `SUBSYSTEM_ACTIVE`, and mirrors the decision into shared state.

use park_common::consts::LOCK_TIMEOUT_NORMAL;
use park_common::hal::driver::{InputPin, OutputPin};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::state::shared::{ActivationInputs, StateManager};
use crate::state::signals::{Signal, SignalBus};

/// Pure decision function with its grace timer.
#[derive(Debug, Clone, Copy)]
pub struct ActivationPolicy {
    grace: Duration,
    last_reverse: Option<Instant>,
}

impl ActivationPolicy {
    pub const fn new(grace: Duration) -> Self {
        Self {
            grace,
            last_reverse: None,
        }
    }

    /// Evaluate one poll.
    pub fn evaluate(&mut self, reverse: bool, inputs: ActivationInputs, now: Instant) -> bool {
        if reverse {
            self.last_reverse = Some(now);
        }
        let desired = (reverse && inputs.auto_start) || inputs.manual_override;
        let in_grace = self
            .last_reverse
            .is_some_and(|t| now.saturating_duration_since(t) < self.grace);
        desired || in_grace
    }
}

pub struct ActivationManager {
    policy: ActivationPolicy,
    reverse_sense: Box<dyn InputPin>,
    reverse_active_low: bool,
    sensor_power: Box<dyn OutputPin>,
    poll: Duration,
    state: Arc<StateManager>,
    bus: Arc<SignalBus>,
    active: bool,
    /// Shared-state copy of `active` not yet written.
    mirror_pending: bool,
    /// Last inputs read successfully; reused when the state lock times out.
    inputs: Option<ActivationInputs>,
}

impl ActivationManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reverse_sense: Box<dyn InputPin>,
        reverse_active_low: bool,
        mut sensor_power: Box<dyn OutputPin>,
        grace: Duration,
        poll: Duration,
        state: Arc<StateManager>,
        bus: Arc<SignalBus>,
    ) -> Self {
        sensor_power.set_level(false);
        Self {
            policy: ActivationPolicy::new(grace),
            reverse_sense,
            reverse_active_low,
            sensor_power,
            poll,
            state,
            bus,
            active: false,
            mirror_pending: false,
            inputs: None,
        }
    }

    /// True while the reverse line is at its active level.
    fn reverse_engaged(&self) -> bool {
        self.reverse_sense.is_high() != self.reverse_active_low
    }

    /// One poll. Returns the decision.
    pub fn step(&mut self, now: Instant) -> bool {
        let reverse = self.reverse_engaged();
        match self.state.activation_inputs(LOCK_TIMEOUT_NORMAL) {
            Ok(inputs) => self.inputs = Some(inputs),
            Err(e) => debug!("Activation inputs stale: {e}"),
        }
        let inputs = self.inputs.unwrap_or(ActivationInputs {
            auto_start: false,
            manual_override: false,
        });

        let decision = self.policy.evaluate(reverse, inputs, now);
        if decision != self.active {
            self.apply(decision, reverse, inputs);
        }
        if self.mirror_pending {
            self.mirror();
        }
        decision
    }

    fn apply(&mut self, active: bool, reverse: bool, inputs: ActivationInputs) {
        self.active = active;
        if active {
            info!(
                "Parking assist activating (reverse={}, auto_start={}, manual={})",
                reverse, inputs.auto_start, inputs.manual_override
            );
            self.sensor_power.set_level(true);
            self.bus.set(Signal::SubsystemActive);
        } else {
            info!("Parking assist deactivating");
            self.sensor_power.set_level(false);
            self.bus.clear(Signal::SubsystemActive);
        }
        self.mirror_pending = true;
    }

    /// Retried every poll until the state lock is obtained.
    fn mirror(&mut self) {
        match self.state.set_subsystem_active(self.active, LOCK_TIMEOUT_NORMAL) {
            Ok(()) => self.mirror_pending = false,
            Err(e) => warn!("Could not mirror activation into state: {e}"),
        }
    }

    /// Manager loop. Returns on shutdown with the sensors powered down.
    pub fn run(&mut self) {
        info!("Activation manager started (poll {:?}, grace {:?})", self.poll, self.policy.grace);
        loop {
            self.step(Instant::now());
            if !self.bus.sleep(self.poll) {
                break;
            }
        }
        self.sensor_power.set_level(false);
        self.bus.clear(Signal::SubsystemActive);
        if self.active {
            self.active = false;
            self.mirror();
        }
        info!("Activation manager stopped");
    }
}
