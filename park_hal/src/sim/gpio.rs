//! Digital lines.

use park_common::hal::driver::{InputPin, OutputPin};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[derive(Debug, Default)]
struct LineState {
    level: AtomicBool,
    transitions: AtomicU32,
}

/// Shared electrical level with a transition counter.
#[derive(Debug, Clone, Default)]
pub struct SimLine(Arc<LineState>);

impl SimLine {
    /// Line starting at `level`.
    pub fn new(level: bool) -> Self {
        let line = Self::default();
        line.0.level.store(level, Ordering::SeqCst);
        line
    }

    /// Drive the line; counts a transition if the level changes.
    pub fn set(&self, high: bool) {
        if self.0.level.swap(high, Ordering::SeqCst) != high {
            self.0.transitions.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Current level.
    pub fn is_high(&self) -> bool {
        self.0.level.load(Ordering::SeqCst)
    }

    /// Number of level changes so far.
    pub fn transitions(&self) -> u32 {
        self.0.transitions.load(Ordering::SeqCst)
    }
}

/// Input pin reading a [`SimLine`].
pub struct SimInput {
    line: SimLine,
}

impl SimInput {
    /// Wrap a line.
    pub fn new(line: SimLine) -> Self {
        Self { line }
    }
}

impl InputPin for SimInput {
    fn is_high(&self) -> bool {
        self.line.is_high()
    }
}

/// Output pin driving a [`SimLine`].
pub struct SimOutput {
    line: SimLine,
}

impl SimOutput {
    /// Wrap a line.
    pub fn new(line: SimLine) -> Self {
        Self { line }
    }
}

impl OutputPin for SimOutput {
    fn set_level(&mut self, high: bool) {
        self.line.set(high);
    }
}

/// Gear-lever view of the reverse sense line, hiding its polarity.
#[derive(Debug, Clone)]
pub struct ReverseLever {
    line: SimLine,
    active_low: bool,
}

impl ReverseLever {
    /// Lever over `line` with the given polarity.
    pub fn new(line: SimLine, active_low: bool) -> Self {
        Self { line, active_low }
    }

    /// Engage or release reverse gear.
    pub fn set_engaged(&self, engaged: bool) {
        self.line.set(engaged != self.active_low);
    }

    /// True while reverse is engaged.
    pub fn is_engaged(&self) -> bool {
        self.line.is_high() != self.active_low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_counts_transitions_only_on_change() {
        let line = SimLine::new(false);
        let mut out = SimOutput::new(line.clone());
        out.set_level(true);
        out.set_level(true);
        out.set_level(false);
        assert_eq!(line.transitions(), 2);
        assert!(!line.is_high());
    }

    #[test]
    fn active_low_lever_pulls_line_low() {
        let line = SimLine::new(true);
        let lever = ReverseLever::new(line.clone(), true);
        let input = SimInput::new(line);
        assert!(!lever.is_engaged());
        lever.set_engaged(true);
        assert!(!input.is_high());
        assert!(lever.is_engaged());
    }
}
