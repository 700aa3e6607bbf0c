//! Open-loop, timeout-driven compressor.
//!
//! Starts on Full headers and switches class whenever it has spent the
//! configured number of steps in the current one:
//! Full -> Minimal -> Partial -> Minimal -> Partial -> ...

use tracing::{debug, trace};

use crate::config::TimerThresholds;
use crate::error::ConfigError;
use crate::traits::HeaderController;
use crate::types::DecisionKind;

/// Timer-driven header controller.
#[derive(Debug, Clone)]
pub struct TimerController {
    thresholds: TimerThresholds,
    current: DecisionKind,
    steps_in_current: u32,
}

impl TimerController {
    /// Creates a controller starting on Full headers.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidTimerThreshold`] - A threshold is zero
    pub fn new(thresholds: TimerThresholds) -> Result<Self, ConfigError> {
        thresholds.validate()?;
        Ok(Self {
            thresholds,
            current: DecisionKind::Full,
            steps_in_current: 0,
        })
    }

    /// Decision the next call to `decide` will return.
    #[inline]
    pub fn current(&self) -> DecisionKind {
        self.current
    }

    #[inline]
    pub fn steps_in_current(&self) -> u32 {
        self.steps_in_current
    }

    #[inline]
    pub fn thresholds(&self) -> &TimerThresholds {
        &self.thresholds
    }

    /// Timeout and successor of a decision class.
    fn schedule(&self, decision: DecisionKind) -> (u32, DecisionKind) {
        match decision {
            DecisionKind::Full => (self.thresholds.full_to_minimal, DecisionKind::Minimal),
            DecisionKind::Minimal => (self.thresholds.minimal_to_partial, DecisionKind::Partial),
            DecisionKind::Partial => (self.thresholds.partial_to_minimal, DecisionKind::Minimal),
        }
    }
}

impl HeaderController for TimerController {
    fn name(&self) -> &'static str {
        "timer"
    }

    fn decide(&mut self) -> DecisionKind {
        let decision = self.current;
        self.steps_in_current += 1;

        let (timeout, successor) = self.schedule(decision);
        if self.steps_in_current >= timeout {
            trace!(from = %decision, to = %successor, "Timer expired");
            self.current = successor;
            self.steps_in_current = 0;
        }
        decision
    }

    fn reset(&mut self) {
        debug!("Resetting timer controller");
        self.current = DecisionKind::Full;
        self.steps_in_current = 0;
    }
}
