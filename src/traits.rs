//! Core behavioral traits of the simulator.
//!
//! Compressor strategies share one interface so the simulation loop can drive
//! either of them without knowing which one it runs.

use std::fmt::Debug;

use crate::error::ModelError;
use crate::pomdp::Belief;
use crate::types::{ChannelState, DecisionKind};

/// Defines the interface of a compressor's header-selection strategy.
///
/// The loop calls [`decide`](HeaderController::decide) once per step and, for
/// controllers that ask for it, feeds the estimator's reading back through
/// [`observe`](HeaderController::observe) after the channel has advanced.
pub trait HeaderController: Debug + Send {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Header class for the next packet.
    fn decide(&mut self) -> DecisionKind;

    /// Returns the controller to its session-start state.
    fn reset(&mut self);

    /// Returns `true` if the controller consumes estimator readings.
    ///
    /// The loop only draws from the estimator's random stream when this is
    /// `true`.
    fn needs_observation(&self) -> bool {
        false
    }

    /// Incorporates the estimator's reading after sending `decision`.
    ///
    /// # Errors
    /// - [`ModelError`] - The controller's internal model cannot explain the reading
    fn observe(
        &mut self,
        _decision: DecisionKind,
        _observation: ChannelState,
    ) -> Result<(), ModelError> {
        Ok(())
    }

    /// Dimension `4 + W` of the hidden state the controller models, if any.
    ///
    /// A run rejects a controller whose dimension differs from its receiver's.
    fn state_dimension(&self) -> Option<usize> {
        None
    }

    /// Current belief, for controllers that maintain one.
    fn belief(&self) -> Option<&Belief> {
        None
    }
}
