//! Belief-state compressor driven by an alpha-vector policy.

use std::path::Path;

use tracing::{debug, trace};

use crate::channel::GilbertElliottChannel;
use crate::config::SimConfig;
use crate::error::{ConfigError, ModelError, SimError};
use crate::estimator::ChannelEstimator;
use crate::pomdp::{AugmentedState, Belief, ObservationModel, PolicySet, TransitionModel};
use crate::traits::HeaderController;
use crate::types::{ChannelState, DecisionKind};

/// Header controller that tracks a belief over the receiver and the link and
/// acts on a precomputed policy.
#[derive(Debug, Clone)]
pub struct BeliefController {
    window_capacity: usize,
    steady_state_bad: f64,
    transitions: TransitionModel,
    observations: ObservationModel,
    policy: PolicySet,
    belief: Belief,
}

impl BeliefController {
    /// Creates a controller for window capacity `W`.
    ///
    /// # Parameters
    /// - `window_capacity`: W-LSB window capacity `W`
    /// - `channel`: Link whose transition probabilities the model assumes
    /// - `estimator`: Sensor whose error rates the model assumes
    /// - `policy`: Policy over `4 + W` states
    ///
    /// # Errors
    /// - [`ConfigError::InvalidWindowCapacity`] - `W` is zero
    /// - [`ConfigError::DimensionMismatch`] - The policy is not over `4 + W` states
    pub fn new(
        window_capacity: usize,
        channel: &GilbertElliottChannel,
        estimator: &ChannelEstimator,
        policy: PolicySet,
    ) -> Result<Self, ConfigError> {
        crate::config::validate_window_capacity(window_capacity)?;
        let dimension = AugmentedState::dimension(window_capacity);
        if policy.dimension() != dimension {
            return Err(ConfigError::DimensionMismatch {
                what: "policy",
                expected: dimension,
                got: policy.dimension(),
            });
        }

        let steady_state_bad = channel.steady_state_bad();
        Ok(Self {
            window_capacity,
            steady_state_bad,
            transitions: TransitionModel::build(window_capacity, channel),
            observations: ObservationModel::build(window_capacity, estimator),
            policy,
            belief: Belief::initial(dimension, steady_state_bad),
        })
    }

    /// Creates a controller from a policy file.
    ///
    /// # Errors
    /// - [`SimError::Policy`] - The policy file cannot be read or decoded
    /// - [`SimError::Config`] - Any error of [`BeliefController::new`]
    pub fn from_policy_file(
        window_capacity: usize,
        channel: &GilbertElliottChannel,
        estimator: &ChannelEstimator,
        path: impl AsRef<Path>,
    ) -> Result<Self, SimError> {
        let policy = PolicySet::load(path, AugmentedState::dimension(window_capacity))?;
        Ok(Self::new(window_capacity, channel, estimator, policy)?)
    }

    /// Creates a controller from a validated configuration and its policy path.
    ///
    /// # Errors
    /// - [`SimError::Config`] - Invalid parameters or no policy path
    /// - [`SimError::Policy`] - The policy file cannot be read or decoded
    pub fn from_config(config: &SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let path = config.require_policy_path()?;
        let (p_good_to_bad, p_bad_to_good) = config.channel.transition_probabilities()?;
        let channel = GilbertElliottChannel::new(p_good_to_bad, p_bad_to_good)?;
        let estimator = ChannelEstimator::from_params(&config.estimator)?;
        Self::from_policy_file(config.window_capacity, &channel, &estimator, path)
    }

    /// Filter step after sending `decision` and reading `observation`.
    ///
    /// # Errors
    /// - [`ModelError::DegenerateObservation`] - The reading has zero
    ///   likelihood; the belief is left unchanged
    pub fn update_belief(
        &mut self,
        decision: DecisionKind,
        observation: ChannelState,
    ) -> Result<(), ModelError> {
        self.belief
            .update(&self.transitions, &self.observations, decision, observation)?;
        trace!(
            decision = %decision,
            observation = %observation,
            full_context = self.belief.full_context_mass(),
            "Belief updated"
        );
        Ok(())
    }

    /// Expected value of every policy piece under the current belief.
    pub fn expected_values(&self) -> Vec<f64> {
        self.policy.expected_values(&self.belief)
    }

    /// Replaces the belief, e.g. to start from a known receiver state.
    ///
    /// # Errors
    /// - [`ConfigError::DimensionMismatch`] - The belief is not over `4 + W` states
    pub fn set_belief(&mut self, belief: Belief) -> Result<(), ConfigError> {
        let expected = AugmentedState::dimension(self.window_capacity);
        if belief.dimension() != expected {
            return Err(ConfigError::DimensionMismatch {
                what: "belief",
                expected,
                got: belief.dimension(),
            });
        }
        self.belief = belief;
        Ok(())
    }

    #[inline]
    pub fn window_capacity(&self) -> usize {
        self.window_capacity
    }

    pub fn policy(&self) -> &PolicySet {
        &self.policy
    }

    pub fn transitions(&self) -> &TransitionModel {
        &self.transitions
    }

    pub fn observations(&self) -> &ObservationModel {
        &self.observations
    }
}

impl HeaderController for BeliefController {
    fn name(&self) -> &'static str {
        "belief"
    }

    fn decide(&mut self) -> DecisionKind {
        self.policy.decide(&self.belief)
    }

    fn reset(&mut self) {
        debug!(
            dimension = self.belief.dimension(),
            steady_state_bad = self.steady_state_bad,
            "Resetting belief controller"
        );
        self.belief = Belief::initial(self.belief.dimension(), self.steady_state_bad);
    }

    fn needs_observation(&self) -> bool {
        true
    }

    fn observe(
        &mut self,
        decision: DecisionKind,
        observation: ChannelState,
    ) -> Result<(), ModelError> {
        self.update_belief(decision, observation)
    }

    fn state_dimension(&self) -> Option<usize> {
        Some(AugmentedState::dimension(self.window_capacity))
    }

    fn belief(&self) -> Option<&Belief> {
        Some(&self.belief)
    }
}
