//! Belief vector over the augmented hidden state and its Bayesian update.

use serde::Serialize;

use crate::constants::{FULL_CONTEXT_BASE_INDEX, PROBABILITY_SUM_TOLERANCE};
use crate::error::{ConfigError, ModelError};
use crate::pomdp::model::{ObservationModel, TransitionModel};
use crate::types::{ChannelState, DecisionKind};

/// Probability distribution over augmented states, indexed densely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Belief {
    probabilities: Vec<f64>,
}

impl Belief {
    /// Belief at session start: the receiver has no context and the channel
    /// is at its stationary distribution.
    ///
    /// # Parameters
    /// - `dimension`: Number of augmented states, `4 + W`
    /// - `steady_state_bad`: Stationary probability of the Bad channel state
    pub fn initial(dimension: usize, steady_state_bad: f64) -> Self {
        debug_assert!(dimension > FULL_CONTEXT_BASE_INDEX);
        let mut probabilities = vec![0.0; dimension];
        probabilities[0] = steady_state_bad;
        probabilities[1] = 1.0 - steady_state_bad;
        Self { probabilities }
    }

    /// Wraps an explicit probability vector after checking it.
    ///
    /// # Errors
    /// - [`ConfigError::DimensionMismatch`] - The vector is not of length `dimension`
    /// - [`ConfigError::ProbabilityOutOfRange`] - An entry is negative or not finite,
    ///   or the entries do not sum to one
    pub fn from_probabilities(
        probabilities: Vec<f64>,
        dimension: usize,
    ) -> Result<Self, ConfigError> {
        if probabilities.len() != dimension {
            return Err(ConfigError::DimensionMismatch {
                what: "belief",
                expected: dimension,
                got: probabilities.len(),
            });
        }
        if let Some(&value) = probabilities
            .iter()
            .find(|value| !value.is_finite() || **value < 0.0)
        {
            return Err(ConfigError::ProbabilityOutOfRange {
                name: "belief entry",
                value,
                expected: "[0, 1]",
            });
        }
        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(ConfigError::ProbabilityOutOfRange {
                name: "belief sum",
                value: sum,
                expected: "1",
            });
        }
        Ok(Self { probabilities })
    }

    /// One filter step after sending `decision` and observing `observation`.
    ///
    /// Predicts through the transition model, weights by the observation
    /// likelihood and renormalizes.
    ///
    /// # Errors
    /// - [`ModelError::DegenerateObservation`] - The observation has zero
    ///   probability under the predicted belief; the belief is left unchanged
    pub fn update(
        &mut self,
        transitions: &TransitionModel,
        observations: &ObservationModel,
        decision: DecisionKind,
        observation: ChannelState,
    ) -> Result<(), ModelError> {
        let mut posterior = vec![0.0; self.probabilities.len()];
        transitions.predict(decision, &self.probabilities, &mut posterior);

        let likelihoods = observations.likelihoods(observation);
        for (value, &likelihood) in posterior.iter_mut().zip(likelihoods) {
            *value *= likelihood;
        }

        let normalizer: f64 = posterior.iter().sum();
        if normalizer <= 0.0 || !normalizer.is_finite() {
            return Err(ModelError::DegenerateObservation {
                decision,
                observation,
            });
        }
        posterior.iter_mut().for_each(|value| *value /= normalizer);

        self.probabilities = posterior;
        Ok(())
    }

    /// Inner product with an alpha vector of the same length.
    pub fn expected_value(&self, alpha: &[f64]) -> f64 {
        debug_assert_eq!(alpha.len(), self.probabilities.len());
        self.probabilities
            .iter()
            .zip(alpha)
            .map(|(probability, value)| probability * value)
            .sum()
    }

    /// Probability mass on the FullContext states.
    pub fn full_context_mass(&self) -> f64 {
        self.probabilities[FULL_CONTEXT_BASE_INDEX..].iter().sum()
    }

    /// Returns `true` if every entry is nonnegative and the entries sum to one.
    pub fn is_valid(&self) -> bool {
        let sum: f64 = self.probabilities.iter().sum();
        self.probabilities.iter().all(|&value| value >= 0.0)
            && (sum - 1.0).abs() <= PROBABILITY_SUM_TOLERANCE
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.probabilities.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.probabilities
    }
}
