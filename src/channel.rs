//! Gilbert-Elliott link model.
//!
//! A two-state Markov chain (Good / Bad) that models bursty erasures on the
//! wireless link. The chain owns its state exclusively; randomness is drawn
//! from a caller-supplied generator so that runs are reproducible.

use rand::Rng;

use crate::config::ensure_open_probability;
use crate::error::ConfigError;
use crate::types::ChannelState;

/// Two-state Markov channel with fixed transition probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct GilbertElliottChannel {
    p_good_to_bad: f64,
    p_bad_to_good: f64,
    state: ChannelState,
}

impl GilbertElliottChannel {
    /// Creates a channel from its transition probabilities.
    ///
    /// The channel starts in [`ChannelState::Good`]; call [`initialize`](Self::initialize)
    /// to draw the starting state from the stationary distribution.
    ///
    /// # Errors
    /// - [`ConfigError::ProbabilityOutOfRange`] - Either probability is not strictly inside (0, 1)
    pub fn new(p_good_to_bad: f64, p_bad_to_good: f64) -> Result<Self, ConfigError> {
        ensure_open_probability("p_good_to_bad", p_good_to_bad)?;
        ensure_open_probability("p_bad_to_good", p_bad_to_good)?;
        Ok(Self {
            p_good_to_bad,
            p_bad_to_good,
            state: ChannelState::Good,
        })
    }

    /// Creates a channel from its mean erasure rate and mean bad-run length.
    ///
    /// Uses `p_bad_to_good = 1 / L` and `p_good_to_bad = (1 / L) / (1 / ε - 1)`,
    /// which yields a stationary bad probability of exactly `ε`.
    ///
    /// # Errors
    /// - [`ConfigError::ProbabilityOutOfRange`] - `ε` not in (0, 1), or the derived
    ///   good-to-bad probability is not in (0, 1)
    /// - [`ConfigError::InvalidBadRunLength`] - `L` is not greater than one
    pub fn from_erasure(
        mean_erasure_rate: f64,
        mean_bad_run_length: f64,
    ) -> Result<Self, ConfigError> {
        let (p_good_to_bad, p_bad_to_good) =
            erasure_to_transition(mean_erasure_rate, mean_bad_run_length)?;
        Self::new(p_good_to_bad, p_bad_to_good)
    }

    /// Draws the current state from the stationary distribution.
    pub fn initialize<R: Rng>(&mut self, rng: &mut R) {
        let draw: f64 = rng.random();
        self.state = ChannelState::from_good(draw < self.steady_state_good());
    }

    /// Performs one Markov transition.
    pub fn advance<R: Rng>(&mut self, rng: &mut R) {
        let draw: f64 = rng.random();
        self.state = match self.state {
            ChannelState::Good if draw < self.p_good_to_bad => ChannelState::Bad,
            ChannelState::Good => ChannelState::Good,
            ChannelState::Bad if draw < self.p_bad_to_good => ChannelState::Good,
            ChannelState::Bad => ChannelState::Bad,
        };
    }

    /// Current state of the link.
    #[inline]
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Overrides the current state.
    pub fn set_state(&mut self, state: ChannelState) {
        self.state = state;
    }

    /// Probability of leaving the Good state in one step.
    #[inline]
    pub fn p_good_to_bad(&self) -> f64 {
        self.p_good_to_bad
    }

    /// Probability of leaving the Bad state in one step.
    #[inline]
    pub fn p_bad_to_good(&self) -> f64 {
        self.p_bad_to_good
    }

    /// Stationary probability of the Bad state.
    pub fn steady_state_bad(&self) -> f64 {
        self.p_good_to_bad / (self.p_good_to_bad + self.p_bad_to_good)
    }

    /// Stationary probability of the Good state.
    pub fn steady_state_good(&self) -> f64 {
        self.p_bad_to_good / (self.p_good_to_bad + self.p_bad_to_good)
    }

    /// Probability of moving from `from` to `to` in one step.
    pub fn transition_probability(&self, from: ChannelState, to: ChannelState) -> f64 {
        match (from, to) {
            (ChannelState::Good, ChannelState::Good) => 1.0 - self.p_good_to_bad,
            (ChannelState::Good, ChannelState::Bad) => self.p_good_to_bad,
            (ChannelState::Bad, ChannelState::Good) => self.p_bad_to_good,
            (ChannelState::Bad, ChannelState::Bad) => 1.0 - self.p_bad_to_good,
        }
    }
}

/// Converts (mean erasure rate, mean bad-run length) into
/// `(p_good_to_bad, p_bad_to_good)`.
///
/// # Errors
/// - [`ConfigError::ProbabilityOutOfRange`] - `ε` not in (0, 1), or the derived
///   good-to-bad probability is not in (0, 1)
/// - [`ConfigError::InvalidBadRunLength`] - `L` is not greater than one
pub fn erasure_to_transition(
    mean_erasure_rate: f64,
    mean_bad_run_length: f64,
) -> Result<(f64, f64), ConfigError> {
    ensure_open_probability("mean_erasure_rate", mean_erasure_rate)?;
    if !(mean_bad_run_length.is_finite() && mean_bad_run_length > 1.0) {
        return Err(ConfigError::InvalidBadRunLength(mean_bad_run_length));
    }

    let p_bad_to_good = 1.0 / mean_bad_run_length;
    let p_good_to_bad = p_bad_to_good / (1.0 / mean_erasure_rate - 1.0);
    ensure_open_probability("p_good_to_bad", p_good_to_bad)?;
    Ok((p_good_to_bad, p_bad_to_good))
}
