//! Noisy channel-state estimator.
//!
//! The estimator is the belief controller's only window on the link. It reads
//! the true channel state through a shared borrow and corrupts it with fixed
//! false-alarm and miss-detection probabilities.

use rand::Rng;

use crate::channel::GilbertElliottChannel;
use crate::config::{EstimatorParams, ensure_rate};
use crate::error::ConfigError;
use crate::types::ChannelState;

/// Binary sensor over a [`GilbertElliottChannel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelEstimator {
    false_alarm_rate: f64,
    miss_detection_rate: f64,
}

impl ChannelEstimator {
    /// Creates an estimator with the given error rates.
    ///
    /// # Errors
    /// - [`ConfigError::ProbabilityOutOfRange`] - A rate lies outside [0, 1)
    pub fn new(false_alarm_rate: f64, miss_detection_rate: f64) -> Result<Self, ConfigError> {
        ensure_rate("false_alarm_rate", false_alarm_rate)?;
        ensure_rate("miss_detection_rate", miss_detection_rate)?;
        Ok(Self {
            false_alarm_rate,
            miss_detection_rate,
        })
    }

    /// Creates an estimator from configuration parameters.
    ///
    /// # Errors
    /// - [`ConfigError::ProbabilityOutOfRange`] - A rate lies outside [0, 1)
    pub fn from_params(params: &EstimatorParams) -> Result<Self, ConfigError> {
        Self::new(params.false_alarm_rate, params.miss_detection_rate)
    }

    /// Reports an estimate of the channel's current state.
    ///
    /// Good is reported with probability `1 - false_alarm_rate` when the link
    /// is Good and with probability `miss_detection_rate` when it is Bad.
    pub fn observe<R: Rng>(&self, channel: &GilbertElliottChannel, rng: &mut R) -> ChannelState {
        let draw: f64 = rng.random();
        let reports_good = match channel.state() {
            ChannelState::Good => draw >= self.false_alarm_rate,
            ChannelState::Bad => draw < self.miss_detection_rate,
        };
        ChannelState::from_good(reports_good)
    }

    /// Probability of reporting `observed` when the link is in `actual`.
    pub fn likelihood(&self, observed: ChannelState, actual: ChannelState) -> f64 {
        match (actual, observed) {
            (ChannelState::Good, ChannelState::Good) => 1.0 - self.false_alarm_rate,
            (ChannelState::Good, ChannelState::Bad) => self.false_alarm_rate,
            (ChannelState::Bad, ChannelState::Good) => self.miss_detection_rate,
            (ChannelState::Bad, ChannelState::Bad) => 1.0 - self.miss_detection_rate,
        }
    }

    #[inline]
    pub fn false_alarm_rate(&self) -> f64 {
        self.false_alarm_rate
    }

    #[inline]
    pub fn miss_detection_rate(&self) -> f64 {
        self.miss_detection_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn perfect_estimator_reports_truth() {
        let estimator = ChannelEstimator::new(0.0, 0.0).unwrap();
        let mut channel = GilbertElliottChannel::new(0.3, 0.3).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            channel.advance(&mut rng);
            assert_eq!(estimator.observe(&channel, &mut rng), channel.state());
        }
    }

    #[test]
    fn false_alarm_frequency_matches_rate() {
        let estimator = ChannelEstimator::new(0.25, 0.0).unwrap();
        let mut channel = GilbertElliottChannel::new(0.5, 0.5).unwrap();
        channel.set_state(ChannelState::Good);
        let mut rng = StdRng::seed_from_u64(99);

        let draws = 20_000;
        let false_alarms = (0..draws)
            .filter(|_| estimator.observe(&channel, &mut rng) == ChannelState::Bad)
            .count();
        let rate = false_alarms as f64 / draws as f64;
        assert!((rate - 0.25).abs() < 0.02, "false alarm rate {}", rate);
    }

    #[test]
    fn likelihood_rows_sum_to_one() {
        let estimator = ChannelEstimator::new(0.1, 0.2).unwrap();
        for actual in ChannelState::ALL {
            let sum: f64 = ChannelState::ALL
                .iter()
                .map(|&observed| estimator.likelihood(observed, actual))
                .sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_rate_of_one() {
        assert!(ChannelEstimator::new(0.1, 1.0).is_err());
        assert!(ChannelEstimator::new(-0.1, 0.0).is_err());
    }
}
