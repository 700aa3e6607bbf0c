//! Transition and observation models of the compressor's POMDP.
//!
//! Both models are derived once from the configured channel, estimator and
//! window capacity and never change afterwards. Next-state rows are produced
//! by running [`ReceiverState::next`] against every possible next channel
//! state, so the model reproduces the simulated receiver rule for rule.

use crate::channel::GilbertElliottChannel;
use crate::estimator::ChannelEstimator;
use crate::pomdp::state::AugmentedState;
use crate::receiver::ReceiverState;
use crate::types::{ChannelState, DecisionKind};

/// `P(next state | state, decision)`, one row-stochastic matrix per decision.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionModel {
    dimension: usize,
    /// Row-major `dimension x dimension` matrices indexed by [`DecisionKind::index`].
    matrices: [Vec<f64>; 3],
}

impl TransitionModel {
    /// Builds the model for window capacity `W` over `channel`'s dynamics.
    ///
    /// A state's packet is carried by the *next* channel state: from
    /// (receiver, c), each next channel c' contributes `P(c -> c')` to the
    /// state (receiver.next(c' == Good, decision), c').
    pub fn build(window_capacity: usize, channel: &GilbertElliottChannel) -> Self {
        let dimension = AugmentedState::dimension(window_capacity);
        let matrices = DecisionKind::ALL.map(|decision| {
            let mut matrix = vec![0.0; dimension * dimension];
            for from in AugmentedState::all(window_capacity) {
                let row = &mut matrix[from.index() * dimension..(from.index() + 1) * dimension];
                for next_channel in ChannelState::ALL {
                    let probability = channel.transition_probability(from.channel(), next_channel);
                    let next_receiver: ReceiverState =
                        from.receiver()
                            .next(next_channel.is_good(), decision, window_capacity);
                    let to = AugmentedState::from_parts(next_receiver, next_channel);
                    row[to.index()] += probability;
                }
            }
            matrix
        });

        Self {
            dimension,
            matrices,
        }
    }

    /// Number of augmented states.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Transition probabilities out of state index `from` under `decision`.
    pub fn row(&self, decision: DecisionKind, from: usize) -> &[f64] {
        let matrix = &self.matrices[decision.index()];
        &matrix[from * self.dimension..(from + 1) * self.dimension]
    }

    /// `P(to | from, decision)` for state indices.
    pub fn probability(&self, decision: DecisionKind, from: usize, to: usize) -> f64 {
        self.row(decision, from)[to]
    }

    /// Prediction step: `out[s'] = Σ_s belief[s] · T[decision][s][s']`.
    pub fn predict(&self, decision: DecisionKind, belief: &[f64], out: &mut [f64]) {
        debug_assert_eq!(belief.len(), self.dimension);
        debug_assert_eq!(out.len(), self.dimension);

        out.iter_mut().for_each(|value| *value = 0.0);
        for (from, &mass) in belief.iter().enumerate() {
            if mass == 0.0 {
                continue;
            }
            for (value, &probability) in out.iter_mut().zip(self.row(decision, from)) {
                *value += mass * probability;
            }
        }
    }

    /// Largest deviation of any row sum from one, across all decisions.
    pub fn max_row_sum_error(&self) -> f64 {
        DecisionKind::ALL
            .iter()
            .flat_map(|&decision| {
                (0..self.dimension).map(move |from| {
                    let sum: f64 = self.row(decision, from).iter().sum();
                    (sum - 1.0).abs()
                })
            })
            .fold(0.0, f64::max)
    }
}

/// `P(observation | state)` for the two estimator outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationModel {
    /// Likelihood vectors for "observed Bad" and "observed Good", in that order.
    likelihoods: [Vec<f64>; 2],
}

impl ObservationModel {
    /// Builds the observation likelihoods for window capacity `W`.
    ///
    /// States whose channel is Bad report Bad with probability
    /// `1 - miss_detection_rate`; states whose channel is Good report Bad with
    /// probability `false_alarm_rate`.
    pub fn build(window_capacity: usize, estimator: &ChannelEstimator) -> Self {
        let likelihoods = ChannelState::ALL.map(|observed| {
            AugmentedState::all(window_capacity)
                .map(|state| estimator.likelihood(observed, state.channel()))
                .collect()
        });
        Self { likelihoods }
    }

    /// Uses explicit likelihood vectors for the Bad and Good observations.
    pub fn from_likelihoods(observed_bad: Vec<f64>, observed_good: Vec<f64>) -> Self {
        debug_assert_eq!(observed_bad.len(), observed_good.len());
        Self {
            likelihoods: [observed_bad, observed_good],
        }
    }

    /// Number of augmented states covered.
    pub fn dimension(&self) -> usize {
        self.likelihoods[0].len()
    }

    /// Likelihood vector of one observation over all states.
    pub fn likelihoods(&self, observed: ChannelState) -> &[f64] {
        match observed {
            ChannelState::Bad => &self.likelihoods[0],
            ChannelState::Good => &self.likelihoods[1],
        }
    }

    /// `P(observed | state index)`.
    pub fn likelihood(&self, observed: ChannelState, state: usize) -> f64 {
        self.likelihoods(observed)[state]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = 8;
    const P_GB: f64 = 0.125;
    const P_BG: f64 = 0.25;

    fn model() -> TransitionModel {
        let channel = GilbertElliottChannel::new(P_GB, P_BG).unwrap();
        TransitionModel::build(W, &channel)
    }

    fn index(state: AugmentedState) -> usize {
        state.index()
    }

    const NC_B: AugmentedState = AugmentedState::NoContext(ChannelState::Bad);
    const NC_G: AugmentedState = AugmentedState::NoContext(ChannelState::Good);
    const SC_B: AugmentedState = AugmentedState::StaticContext(ChannelState::Bad);
    const SC_G: AugmentedState = AugmentedState::StaticContext(ChannelState::Good);

    fn fc(consecutive_loss: usize) -> AugmentedState {
        AugmentedState::FullContext { consecutive_loss }
    }

    #[test]
    fn every_matrix_is_row_stochastic() {
        assert!(model().max_row_sum_error() < 1e-12);
    }

    #[test]
    fn full_always_synchronizes_on_good_reception() {
        let model = model();
        for from in AugmentedState::all(W) {
            let p_good = if from.channel().is_good() {
                1.0 - P_GB
            } else {
                P_BG
            };
            let p = model.probability(DecisionKind::Full, from.index(), index(fc(0)));
            assert!((p - p_good).abs() < 1e-12, "from {:?}", from);
        }
    }

    #[test]
    fn no_context_rows_match_receiver_rules() {
        let model = model();
        // Bad next channel: stays NoContext for every decision.
        for decision in DecisionKind::ALL {
            let p = model.probability(decision, index(NC_B), index(NC_B));
            assert!((p - (1.0 - P_BG)).abs() < 1e-12);
            let p = model.probability(decision, index(NC_G), index(NC_B));
            assert!((p - P_GB).abs() < 1e-12);
        }
        // Good next channel: Partial acquires static context, Minimal cannot decode.
        let p = model.probability(DecisionKind::Partial, index(NC_G), index(SC_G));
        assert!((p - (1.0 - P_GB)).abs() < 1e-12);
        let p = model.probability(DecisionKind::Minimal, index(NC_B), index(NC_G));
        assert!((p - P_BG).abs() < 1e-12);
    }

    #[test]
    fn static_context_rows_match_receiver_rules() {
        let model = model();
        for decision in [DecisionKind::Partial, DecisionKind::Minimal] {
            let p = model.probability(decision, index(SC_B), index(fc(0)));
            assert!((p - P_BG).abs() < 1e-12);
            let p = model.probability(decision, index(SC_G), index(SC_B));
            assert!((p - P_GB).abs() < 1e-12);
        }
    }

    #[test]
    fn full_context_chain_advances_and_degrades() {
        let model = model();
        for decision in DecisionKind::ALL {
            let p = model.probability(decision, index(fc(0)), index(fc(1)));
            assert!((p - P_GB).abs() < 1e-12);
            for loss in 1..(W - 1) {
                let p = model.probability(decision, index(fc(loss)), index(fc(loss + 1)));
                assert!((p - (1.0 - P_BG)).abs() < 1e-12);
                let p = model.probability(decision, index(fc(loss)), index(fc(0)));
                assert!((p - P_BG).abs() < 1e-12);
            }
            let p = model.probability(decision, index(fc(W - 1)), index(SC_B));
            assert!((p - (1.0 - P_BG)).abs() < 1e-12);
        }
    }

    #[test]
    fn predict_preserves_total_mass() {
        let model = model();
        let mut belief = vec![0.0; model.dimension()];
        belief[0] = 0.4;
        belief[5] = 0.6;
        let mut predicted = vec![0.0; model.dimension()];
        model.predict(DecisionKind::Minimal, &belief, &mut predicted);
        let sum: f64 = predicted.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn observation_likelihoods_follow_channel_component() {
        let estimator = ChannelEstimator::new(0.1, 0.2).unwrap();
        let model = ObservationModel::build(W, &estimator);
        assert!((model.likelihood(ChannelState::Bad, index(NC_B)) - 0.8).abs() < 1e-12);
        assert!((model.likelihood(ChannelState::Bad, index(SC_G)) - 0.1).abs() < 1e-12);
        assert!((model.likelihood(ChannelState::Good, index(fc(0))) - 0.9).abs() < 1e-12);
        assert!((model.likelihood(ChannelState::Good, index(fc(3))) - 0.2).abs() < 1e-12);
        for state in 0..AugmentedState::dimension(W) {
            let sum = model.likelihood(ChannelState::Bad, state)
                + model.likelihood(ChannelState::Good, state);
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }
}
