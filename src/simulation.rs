//! Discrete-time simulation loop.
//!
//! Each step runs, in order:
//! 1. the controller decides a header class,
//! 2. the receiver processes the packet using the channel state it was sent in,
//! 3. the channel advances one Markov step,
//! 4. for controllers that consume observations, the estimator reads the new
//!    channel state and the controller updates its belief.
//!
//! The channel and the estimator draw from separate generators seeded from
//! the same configuration seed. A timer run and a belief run with equal seeds
//! therefore see the identical channel realization.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::channel::GilbertElliottChannel;
use crate::config::SimConfig;
use crate::controllers::{BeliefController, TimerController};
use crate::error::{ConfigError, SimError};
use crate::estimator::ChannelEstimator;
use crate::receiver::{ReceiverState, SynchronizationReceiver};
use crate::traits::HeaderController;
use crate::types::{ChannelState, DecisionKind};

/// Everything observable about one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub step: usize,
    pub decision: DecisionKind,
    /// Channel state the packet was sent in.
    pub channel_before: ChannelState,
    pub channel_after: ChannelState,
    /// Estimator reading of `channel_after`, for belief-driven runs.
    pub observation: Option<ChannelState>,
    /// Receiver state after processing the packet.
    pub receiver: ReceiverState,
    pub consecutive_loss: usize,
    /// Belief after the update, for belief-driven runs.
    pub belief: Option<Vec<f64>>,
}

/// Complete record of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationTrace {
    controller: &'static str,
    initial_channel: ChannelState,
    initial_receiver: ReceiverState,
    steps: Vec<StepRecord>,
}

impl SimulationTrace {
    /// Assembles a trace, checking that consecutive steps chain together.
    ///
    /// # Panics
    /// If step indices are not `0..N` or a step's `channel_before` differs
    /// from the previous step's `channel_after`.
    pub fn new(
        controller: &'static str,
        initial_channel: ChannelState,
        initial_receiver: ReceiverState,
        steps: Vec<StepRecord>,
    ) -> Self {
        let mut channel = initial_channel;
        for (index, record) in steps.iter().enumerate() {
            assert_eq!(record.step, index, "trace step indices must be dense");
            assert_eq!(
                record.channel_before, channel,
                "step {} does not start in the previous step's channel state",
                index
            );
            channel = record.channel_after;
        }

        let trace = Self {
            controller,
            initial_channel,
            initial_receiver,
            steps,
        };
        assert_eq!(trace.channel_states().len(), trace.len() + 1);
        assert_eq!(trace.receiver_states().len(), trace.len() + 1);
        trace
    }

    /// Name of the controller that produced the trace.
    pub fn controller(&self) -> &'static str {
        self.controller
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn initial_channel(&self) -> ChannelState {
        self.initial_channel
    }

    pub fn initial_receiver(&self) -> ReceiverState {
        self.initial_receiver
    }

    /// Decision of every step.
    pub fn decisions(&self) -> Vec<DecisionKind> {
        self.steps.iter().map(|record| record.decision).collect()
    }

    /// Initial channel state followed by the state after every step (N + 1 entries).
    pub fn channel_states(&self) -> Vec<ChannelState> {
        std::iter::once(self.initial_channel)
            .chain(self.steps.iter().map(|record| record.channel_after))
            .collect()
    }

    /// Initial receiver state followed by the state after every step (N + 1 entries).
    pub fn receiver_states(&self) -> Vec<ReceiverState> {
        std::iter::once(self.initial_receiver)
            .chain(self.steps.iter().map(|record| record.receiver))
            .collect()
    }
}

/// One simulation run: channel, estimator, receiver and a controller.
#[derive(Debug)]
pub struct Simulation<C: HeaderController> {
    steps: usize,
    channel: GilbertElliottChannel,
    estimator: ChannelEstimator,
    receiver: SynchronizationReceiver,
    controller: C,
    channel_rng: StdRng,
    estimator_rng: StdRng,
}

impl<C: HeaderController> Simulation<C> {
    /// Prepares a run: validates `config`, draws the initial channel state and
    /// resets the receiver and the controller.
    ///
    /// # Errors
    /// - [`SimError::Config`] - The configuration is invalid, or the controller
    ///   models a state dimension other than `4 + W`
    pub fn new(config: &SimConfig, mut controller: C) -> Result<Self, SimError> {
        config.validate()?;
        if let Some(got) = controller.state_dimension() {
            let expected = config.state_dimension();
            if got != expected {
                warn!(
                    controller = controller.name(),
                    expected, got, "Controller does not match the receiver window"
                );
                return Err(ConfigError::DimensionMismatch {
                    what: "controller",
                    expected,
                    got,
                }
                .into());
            }
        }

        let (p_good_to_bad, p_bad_to_good) = config.channel.transition_probabilities()?;
        let mut channel = GilbertElliottChannel::new(p_good_to_bad, p_bad_to_good)?;
        let mut channel_rng = StdRng::seed_from_u64(config.seed);
        channel.initialize(&mut channel_rng);

        let estimator = ChannelEstimator::from_params(&config.estimator)?;
        let estimator_rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
        let receiver = SynchronizationReceiver::new(config.window_capacity)?;
        controller.reset();

        Ok(Self {
            steps: config.steps,
            channel,
            estimator,
            receiver,
            controller,
            channel_rng,
            estimator_rng,
        })
    }

    /// Executes one step.
    ///
    /// # Errors
    /// - [`SimError::Model`] - The controller could not incorporate the observation
    pub fn step(&mut self, step: usize) -> Result<StepRecord, SimError> {
        let decision = self.controller.decide();
        let channel_before = self.channel.state();
        let receiver = self.receiver.update(channel_before.is_good(), decision);
        self.channel.advance(&mut self.channel_rng);
        let channel_after = self.channel.state();

        let observation = if self.controller.needs_observation() {
            let observation = self.estimator.observe(&self.channel, &mut self.estimator_rng);
            self.controller
                .observe(decision, observation)
                .map_err(|source| SimError::Model { step, source })?;
            Some(observation)
        } else {
            None
        };

        trace!(
            step,
            decision = %decision,
            channel = %channel_before,
            receiver = ?receiver,
            "Step complete"
        );

        Ok(StepRecord {
            step,
            decision,
            channel_before,
            channel_after,
            observation,
            receiver,
            consecutive_loss: receiver.consecutive_loss(),
            belief: self
                .controller
                .belief()
                .map(|belief| belief.as_slice().to_vec()),
        })
    }

    /// Runs every configured step and returns the trace.
    ///
    /// # Errors
    /// - [`SimError::Model`] - A belief update failed; the run stops at that step
    pub fn run(&mut self) -> Result<SimulationTrace, SimError> {
        let initial_channel = self.channel.state();
        let initial_receiver = self.receiver.state();
        debug!(
            controller = self.controller.name(),
            steps = self.steps,
            initial_channel = %initial_channel,
            "Starting simulation run"
        );

        let records = (0..self.steps)
            .map(|step| self.step(step))
            .collect::<Result<Vec<_>, _>>()?;

        let trace = SimulationTrace::new(
            self.controller.name(),
            initial_channel,
            initial_receiver,
            records,
        );
        debug!(
            controller = self.controller.name(),
            final_receiver = ?self.receiver.state(),
            "Simulation run finished"
        );
        Ok(trace)
    }

    pub fn channel(&self) -> &GilbertElliottChannel {
        &self.channel
    }

    pub fn receiver(&self) -> &SynchronizationReceiver {
        &self.receiver
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }
}

impl Simulation<TimerController> {
    /// Prepares a run of the timer-driven compressor.
    ///
    /// # Errors
    /// - [`SimError::Config`] - The configuration is invalid
    pub fn timer(config: &SimConfig) -> Result<Self, SimError> {
        let controller = TimerController::new(config.timer)?;
        Self::new(config, controller)
    }
}

impl Simulation<BeliefController> {
    /// Prepares a run of the belief-driven compressor, loading its policy file.
    ///
    /// # Errors
    /// - [`SimError::Config`] - The configuration is invalid or has no policy path
    /// - [`SimError::Policy`] - The policy file cannot be read or decoded
    pub fn belief(config: &SimConfig) -> Result<Self, SimError> {
        let controller = BeliefController::from_config(config)?;
        Self::new(config, controller)
    }
}
