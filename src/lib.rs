//! `rohc_pomdp`: header-compression context synchronization over a lossy link.
//!
//! This library simulates a header compressor choosing, packet by packet,
//! between Full, Partial and Minimal headers while a decompressor tries to
//! keep its context synchronized across a bursty wireless link. Two compressor
//! strategies are provided: a timer-driven one and one that acts on a belief
//! over the decompressor's hidden state using a precomputed POMDP policy.
//!
//! ## Core Concepts
//!
//! - **[`GilbertElliottChannel`]**: Two-state Markov link (Good / Bad).
//! - **[`ChannelEstimator`]**: Noisy sensor of the link state.
//! - **[`SynchronizationReceiver`]**: Decompressor context state machine.
//! - **[`HeaderController`]**: Compressor strategy, implemented by
//!   [`TimerController`] and [`BeliefController`].
//! - **[`Simulation`]**: Runs the loop and produces a [`SimulationTrace`],
//!   summarized by [`SessionSummary`].
//!
//! ## Quick Start
//!
//! ```rust
//! use rohc_pomdp::{SessionSummary, SimConfig, Simulation};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SimConfig {
//!         seed: 42,
//!         steps: 200,
//!         ..Default::default()
//!     };
//!
//!     let trace = Simulation::timer(&config)?.run()?;
//!     assert_eq!(trace.len(), 200);
//!
//!     let summary = SessionSummary::from_trace(&trace, &config.header_lengths);
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod constants;
pub mod controllers;
pub mod error;
pub mod estimator;
pub mod pomdp;
pub mod receiver;
pub mod simulation;
pub mod summary;
pub mod traits;
pub mod types;

pub use channel::GilbertElliottChannel;
pub use config::{ChannelParams, EstimatorParams, HeaderLengths, SimConfig, TimerThresholds};
pub use controllers::{BeliefController, TimerController};
pub use error::{ConfigError, ExportError, ModelError, PolicyError, SimError};
pub use estimator::ChannelEstimator;
pub use pomdp::{
    AugmentedState, Belief, ObservationModel, PolicyPiece, PolicySet, PomdpxModel, TransitionModel,
};
pub use receiver::{ReceiverState, SynchronizationReceiver};
pub use simulation::{Simulation, SimulationTrace, StepRecord};
pub use summary::{SessionSummary, reference_efficiency};
pub use traits::HeaderController;
pub use types::{ChannelState, DecisionKind};
