//! Partially observable model of the receiver and the link, as seen by the
//! compressor.
//!
//! - [`state`]: augmented hidden state and its dense index layout
//! - [`model`]: transition and observation probabilities
//! - [`belief`]: belief vector and Bayesian filter
//! - [`policy`]: alpha-vector policies and the policy-file decoder
//! - [`pomdpx`]: model export for offline policy solvers

pub mod belief;
pub mod model;
pub mod policy;
pub mod pomdpx;
pub mod state;

pub use belief::Belief;
pub use model::{ObservationModel, TransitionModel};
pub use policy::{PolicyPiece, PolicySet};
pub use pomdpx::PomdpxModel;
pub use state::AugmentedState;
