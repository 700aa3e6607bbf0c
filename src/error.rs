//! Error types for the header-compression simulator.
//!
//! Configuration problems (bad parameters, bad policy files) are distinguished
//! from numerical failures of the belief filter. All of them are fatal to a
//! run and surface before or instead of a step; none is retried. The
//! `thiserror` crate is used for ergonomic error definitions.

use thiserror::Error;

use crate::types::{ChannelState, DecisionKind};

/// Errors caused by invalid simulation or model parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A probability parameter lies outside its admissible interval.
    #[error("Invalid probability for '{name}': {value} (expected {expected})")]
    ProbabilityOutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    /// The W-LSB window must tolerate at least one loss.
    #[error("Invalid window capacity: {0} (must be at least 1)")]
    InvalidWindowCapacity(usize),

    /// Mean bad-run length must exceed one step for a valid bad-to-good probability.
    #[error("Invalid mean bad-run length: {0} (must be greater than 1)")]
    InvalidBadRunLength(f64),

    /// A timer threshold of zero would never hold a decision.
    #[error("Invalid timer threshold for '{name}': must be at least 1")]
    InvalidTimerThreshold { name: &'static str },

    /// A payload of zero bytes makes every efficiency ratio undefined.
    #[error("Invalid length for '{name}': must be at least 1 byte")]
    InvalidHeaderLength { name: &'static str },

    /// The belief controller was requested without a policy file.
    #[error("Policy path is required for the belief controller")]
    MissingPolicyPath,

    /// A vector does not match the augmented state dimension 4 + W.
    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Errors raised while loading or validating a compressor policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The policy file could not be opened or read.
    #[error("I/O error reading policy file '{path}': {reason}")]
    Io { path: String, reason: String },

    /// The document is not well-formed XML.
    #[error("Malformed policy document at byte {position}: {reason}")]
    Malformed { position: u64, reason: String },

    /// A vector element carries no action attribute.
    #[error("Policy vector {index} has no '{attribute}' attribute")]
    MissingAction {
        index: usize,
        attribute: &'static str,
    },

    /// A vector's action code is not one of the known header classes.
    #[error("Policy vector {index} has unrecognized action code '{code}'")]
    UnknownAction { index: usize, code: String },

    /// A vector entry is not a finite floating-point number.
    #[error("Policy vector {index} has malformed number '{token}' at position {position}")]
    InvalidNumber {
        index: usize,
        position: usize,
        token: String,
    },

    /// A vector's length differs from the augmented state dimension.
    #[error("Policy vector {index} has {got} entries, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },

    /// The alpha-vector group announces a length different from 4 + W.
    #[error("Policy announces vector length {announced}, expected {expected}")]
    AnnouncedLengthMismatch { announced: String, expected: usize },

    /// The policy could not be encoded as XML.
    #[error("Failed to encode policy: {reason}")]
    Encode { reason: String },

    /// The policy contains no vectors at all.
    #[error("Policy contains no vectors")]
    Empty,
}

/// Errors raised by the belief filter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The observation has zero probability under the predicted belief.
    #[error(
        "Observation {observation} has zero likelihood after {decision}; model and observation are inconsistent"
    )]
    DegenerateObservation {
        decision: DecisionKind,
        observation: ChannelState,
    },
}

/// Errors raised while exporting a model description.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// The XML writer failed.
    #[error("Failed to encode model: {reason}")]
    Encode { reason: String },

    /// The output file could not be written.
    #[error("I/O error writing model file '{path}': {reason}")]
    Io { path: String, reason: String },
}

/// Main error type for simulator operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid or unreadable policy.
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    /// The model description could not be exported.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Numerical failure of the belief filter at a given step.
    #[error("Model error at step {step}: {source}")]
    Model {
        step: usize,
        #[source]
        source: ModelError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_out_of_range_display() {
        let err = ConfigError::ProbabilityOutOfRange {
            name: "p_good_to_bad",
            value: 1.5,
            expected: "(0, 1)",
        };
        assert_eq!(
            format!("{}", err),
            "Invalid probability for 'p_good_to_bad': 1.5 (expected (0, 1))"
        );
    }

    #[test]
    fn policy_dimension_mismatch_display() {
        let err = PolicyError::DimensionMismatch {
            index: 2,
            expected: 12,
            got: 3,
        };
        assert_eq!(
            format!("{}", err),
            "Policy vector 2 has 3 entries, expected 12"
        );
    }

    #[test]
    fn degenerate_observation_display() {
        let err = ModelError::DegenerateObservation {
            decision: DecisionKind::Full,
            observation: ChannelState::Bad,
        };
        assert_eq!(
            format!("{}", err),
            "Observation Bad has zero likelihood after Full; model and observation are inconsistent"
        );
    }

    #[test]
    fn invalid_header_length_display() {
        let err = ConfigError::InvalidHeaderLength { name: "payload" };
        assert_eq!(
            format!("{}", err),
            "Invalid length for 'payload': must be at least 1 byte"
        );
    }

    #[test]
    fn sim_error_from_export_error() {
        let export_err = ExportError::Io {
            path: "model.pomdpx".to_string(),
            reason: "denied".to_string(),
        };
        assert_eq!(
            SimError::from(export_err.clone()),
            SimError::Export(export_err)
        );
    }

    #[test]
    fn sim_error_from_policy_error() {
        let policy_err = PolicyError::Empty;
        let sim_err = SimError::from(policy_err.clone());
        match sim_err {
            SimError::Policy(inner) => assert_eq!(inner, policy_err),
            _ => panic!("Incorrect SimError variant"),
        }
    }

    #[test]
    fn sim_error_from_config_error() {
        let config_err = ConfigError::InvalidWindowCapacity(0);
        let sim_err = SimError::from(config_err.clone());
        match sim_err {
            SimError::Config(inner) => assert_eq!(inner, config_err),
            _ => panic!("Incorrect SimError variant"),
        }
    }
}
