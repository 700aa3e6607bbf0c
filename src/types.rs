//! Core value types shared by the channel, receiver and controllers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{POLICY_ACTION_FULL, POLICY_ACTION_MINIMAL, POLICY_ACTION_PARTIAL};

/// Link quality of the Gilbert-Elliott channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelState {
    /// Packets sent in this state are received.
    Good,
    /// Packets sent in this state are erased.
    Bad,
}

impl ChannelState {
    /// Both channel states in belief-vector order (Bad before Good).
    pub const ALL: [ChannelState; 2] = [ChannelState::Bad, ChannelState::Good];

    /// Returns `true` for [`ChannelState::Good`].
    #[inline]
    pub const fn is_good(self) -> bool {
        matches!(self, ChannelState::Good)
    }

    /// Maps a reception outcome to a channel state.
    #[inline]
    pub const fn from_good(is_good: bool) -> Self {
        if is_good {
            ChannelState::Good
        } else {
            ChannelState::Bad
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Good => write!(f, "Good"),
            ChannelState::Bad => write!(f, "Bad"),
        }
    }
}

/// Header verbosity class chosen by a compressor for one packet.
///
/// Ordered by decreasing header size and decreasing robustness to context
/// loss; corresponds to the IR, FO and SO packet families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    /// Full header (IR); always re-establishes the receiver context.
    Full,
    /// Partial header (FO); carries static fields and dynamic updates.
    Partial,
    /// Minimal header (SO); decodable only against an established context.
    Minimal,
}

impl DecisionKind {
    /// All decisions in transition-model order.
    pub const ALL: [DecisionKind; 3] = [
        DecisionKind::Full,
        DecisionKind::Partial,
        DecisionKind::Minimal,
    ];

    /// Dense index used to select a transition matrix.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            DecisionKind::Full => 0,
            DecisionKind::Partial => 1,
            DecisionKind::Minimal => 2,
        }
    }

    /// Action code used by policy files.
    pub const fn policy_code(self) -> u8 {
        match self {
            DecisionKind::Full => POLICY_ACTION_FULL,
            DecisionKind::Minimal => POLICY_ACTION_MINIMAL,
            DecisionKind::Partial => POLICY_ACTION_PARTIAL,
        }
    }

    /// Decodes a policy-file action code.
    pub const fn from_policy_code(code: u8) -> Option<Self> {
        match code {
            POLICY_ACTION_FULL => Some(DecisionKind::Full),
            POLICY_ACTION_MINIMAL => Some(DecisionKind::Minimal),
            POLICY_ACTION_PARTIAL => Some(DecisionKind::Partial),
            _ => None,
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionKind::Full => write!(f, "Full"),
            DecisionKind::Partial => write!(f, "Partial"),
            DecisionKind::Minimal => write!(f, "Minimal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_codes_roundtrip_for_every_decision() {
        for decision in DecisionKind::ALL {
            assert_eq!(
                DecisionKind::from_policy_code(decision.policy_code()),
                Some(decision)
            );
        }
    }

    #[test]
    fn policy_code_one_is_minimal() {
        assert_eq!(DecisionKind::from_policy_code(1), Some(DecisionKind::Minimal));
        assert_eq!(DecisionKind::from_policy_code(2), Some(DecisionKind::Partial));
        assert_eq!(DecisionKind::from_policy_code(3), None);
    }

    #[test]
    fn decision_indices_are_dense() {
        let indices: Vec<usize> = DecisionKind::ALL.iter().map(|d| d.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn channel_state_from_good() {
        assert_eq!(ChannelState::from_good(true), ChannelState::Good);
        assert!(!ChannelState::from_good(false).is_good());
    }
}
