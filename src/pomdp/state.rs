//! Augmented hidden state tracked by the belief controller.
//!
//! The compressor cannot see the receiver's context nor the link; it tracks
//! their joint state. Outside FullContext the channel is an explicit part of
//! the state. Inside FullContext the loss counter implies it: loss 0 follows a
//! successful reception (Good) and loss k >= 1 a failed one (Bad).
//!
//! Dense layout, shared with policy files:
//!
//! | index   | state                  |
//! |---------|------------------------|
//! | 0       | NoContext, Bad         |
//! | 1       | NoContext, Good        |
//! | 2       | StaticContext, Bad     |
//! | 3       | StaticContext, Good    |
//! | 4 + k   | FullContext, k losses  |

use crate::constants::{FULL_CONTEXT_BASE_INDEX, NON_FULL_CONTEXT_STATES};
use crate::receiver::ReceiverState;
use crate::types::ChannelState;

/// One point of the (receiver x channel) hidden state space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AugmentedState {
    NoContext(ChannelState),
    StaticContext(ChannelState),
    FullContext { consecutive_loss: usize },
}

impl AugmentedState {
    /// Number of augmented states for window capacity `W`: `4 + W`.
    #[inline]
    pub const fn dimension(window_capacity: usize) -> usize {
        NON_FULL_CONTEXT_STATES + window_capacity
    }

    /// Dense index of this state.
    pub const fn index(self) -> usize {
        match self {
            AugmentedState::NoContext(ChannelState::Bad) => 0,
            AugmentedState::NoContext(ChannelState::Good) => 1,
            AugmentedState::StaticContext(ChannelState::Bad) => 2,
            AugmentedState::StaticContext(ChannelState::Good) => 3,
            AugmentedState::FullContext { consecutive_loss } => {
                FULL_CONTEXT_BASE_INDEX + consecutive_loss
            }
        }
    }

    /// State at `index`, or `None` if the index is outside `0 .. 4 + W`.
    pub const fn from_index(index: usize, window_capacity: usize) -> Option<Self> {
        match index {
            0 => Some(AugmentedState::NoContext(ChannelState::Bad)),
            1 => Some(AugmentedState::NoContext(ChannelState::Good)),
            2 => Some(AugmentedState::StaticContext(ChannelState::Bad)),
            3 => Some(AugmentedState::StaticContext(ChannelState::Good)),
            i if i < Self::dimension(window_capacity) => Some(AugmentedState::FullContext {
                consecutive_loss: i - FULL_CONTEXT_BASE_INDEX,
            }),
            _ => None,
        }
    }

    /// Combines a receiver state with the channel state of the last packet.
    ///
    /// In FullContext the channel is implied by the loss counter and the
    /// argument is only checked in debug builds.
    pub fn from_parts(receiver: ReceiverState, channel: ChannelState) -> Self {
        match receiver {
            ReceiverState::NoContext => AugmentedState::NoContext(channel),
            ReceiverState::StaticContext => AugmentedState::StaticContext(channel),
            ReceiverState::FullContext { consecutive_loss } => {
                debug_assert_eq!(
                    channel.is_good(),
                    consecutive_loss == 0,
                    "FullContext loss counter inconsistent with channel state"
                );
                AugmentedState::FullContext { consecutive_loss }
            }
        }
    }

    /// Receiver component.
    pub const fn receiver(self) -> ReceiverState {
        match self {
            AugmentedState::NoContext(_) => ReceiverState::NoContext,
            AugmentedState::StaticContext(_) => ReceiverState::StaticContext,
            AugmentedState::FullContext { consecutive_loss } => {
                ReceiverState::FullContext { consecutive_loss }
            }
        }
    }

    /// Channel component.
    pub const fn channel(self) -> ChannelState {
        match self {
            AugmentedState::NoContext(channel) | AugmentedState::StaticContext(channel) => channel,
            AugmentedState::FullContext {
                consecutive_loss: 0,
            } => ChannelState::Good,
            AugmentedState::FullContext { .. } => ChannelState::Bad,
        }
    }

    /// Iterates over every state in index order.
    pub fn all(window_capacity: usize) -> impl Iterator<Item = AugmentedState> {
        (0..Self::dimension(window_capacity))
            .filter_map(move |index| Self::from_index(index, window_capacity))
    }
}
