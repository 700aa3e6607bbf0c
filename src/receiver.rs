//! Decompressor context-synchronization state machine.
//!
//! The receiver moves between NoContext, StaticContext and FullContext
//! according to the header class of each packet and whether the link carried
//! it. While in FullContext it counts consecutive lost packets; once the count
//! reaches the W-LSB window capacity `W` the dynamic context is presumed stale
//! and the receiver falls back to StaticContext.
//!
//! [`ReceiverState::next`] is the single source of truth for these rules. The
//! POMDP transition model is built from it, so the compressor's model of the
//! receiver matches the simulated receiver exactly.

use serde::{Deserialize, Serialize};

use crate::config::validate_window_capacity;
use crate::error::ConfigError;
use crate::types::DecisionKind;

/// Context state of the receiver.
///
/// The loss counter only exists in FullContext, so it is zero in every other
/// state by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReceiverState {
    /// No context; only Full headers can be decoded.
    #[default]
    NoContext,
    /// Static fields known; dynamic context not established.
    StaticContext,
    /// Fully synchronized, with the number of consecutive packets lost since
    /// the last successful reception.
    FullContext { consecutive_loss: usize },
}

impl ReceiverState {
    /// FullContext with no outstanding losses.
    pub const SYNCHRONIZED: ReceiverState = ReceiverState::FullContext {
        consecutive_loss: 0,
    };

    /// Consecutive losses in FullContext; zero in every other state.
    #[inline]
    pub fn consecutive_loss(self) -> usize {
        match self {
            ReceiverState::FullContext { consecutive_loss } => consecutive_loss,
            ReceiverState::NoContext | ReceiverState::StaticContext => 0,
        }
    }

    /// Returns `true` in FullContext.
    #[inline]
    pub fn is_full_context(self) -> bool {
        matches!(self, ReceiverState::FullContext { .. })
    }

    /// Returns `true` if a packet of class `decision` is decodable in this state.
    ///
    /// NoContext decodes only Full headers; an established static or full
    /// context decodes every class.
    pub fn can_decode(self, decision: DecisionKind) -> bool {
        match self {
            ReceiverState::NoContext => decision == DecisionKind::Full,
            ReceiverState::StaticContext | ReceiverState::FullContext { .. } => true,
        }
    }

    /// Next receiver state after one packet of class `decision`.
    ///
    /// `channel_good` tells whether the link delivered the packet and
    /// `window_capacity` is `W`.
    ///
    /// - Lost packet: NoContext and StaticContext are unaffected; FullContext
    ///   counts the loss and degrades to StaticContext on the `W`-th one.
    /// - Full: FullContext with zero losses, from any state.
    /// - Partial: StaticContext or FullContext resynchronize; NoContext
    ///   acquires StaticContext.
    /// - Minimal: StaticContext or FullContext resynchronize; NoContext is
    ///   unchanged since the packet cannot be decoded.
    pub fn next(self, channel_good: bool, decision: DecisionKind, window_capacity: usize) -> Self {
        debug_assert!(window_capacity > 0, "window capacity must be positive");

        if !channel_good {
            return match self {
                ReceiverState::FullContext { consecutive_loss } => {
                    let consecutive_loss = consecutive_loss + 1;
                    if consecutive_loss >= window_capacity {
                        ReceiverState::StaticContext
                    } else {
                        ReceiverState::FullContext { consecutive_loss }
                    }
                }
                unaffected => unaffected,
            };
        }

        match (decision, self) {
            (DecisionKind::Full, _) => Self::SYNCHRONIZED,
            (DecisionKind::Partial, ReceiverState::NoContext) => ReceiverState::StaticContext,
            (DecisionKind::Minimal, ReceiverState::NoContext) => ReceiverState::NoContext,
            (DecisionKind::Partial | DecisionKind::Minimal, _) => Self::SYNCHRONIZED,
        }
    }
}

/// Receiver side of the simulation.
#[derive(Debug, Clone)]
pub struct SynchronizationReceiver {
    window_capacity: usize,
    state: ReceiverState,
    history: Vec<ReceiverState>,
}

impl SynchronizationReceiver {
    /// Creates a receiver in NoContext.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidWindowCapacity`] - `window_capacity` is zero
    pub fn new(window_capacity: usize) -> Result<Self, ConfigError> {
        validate_window_capacity(window_capacity)?;
        Ok(Self {
            window_capacity,
            state: ReceiverState::NoContext,
            history: vec![ReceiverState::NoContext],
        })
    }

    /// Returns to NoContext and clears the history.
    pub fn reset(&mut self) {
        self.state = ReceiverState::NoContext;
        self.history.clear();
        self.history.push(self.state);
    }

    /// Applies one packet of class `decision` sent while the link was
    /// `channel_good`, returning the new state.
    pub fn update(&mut self, channel_good: bool, decision: DecisionKind) -> ReceiverState {
        self.state = self.state.next(channel_good, decision, self.window_capacity);
        self.history.push(self.state);
        self.state
    }

    #[inline]
    pub fn state(&self) -> ReceiverState {
        self.state
    }

    #[inline]
    pub fn window_capacity(&self) -> usize {
        self.window_capacity
    }

    /// Every state since the last reset, starting with the initial one.
    pub fn history(&self) -> &[ReceiverState] {
        &self.history
    }

    /// Restarts the receiver from `state`, discarding the history.
    pub fn set_state(&mut self, state: ReceiverState) {
        debug_assert!(
            state.consecutive_loss() < self.window_capacity,
            "loss counter must stay below the window capacity"
        );
        self.state = state;
        self.history.clear();
        self.history.push(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = 8;

    fn receiver_in(state: ReceiverState) -> SynchronizationReceiver {
        let mut receiver = SynchronizationReceiver::new(W).unwrap();
        receiver.set_state(state);
        receiver
    }

    #[test]
    fn starts_in_no_context() {
        let receiver = SynchronizationReceiver::new(W).unwrap();
        assert_eq!(receiver.state(), ReceiverState::NoContext);
        assert_eq!(receiver.history(), &[ReceiverState::NoContext]);
    }

    #[test]
    fn zero_window_is_rejected() {
        assert_eq!(
            SynchronizationReceiver::new(0).unwrap_err(),
            ConfigError::InvalidWindowCapacity(0)
        );
    }

    #[test]
    fn window_of_losses_degrades_exactly_on_last() {
        for decision in DecisionKind::ALL {
            let mut receiver = receiver_in(ReceiverState::SYNCHRONIZED);
            for loss in 1..W {
                let state = receiver.update(false, decision);
                assert_eq!(
                    state,
                    ReceiverState::FullContext {
                        consecutive_loss: loss
                    },
                    "degraded early at loss {}",
                    loss
                );
            }
            assert_eq!(receiver.update(false, decision), ReceiverState::StaticContext);
            assert_eq!(receiver.state().consecutive_loss(), 0);
        }
    }

    #[test]
    fn full_header_always_synchronizes() {
        let mut starts = vec![ReceiverState::NoContext, ReceiverState::StaticContext];
        starts.extend((0..W).map(|consecutive_loss| ReceiverState::FullContext { consecutive_loss }));
        for start in starts {
            let mut receiver = receiver_in(start);
            assert_eq!(
                receiver.update(true, DecisionKind::Full),
                ReceiverState::SYNCHRONIZED,
                "from {:?}",
                start
            );
        }
    }

    #[test]
    fn losses_do_not_affect_context_free_states() {
        for start in [ReceiverState::NoContext, ReceiverState::StaticContext] {
            let mut receiver = receiver_in(start);
            for _ in 0..(2 * W) {
                assert_eq!(receiver.update(false, DecisionKind::Minimal), start);
            }
        }
    }

    #[test]
    fn partial_from_no_context_acquires_static_context() {
        let mut receiver = receiver_in(ReceiverState::NoContext);
        assert_eq!(
            receiver.update(true, DecisionKind::Partial),
            ReceiverState::StaticContext
        );
        assert_eq!(
            receiver.update(true, DecisionKind::Partial),
            ReceiverState::SYNCHRONIZED
        );
    }

    #[test]
    fn minimal_from_no_context_is_dropped() {
        let mut receiver = receiver_in(ReceiverState::NoContext);
        assert_eq!(
            receiver.update(true, DecisionKind::Minimal),
            ReceiverState::NoContext
        );
    }

    #[test]
    fn minimal_resets_loss_counter_in_full_context() {
        let mut receiver = receiver_in(ReceiverState::FullContext {
            consecutive_loss: 5,
        });
        assert_eq!(
            receiver.update(true, DecisionKind::Minimal),
            ReceiverState::SYNCHRONIZED
        );
    }

    #[test]
    fn minimal_from_static_context_synchronizes() {
        let mut receiver = receiver_in(ReceiverState::StaticContext);
        assert_eq!(
            receiver.update(true, DecisionKind::Minimal),
            ReceiverState::SYNCHRONIZED
        );
    }

    #[test]
    fn window_of_one_degrades_on_first_loss() {
        let state = ReceiverState::SYNCHRONIZED.next(false, DecisionKind::Full, 1);
        assert_eq!(state, ReceiverState::StaticContext);
    }

    #[test]
    fn reset_clears_history() {
        let mut receiver = SynchronizationReceiver::new(W).unwrap();
        receiver.update(true, DecisionKind::Full);
        receiver.update(false, DecisionKind::Minimal);
        assert_eq!(receiver.history().len(), 3);
        receiver.reset();
        assert_eq!(receiver.state(), ReceiverState::NoContext);
        assert_eq!(receiver.history().len(), 1);
    }

    #[test]
    fn decodability_follows_context() {
        assert!(ReceiverState::NoContext.can_decode(DecisionKind::Full));
        assert!(!ReceiverState::NoContext.can_decode(DecisionKind::Partial));
        assert!(!ReceiverState::NoContext.can_decode(DecisionKind::Minimal));
        assert!(ReceiverState::StaticContext.can_decode(DecisionKind::Minimal));
        assert!(ReceiverState::SYNCHRONIZED.can_decode(DecisionKind::Minimal));
    }
}
