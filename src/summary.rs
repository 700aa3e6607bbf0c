//! Efficiency summary of a simulated session.
//!
//! Efficiency after step `i` is the number of payload bytes delivered in
//! steps `0..=i` divided by the number of bytes transmitted in those steps.
//! A payload is delivered when its packet was sent on a Good channel and the
//! receiver, in the state it held *before* the packet, could decode it.

use std::fmt;

use serde::Serialize;

use crate::config::HeaderLengths;
use crate::simulation::SimulationTrace;
use crate::types::DecisionKind;

/// Decision counts, channel counts and cumulative efficiency of one session,
/// or the average over several once normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub full: f64,
    pub partial: f64,
    pub minimal: f64,
    pub good: f64,
    pub bad: f64,
    /// Cumulative efficiency after each step.
    pub efficiency: Vec<f64>,
}

impl SessionSummary {
    /// Summary with all counts at zero, used as an accumulator.
    pub fn zeroed(steps: usize) -> Self {
        Self {
            full: 0.0,
            partial: 0.0,
            minimal: 0.0,
            good: 0.0,
            bad: 0.0,
            efficiency: vec![0.0; steps],
        }
    }

    /// Summarizes one run.
    pub fn from_trace(trace: &SimulationTrace, lengths: &HeaderLengths) -> Self {
        let mut summary = Self::zeroed(trace.len());
        let receivers = trace.receiver_states();
        let mut transmitted: u64 = 0;
        let mut delivered: u64 = 0;

        for (record, receiver_before) in trace.steps().iter().zip(&receivers) {
            match record.decision {
                DecisionKind::Full => summary.full += 1.0,
                DecisionKind::Partial => summary.partial += 1.0,
                DecisionKind::Minimal => summary.minimal += 1.0,
            }
            transmitted += lengths.packet(record.decision);

            if record.channel_before.is_good() {
                summary.good += 1.0;
                if receiver_before.can_decode(record.decision) {
                    delivered += u64::from(lengths.payload);
                }
            } else {
                summary.bad += 1.0;
            }
            summary.efficiency[record.step] = delivered as f64 / transmitted as f64;
        }
        summary
    }

    /// Adds another summary of the same length into this one.
    ///
    /// # Panics
    /// If the two summaries cover a different number of steps.
    pub fn merge(&mut self, other: &SessionSummary) {
        assert_eq!(
            self.efficiency.len(),
            other.efficiency.len(),
            "cannot merge summaries of different lengths"
        );
        self.full += other.full;
        self.partial += other.partial;
        self.minimal += other.minimal;
        self.good += other.good;
        self.bad += other.bad;
        for (total, value) in self.efficiency.iter_mut().zip(&other.efficiency) {
            *total += value;
        }
    }

    /// Divides every field by `runs`, turning a merged sum into an average.
    pub fn normalize(&mut self, runs: usize) {
        debug_assert!(runs > 0);
        let runs = runs as f64;
        self.full /= runs;
        self.partial /= runs;
        self.minimal /= runs;
        self.good /= runs;
        self.bad /= runs;
        self.efficiency.iter_mut().for_each(|value| *value /= runs);
    }

    /// Number of packets sent.
    pub fn total(&self) -> f64 {
        self.full + self.partial + self.minimal
    }

    /// Efficiency after the last step, or zero for an empty session.
    pub fn final_efficiency(&self) -> f64 {
        self.efficiency.last().copied().unwrap_or(0.0)
    }
}

/// Efficiency of sending only `decision` over a link that is Good with
/// probability `p_good`, ignoring context loss.
pub fn reference_efficiency(decision: DecisionKind, p_good: f64, lengths: &HeaderLengths) -> f64 {
    p_good * f64::from(lengths.payload) / lengths.packet(decision) as f64
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "***** Summary of header-compression session *****")?;
        writeln!(f, "Total number of packets: {}", self.total())?;
        writeln!(f, "Header classes:")?;
        writeln!(f, " - Full: {}", self.full)?;
        writeln!(f, " - Partial: {}", self.partial)?;
        writeln!(f, " - Minimal: {}", self.minimal)?;
        writeln!(f, "Channel states:")?;
        writeln!(f, " - Good: {}", self.good)?;
        writeln!(f, " - Bad: {}", self.bad)?;
        write!(f, "Final efficiency: {:.4}", self.final_efficiency())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::ReceiverState;
    use crate::simulation::StepRecord;
    use crate::types::ChannelState;

    fn record(
        step: usize,
        decision: DecisionKind,
        channel_before: ChannelState,
        channel_after: ChannelState,
        receiver: ReceiverState,
    ) -> StepRecord {
        StepRecord {
            step,
            decision,
            channel_before,
            channel_after,
            observation: None,
            receiver,
            consecutive_loss: receiver.consecutive_loss(),
            belief: None,
        }
    }

    fn sample_trace() -> SimulationTrace {
        use ChannelState::{Bad, Good};
        SimulationTrace::new(
            "timer",
            Good,
            ReceiverState::NoContext,
            vec![
                // Minimal cannot be decoded without context.
                record(0, DecisionKind::Minimal, Good, Good, ReceiverState::NoContext),
                record(1, DecisionKind::Full, Good, Bad, ReceiverState::SYNCHRONIZED),
                record(
                    2,
                    DecisionKind::Minimal,
                    Bad,
                    Good,
                    ReceiverState::FullContext {
                        consecutive_loss: 1,
                    },
                ),
                record(3, DecisionKind::Minimal, Good, Good, ReceiverState::SYNCHRONIZED),
            ],
        )
    }

    #[test]
    fn counts_decisions_and_channel_states() {
        let summary = SessionSummary::from_trace(&sample_trace(), &HeaderLengths::default());
        assert_eq!(summary.full, 1.0);
        assert_eq!(summary.partial, 0.0);
        assert_eq!(summary.minimal, 3.0);
        assert_eq!(summary.good, 3.0);
        assert_eq!(summary.bad, 1.0);
        assert_eq!(summary.total(), 4.0);
    }

    #[test]
    fn efficiency_counts_only_decodable_payloads() {
        let summary = SessionSummary::from_trace(&sample_trace(), &HeaderLengths::default());
        // Packet sizes: Minimal 24, Full 100. Payload 20.
        let expected = [0.0 / 24.0, 20.0 / 124.0, 20.0 / 148.0, 40.0 / 172.0];
        for (value, expected) in summary.efficiency.iter().zip(expected) {
            assert!((value - expected).abs() < 1e-12);
        }
        assert!((summary.final_efficiency() - 40.0 / 172.0).abs() < 1e-12);
    }

    #[test]
    fn merge_then_normalize_averages() {
        let lengths = HeaderLengths::default();
        let one = SessionSummary::from_trace(&sample_trace(), &lengths);
        let mut total = SessionSummary::zeroed(4);
        total.merge(&one);
        total.merge(&one);
        total.normalize(2);
        assert_eq!(total, one);
    }

    #[test]
    #[should_panic(expected = "different lengths")]
    fn merging_different_lengths_panics() {
        let mut total = SessionSummary::zeroed(3);
        total.merge(&SessionSummary::zeroed(4));
    }

    #[test]
    fn reference_efficiency_of_minimal_headers() {
        let lengths = HeaderLengths::default();
        let value = reference_efficiency(DecisionKind::Minimal, 0.8, &lengths);
        assert!((value - 0.8 * 20.0 / 24.0).abs() < 1e-12);
    }

    #[test]
    fn display_lists_counts() {
        let summary = SessionSummary::from_trace(&sample_trace(), &HeaderLengths::default());
        let text = summary.to_string();
        assert!(text.contains(" - Full: 1"));
        assert!(text.contains(" - Bad: 1"));
    }
}
