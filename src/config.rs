//! Simulation configuration.
//!
//! All parameters arrive from an external collaborator (file or command line)
//! and are validated here, before any step runs. Invalid values are reported
//! as [`ConfigError`]s and never replaced by defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::channel::erasure_to_transition;
use crate::constants::*;
use crate::error::ConfigError;
use crate::types::DecisionKind;

/// Gilbert-Elliott channel parameterization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelParams {
    /// Direct transition probabilities.
    Transition {
        p_good_to_bad: f64,
        p_bad_to_good: f64,
    },
    /// Mean erasure rate `ε` and mean bad-run length `L`.
    Erasure {
        mean_erasure_rate: f64,
        mean_bad_run_length: f64,
    },
}

impl Default for ChannelParams {
    fn default() -> Self {
        ChannelParams::Erasure {
            mean_erasure_rate: DEFAULT_MEAN_ERASURE_RATE,
            mean_bad_run_length: DEFAULT_MEAN_BAD_RUN_LENGTH,
        }
    }
}

impl ChannelParams {
    /// Resolves to `(p_good_to_bad, p_bad_to_good)`.
    ///
    /// # Errors
    /// - [`ConfigError::ProbabilityOutOfRange`] - A probability lies outside (0, 1)
    /// - [`ConfigError::InvalidBadRunLength`] - `L` is not greater than one
    pub fn transition_probabilities(&self) -> Result<(f64, f64), ConfigError> {
        match *self {
            ChannelParams::Transition {
                p_good_to_bad,
                p_bad_to_good,
            } => {
                ensure_open_probability("p_good_to_bad", p_good_to_bad)?;
                ensure_open_probability("p_bad_to_good", p_bad_to_good)?;
                Ok((p_good_to_bad, p_bad_to_good))
            }
            ChannelParams::Erasure {
                mean_erasure_rate,
                mean_bad_run_length,
            } => erasure_to_transition(mean_erasure_rate, mean_bad_run_length),
        }
    }
}

/// Error rates of the channel estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorParams {
    /// Probability of reporting Bad while the channel is Good.
    pub false_alarm_rate: f64,
    /// Probability of reporting Good while the channel is Bad.
    pub miss_detection_rate: f64,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            false_alarm_rate: DEFAULT_FALSE_ALARM_RATE,
            miss_detection_rate: DEFAULT_MISS_DETECTION_RATE,
        }
    }
}

impl EstimatorParams {
    /// Checks that both rates lie in [0, 1).
    ///
    /// # Errors
    /// - [`ConfigError::ProbabilityOutOfRange`] - A rate lies outside [0, 1)
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_rate("false_alarm_rate", self.false_alarm_rate)?;
        ensure_rate("miss_detection_rate", self.miss_detection_rate)
    }
}

/// Timeouts, in steps, of the timer-driven compressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerThresholds {
    /// Steps spent on Full headers before switching to Minimal.
    pub full_to_minimal: u32,
    /// Steps spent on Minimal headers before switching to Partial.
    pub minimal_to_partial: u32,
    /// Steps spent on Partial headers before switching back to Minimal.
    pub partial_to_minimal: u32,
}

impl Default for TimerThresholds {
    fn default() -> Self {
        Self {
            full_to_minimal: DEFAULT_TIMER_FULL_TO_MINIMAL,
            minimal_to_partial: DEFAULT_TIMER_MINIMAL_TO_PARTIAL,
            partial_to_minimal: DEFAULT_TIMER_PARTIAL_TO_MINIMAL,
        }
    }
}

impl TimerThresholds {
    /// Creates thresholds from the three timeouts.
    pub const fn new(full_to_minimal: u32, minimal_to_partial: u32, partial_to_minimal: u32) -> Self {
        Self {
            full_to_minimal,
            minimal_to_partial,
            partial_to_minimal,
        }
    }

    /// Checks that every threshold is at least one step.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidTimerThreshold`] - A threshold is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            ("full_to_minimal", self.full_to_minimal),
            ("minimal_to_partial", self.minimal_to_partial),
            ("partial_to_minimal", self.partial_to_minimal),
        ];
        match thresholds.into_iter().find(|&(_, value)| value == 0) {
            Some((name, _)) => Err(ConfigError::InvalidTimerThreshold { name }),
            None => Ok(()),
        }
    }
}

/// Header and payload lengths used for efficiency accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderLengths {
    pub full: u32,
    pub partial: u32,
    pub minimal: u32,
    pub payload: u32,
}

impl Default for HeaderLengths {
    fn default() -> Self {
        Self {
            full: DEFAULT_FULL_HEADER_LENGTH,
            partial: DEFAULT_PARTIAL_HEADER_LENGTH,
            minimal: DEFAULT_MINIMAL_HEADER_LENGTH,
            payload: DEFAULT_PAYLOAD_LENGTH,
        }
    }
}

impl HeaderLengths {
    /// Header length of a decision class.
    pub fn header(&self, decision: DecisionKind) -> u32 {
        match decision {
            DecisionKind::Full => self.full,
            DecisionKind::Partial => self.partial,
            DecisionKind::Minimal => self.minimal,
        }
    }

    /// Checks that efficiencies computed from these lengths are defined.
    ///
    /// Header lengths may be zero (an idealized compressor), the payload may not.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidHeaderLength`] - The payload length is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.payload == 0 {
            return Err(ConfigError::InvalidHeaderLength { name: "payload" });
        }
        Ok(())
    }

    /// Total bytes on the air for one packet of the given class.
    pub fn packet(&self, decision: DecisionKind) -> u64 {
        u64::from(self.header(decision)) + u64::from(self.payload)
    }
}

/// Complete configuration of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for every random stream of the run.
    pub seed: u64,
    /// Number of steps (packets) to simulate.
    pub steps: usize,
    /// W-LSB window capacity `W`.
    pub window_capacity: usize,
    pub channel: ChannelParams,
    pub estimator: EstimatorParams,
    pub timer: TimerThresholds,
    /// Policy file for the belief controller.
    pub policy_path: Option<PathBuf>,
    pub header_lengths: HeaderLengths,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            steps: DEFAULT_STEPS,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            channel: ChannelParams::default(),
            estimator: EstimatorParams::default(),
            timer: TimerThresholds::default(),
            policy_path: None,
            header_lengths: HeaderLengths::default(),
        }
    }
}

impl SimConfig {
    /// Validates every parameter of the run.
    ///
    /// The policy path is not checked here; its presence is only required
    /// when a belief controller is built.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidWindowCapacity`] - `W` is zero
    /// - [`ConfigError::ProbabilityOutOfRange`] - A channel or estimator probability is invalid
    /// - [`ConfigError::InvalidBadRunLength`] - Mean bad-run length is not above one
    /// - [`ConfigError::InvalidTimerThreshold`] - A timer threshold is zero
    /// - [`ConfigError::InvalidHeaderLength`] - The payload length is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_window_capacity(self.window_capacity)?;
        self.channel.transition_probabilities()?;
        self.estimator.validate()?;
        self.timer.validate()?;
        self.header_lengths.validate()
    }

    /// Dimension `4 + W` of the augmented hidden state.
    pub fn state_dimension(&self) -> usize {
        NON_FULL_CONTEXT_STATES + self.window_capacity
    }

    /// Policy path required by the belief controller.
    ///
    /// # Errors
    /// - [`ConfigError::MissingPolicyPath`] - No policy path is configured
    pub fn require_policy_path(&self) -> Result<&PathBuf, ConfigError> {
        self.policy_path.as_ref().ok_or(ConfigError::MissingPolicyPath)
    }
}

/// Checks that the window capacity tolerates at least one loss.
pub(crate) fn validate_window_capacity(window_capacity: usize) -> Result<(), ConfigError> {
    if window_capacity == 0 {
        return Err(ConfigError::InvalidWindowCapacity(window_capacity));
    }
    Ok(())
}

/// Checks that `value` lies strictly inside (0, 1).
pub(crate) fn ensure_open_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange {
            name,
            value,
            expected: "(0, 1)",
        })
    }
}

/// Checks that `value` lies in [0, 1).
pub(crate) fn ensure_rate(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange {
            name,
            value,
            expected: "[0, 1)",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.state_dimension(), 4 + DEFAULT_WINDOW_CAPACITY);
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = SimConfig {
            window_capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidWindowCapacity(0)));
    }

    #[test]
    fn estimator_rate_of_one_is_rejected() {
        let config = SimConfig {
            estimator: EstimatorParams {
                false_alarm_rate: 1.0,
                miss_detection_rate: 0.0,
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ProbabilityOutOfRange { name: "false_alarm_rate", .. })
        ));
    }

    #[test]
    fn zero_timer_threshold_is_rejected() {
        let thresholds = TimerThresholds::new(3, 0, 4);
        assert_eq!(
            thresholds.validate(),
            Err(ConfigError::InvalidTimerThreshold {
                name: "minimal_to_partial"
            })
        );
    }

    #[test]
    fn transition_params_pass_through() {
        let params = ChannelParams::Transition {
            p_good_to_bad: 0.125,
            p_bad_to_good: 0.25,
        };
        assert_eq!(params.transition_probabilities(), Ok((0.125, 0.25)));
    }

    #[test]
    fn missing_policy_path_is_reported() {
        let config = SimConfig::default();
        assert_eq!(
            config.require_policy_path(),
            Err(ConfigError::MissingPolicyPath)
        );
    }

    #[test]
    fn packet_length_includes_payload() {
        let lengths = HeaderLengths::default();
        assert_eq!(lengths.packet(DecisionKind::Full), 100);
        assert_eq!(lengths.packet(DecisionKind::Minimal), 24);
    }

    #[test]
    fn zero_payload_is_rejected() {
        let config = SimConfig {
            header_lengths: HeaderLengths {
                full: 0,
                partial: 0,
                minimal: 0,
                payload: 0,
            },
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidHeaderLength { name: "payload" })
        );

        let headerless = HeaderLengths {
            payload: 20,
            ..config.header_lengths
        };
        assert!(headerless.validate().is_ok());
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = SimConfig {
            seed: 9,
            policy_path: Some(PathBuf::from("policies/w8.policy")),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
