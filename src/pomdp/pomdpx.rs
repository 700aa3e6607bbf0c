//! POMDPX export of the compressor's decision problem.
//!
//! Offline point-based solvers read the model as a POMDPX document and emit
//! the alpha-vector policy files decoded by [`PolicySet`](crate::PolicySet).
//! The exported transition and observation tables are the ones the belief
//! controller filters with, so a solved policy is consistent with the
//! simulated receiver.
//!
//! The action variable lists header classes in policy-code order, which makes
//! a solver's action index equal to the `action` attribute read back from the
//! policy file. The only nonzero reward is earned on reaching FullContext
//! with no loss, worth `payload / (header + payload)` of the action taken.

use std::io;
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::info;

use crate::channel::GilbertElliottChannel;
use crate::config::{HeaderLengths, SimConfig, ensure_open_probability, validate_window_capacity};
use crate::constants::FULL_CONTEXT_BASE_INDEX;
use crate::error::{ConfigError, ExportError};
use crate::estimator::ChannelEstimator;
use crate::pomdp::belief::Belief;
use crate::pomdp::model::{ObservationModel, TransitionModel};
use crate::pomdp::state::AugmentedState;
use crate::types::{ChannelState, DecisionKind};

const STATE_PREVIOUS: &str = "state_0";
const STATE_CURRENT: &str = "state_1";
const OBSERVATION_VARIABLE: &str = "est_channel";
const ACTION_VARIABLE: &str = "type_compression";
const REWARD_VARIABLE: &str = "efficiency";

/// Complete decision problem of the belief controller, ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct PomdpxModel {
    window_capacity: usize,
    discount: f64,
    description: String,
    transitions: TransitionModel,
    /// `None` when the channel state is fully observable.
    observations: Option<ObservationModel>,
    initial_belief: Belief,
    /// Reward on reaching FullContext(0), indexed by policy code.
    rewards: Vec<f64>,
}

impl PomdpxModel {
    /// Assembles the model.
    ///
    /// # Parameters
    /// - `window_capacity`: W-LSB window capacity `W`
    /// - `channel`: Link whose dynamics the model assumes
    /// - `estimator`: Sensor of the link, or `None` for a fully observable channel
    /// - `lengths`: Header and payload lengths that define the rewards
    /// - `discount`: Discount factor in (0, 1)
    ///
    /// # Errors
    /// - [`ConfigError::InvalidWindowCapacity`] - `W` is zero
    /// - [`ConfigError::ProbabilityOutOfRange`] - The discount is not in (0, 1)
    /// - [`ConfigError::InvalidHeaderLength`] - The payload length is zero
    pub fn new(
        window_capacity: usize,
        channel: &GilbertElliottChannel,
        estimator: Option<&ChannelEstimator>,
        lengths: &HeaderLengths,
        discount: f64,
    ) -> Result<Self, ConfigError> {
        validate_window_capacity(window_capacity)?;
        ensure_open_probability("discount", discount)?;
        lengths.validate()?;

        let dimension = AugmentedState::dimension(window_capacity);
        let mut rewards = vec![0.0; DecisionKind::ALL.len()];
        for decision in DecisionKind::ALL {
            rewards[usize::from(decision.policy_code())] =
                f64::from(lengths.payload) / lengths.packet(decision) as f64;
        }

        let description = match estimator {
            Some(estimator) => format!(
                "Header compression over an estimated Gilbert-Elliott channel. W = {}; p_good_to_bad = {}, p_bad_to_good = {}; false_alarm = {}, miss_detection = {}; discount = {}.",
                window_capacity,
                channel.p_good_to_bad(),
                channel.p_bad_to_good(),
                estimator.false_alarm_rate(),
                estimator.miss_detection_rate(),
                discount
            ),
            None => format!(
                "Header compression over an observable Gilbert-Elliott channel. W = {}; p_good_to_bad = {}, p_bad_to_good = {}; discount = {}.",
                window_capacity,
                channel.p_good_to_bad(),
                channel.p_bad_to_good(),
                discount
            ),
        };

        Ok(Self {
            window_capacity,
            discount,
            description,
            transitions: TransitionModel::build(window_capacity, channel),
            observations: estimator.map(|estimator| ObservationModel::build(window_capacity, estimator)),
            initial_belief: Belief::initial(dimension, channel.steady_state_bad()),
            rewards,
        })
    }

    /// Assembles the model of a validated configuration.
    ///
    /// # Errors
    /// - Any error of [`SimConfig::validate`] or [`PomdpxModel::new`]
    pub fn from_config(
        config: &SimConfig,
        discount: f64,
        fully_observable: bool,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (p_good_to_bad, p_bad_to_good) = config.channel.transition_probabilities()?;
        let channel = GilbertElliottChannel::new(p_good_to_bad, p_bad_to_good)?;
        let estimator = if fully_observable {
            None
        } else {
            Some(ChannelEstimator::from_params(&config.estimator)?)
        };
        Self::new(
            config.window_capacity,
            &channel,
            estimator.as_ref(),
            &config.header_lengths,
            discount,
        )
    }

    /// Reward for reaching FullContext with no loss after sending `decision`.
    pub fn reward(&self, decision: DecisionKind) -> f64 {
        self.rewards[usize::from(decision.policy_code())]
    }

    #[inline]
    pub fn window_capacity(&self) -> usize {
        self.window_capacity
    }

    #[inline]
    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn is_fully_observable(&self) -> bool {
        self.observations.is_none()
    }

    pub fn transitions(&self) -> &TransitionModel {
        &self.transitions
    }

    pub fn initial_belief(&self) -> &Belief {
        &self.initial_belief
    }

    /// Encodes the model as a POMDPX document.
    ///
    /// # Errors
    /// - [`ExportError::Encode`] - The XML writer failed
    pub fn to_xml(&self) -> Result<String, ExportError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        self.write_xml(&mut writer).map_err(|err| ExportError::Encode {
            reason: err.to_string(),
        })?;
        String::from_utf8(writer.into_inner()).map_err(|err| ExportError::Encode {
            reason: err.to_string(),
        })
    }

    /// Writes the model to a POMDPX file.
    ///
    /// # Errors
    /// - [`ExportError::Encode`] - The XML writer failed
    /// - [`ExportError::Io`] - The file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_xml()?).map_err(|err| ExportError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        info!(
            path = %path.display(),
            dimension = self.transitions.dimension(),
            fully_observable = self.is_fully_observable(),
            "Exported POMDPX model"
        );
        Ok(())
    }

    fn write_xml<W: io::Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("ISO-8859-1"), None)))?;
        let mut root = BytesStart::new("pomdpx");
        root.push_attribute(("version", "0.1"));
        root.push_attribute(("id", "ROHC"));
        root.push_attribute(("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"));
        root.push_attribute(("xsi:noNamespaceSchemaLocation", "pomdpx.xsd"));
        writer.write_event(Event::Start(root))?;

        write_text_element(writer, "Description", &self.description)?;
        write_text_element(writer, "Discount", &self.discount.to_string())?;
        self.write_variables(writer)?;

        writer.write_event(Event::Start(BytesStart::new("InitialStateBelief")))?;
        write_table(
            writer,
            "CondProb",
            STATE_PREVIOUS,
            "null",
            &[("-".to_string(), join(self.initial_belief.as_slice()))],
            "ProbTable",
        )?;
        writer.write_event(Event::End(BytesEnd::new("InitialStateBelief")))?;

        // One dense row-major table per action, previous state outermost.
        let dimension = self.transitions.dimension();
        let transitions: Vec<(String, String)> = decisions_in_policy_order()
            .map(|decision| {
                let values: Vec<f64> = (0..dimension)
                    .flat_map(|from| self.transitions.row(decision, from).iter().copied())
                    .collect();
                (format!("- {} -", action_name(decision)), join(&values))
            })
            .collect();
        writer.write_event(Event::Start(BytesStart::new("StateTransitionFunction")))?;
        write_table(
            writer,
            "CondProb",
            STATE_CURRENT,
            &format!("{} {}", STATE_PREVIOUS, ACTION_VARIABLE),
            &transitions,
            "ProbTable",
        )?;
        writer.write_event(Event::End(BytesEnd::new("StateTransitionFunction")))?;

        match &self.observations {
            Some(observations) => {
                let values: Vec<f64> = (0..dimension)
                    .flat_map(|state| {
                        ChannelState::ALL
                            .map(|observed| observations.likelihood(observed, state))
                    })
                    .collect();
                writer.write_event(Event::Start(BytesStart::new("ObsFunction")))?;
                write_table(
                    writer,
                    "CondProb",
                    OBSERVATION_VARIABLE,
                    STATE_CURRENT,
                    &[("- -".to_string(), join(&values))],
                    "ProbTable",
                )?;
                writer.write_event(Event::End(BytesEnd::new("ObsFunction")))?;
            }
            None => writer.write_event(Event::Empty(BytesStart::new("ObsFunction")))?,
        }

        writer.write_event(Event::Start(BytesStart::new("RewardFunction")))?;
        write_table(
            writer,
            "Func",
            REWARD_VARIABLE,
            &format!("{} {}", ACTION_VARIABLE, STATE_CURRENT),
            &[(
                format!("- s{}", FULL_CONTEXT_BASE_INDEX),
                join(&self.rewards),
            )],
            "ValueTable",
        )?;
        writer.write_event(Event::End(BytesEnd::new("RewardFunction")))?;

        writer.write_event(Event::End(BytesEnd::new("pomdpx")))
    }

    fn write_variables<W: io::Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.write_event(Event::Start(BytesStart::new("Variable")))?;

        let mut state = BytesStart::new("StateVar");
        state.push_attribute(("vnamePrev", STATE_PREVIOUS));
        state.push_attribute(("vnameCurr", STATE_CURRENT));
        if self.is_fully_observable() {
            state.push_attribute(("fullyObs", "true"));
        }
        writer.write_event(Event::Start(state))?;
        write_text_element(writer, "NumValues", &self.transitions.dimension().to_string())?;
        writer.write_event(Event::End(BytesEnd::new("StateVar")))?;

        if !self.is_fully_observable() {
            let mut observation = BytesStart::new("ObsVar");
            observation.push_attribute(("vname", OBSERVATION_VARIABLE));
            writer.write_event(Event::Start(observation))?;
            write_text_element(writer, "ValueEnum", "obad ogood")?;
            writer.write_event(Event::End(BytesEnd::new("ObsVar")))?;
        }

        let names: Vec<&str> = decisions_in_policy_order().map(action_name).collect();
        let mut action = BytesStart::new("ActionVar");
        action.push_attribute(("vname", ACTION_VARIABLE));
        writer.write_event(Event::Start(action))?;
        write_text_element(writer, "ValueEnum", &names.join(" "))?;
        writer.write_event(Event::End(BytesEnd::new("ActionVar")))?;

        let mut reward = BytesStart::new("RewardVar");
        reward.push_attribute(("vname", REWARD_VARIABLE));
        writer.write_event(Event::Empty(reward))?;

        writer.write_event(Event::End(BytesEnd::new("Variable")))
    }
}

/// Short protocol name of a header class.
fn action_name(decision: DecisionKind) -> &'static str {
    match decision {
        DecisionKind::Full => "IR",
        DecisionKind::Partial => "FO",
        DecisionKind::Minimal => "SO",
    }
}

fn decisions_in_policy_order() -> impl Iterator<Item = DecisionKind> {
    (0..DecisionKind::ALL.len() as u8).filter_map(DecisionKind::from_policy_code)
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_text_element<W: io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}

/// Writes a `CondProb` or `Func` block with one `TBL` parameter.
fn write_table<W: io::Write>(
    writer: &mut Writer<W>,
    kind: &str,
    variable: &str,
    parent: &str,
    entries: &[(String, String)],
    table: &str,
) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(kind)))?;
    write_text_element(writer, "Var", variable)?;
    write_text_element(writer, "Parent", parent)?;
    let mut parameter = BytesStart::new("Parameter");
    parameter.push_attribute(("type", "TBL"));
    writer.write_event(Event::Start(parameter))?;
    for (instance, values) in entries {
        writer.write_event(Event::Start(BytesStart::new("Entry")))?;
        write_text_element(writer, "Instance", instance)?;
        write_text_element(writer, table, values)?;
        writer.write_event(Event::End(BytesEnd::new("Entry")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Parameter")))?;
    writer.write_event(Event::End(BytesEnd::new(kind)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::Reader;

    const W: usize = 4;

    /// `(section, instance, values)` of every table entry in a document.
    fn entries(xml: &str) -> Vec<(String, String, Vec<f64>)> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut section = String::new();
        let mut current = String::new();
        let mut instance = String::new();
        let mut found = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Start(element) => {
                    let name = String::from_utf8(element.name().as_ref().to_vec()).unwrap();
                    if name.ends_with("Function") || name == "InitialStateBelief" {
                        section = name.clone();
                    }
                    current = name;
                }
                Event::Text(text) => {
                    let text = text.unescape().unwrap().into_owned();
                    match current.as_str() {
                        "Instance" => instance = text,
                        "ProbTable" | "ValueTable" => found.push((
                            section.clone(),
                            instance.clone(),
                            text.split_whitespace().map(|v| v.parse().unwrap()).collect(),
                        )),
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        found
    }

    fn model(estimator: Option<&ChannelEstimator>) -> PomdpxModel {
        let channel = GilbertElliottChannel::new(0.125, 0.25).unwrap();
        PomdpxModel::new(W, &channel, estimator, &HeaderLengths::default(), 0.95).unwrap()
    }

    #[test]
    fn exported_tables_are_stochastic() {
        let estimator = ChannelEstimator::new(0.1, 0.2).unwrap();
        let xml = model(Some(&estimator)).to_xml().unwrap();
        let found = entries(&xml);
        let dimension = AugmentedState::dimension(W);

        let transitions: Vec<_> = found
            .iter()
            .filter(|(section, _, _)| section == "StateTransitionFunction")
            .collect();
        assert_eq!(transitions.len(), 3);
        for (_, _, values) in &transitions {
            assert_eq!(values.len(), dimension * dimension);
            for row in values.chunks(dimension) {
                assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            }
        }

        let (_, _, observations) = found
            .iter()
            .find(|(section, _, _)| section == "ObsFunction")
            .unwrap();
        assert_eq!(observations.len(), dimension * 2);
        for pair in observations.chunks(2) {
            assert!((pair[0] + pair[1] - 1.0).abs() < 1e-12);
        }
        // NoContext-Bad reads Bad unless missed.
        assert!((observations[0] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn reward_is_earned_on_full_context() {
        let xml = model(None).to_xml().unwrap();
        let found = entries(&xml);
        let (_, instance, rewards) = found
            .iter()
            .find(|(section, _, _)| section == "RewardFunction")
            .unwrap();
        assert_eq!(instance, "- s4");

        let lengths = HeaderLengths::default();
        for decision in DecisionKind::ALL {
            let expected = f64::from(lengths.payload) / lengths.packet(decision) as f64;
            assert!((rewards[usize::from(decision.policy_code())] - expected).abs() < 1e-12);
        }
        assert!(rewards[usize::from(DecisionKind::Minimal.policy_code())]
            > rewards[usize::from(DecisionKind::Full.policy_code())]);
    }

    #[test]
    fn initial_belief_is_no_context_at_steady_state() {
        let xml = model(None).to_xml().unwrap();
        let (_, instance, initial) = entries(&xml)
            .into_iter()
            .find(|(section, _, _)| section == "InitialStateBelief")
            .unwrap();
        assert_eq!(instance, "-");
        assert_eq!(initial.len(), AugmentedState::dimension(W));
        assert!((initial[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((initial[1] - 2.0 / 3.0).abs() < 1e-12);
        assert!(initial[2..].iter().all(|&p| p == 0.0));
    }

    #[test]
    fn fully_observable_model_has_no_observations() {
        let model = model(None);
        assert!(model.is_fully_observable());
        let xml = model.to_xml().unwrap();
        assert!(xml.contains(r#"fullyObs="true""#));
        assert!(!xml.contains("ObsVar"));
        assert!(
            entries(&xml)
                .iter()
                .all(|(section, _, _)| section != "ObsFunction")
        );
    }

    #[test]
    fn actions_follow_policy_codes() {
        let xml = model(None).to_xml().unwrap();
        assert!(xml.contains("<ValueEnum>IR SO FO</ValueEnum>"));
        assert!(xml.contains("<Instance>- SO -</Instance>"));
    }

    #[test]
    fn invalid_discount_is_rejected() {
        let channel = GilbertElliottChannel::new(0.125, 0.25).unwrap();
        let err = PomdpxModel::new(W, &channel, None, &HeaderLengths::default(), 1.0).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ProbabilityOutOfRange { name: "discount", .. }
        ));
    }

    #[test]
    fn saved_model_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.pomdpx");
        let config = SimConfig {
            window_capacity: W,
            ..Default::default()
        };
        let model = PomdpxModel::from_config(&config, 0.9, false).unwrap();
        model.save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, model.to_xml().unwrap());
        assert_eq!(model.discount(), 0.9);
    }
}
