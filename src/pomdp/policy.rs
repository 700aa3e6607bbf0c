//! Alpha-vector policies and the policy-file format.
//!
//! A policy file is an XML document containing any number of
//! `<Vector action="N">` elements, usually grouped under an
//! `<AlphaVector vectorLength="…">` element. The text of each vector is a
//! whitespace-separated list of `4 + W` numbers. Vector order in the file is
//! significant: it breaks ties between equally valued pieces.

use std::io;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::{info, warn};

use crate::constants::{
    POLICY_ACTION_ATTRIBUTE, POLICY_ALPHA_VECTOR_ELEMENT, POLICY_VECTOR_ELEMENT,
    POLICY_VECTOR_LENGTH_ATTRIBUTE,
};
use crate::error::PolicyError;
use crate::pomdp::belief::Belief;
use crate::types::DecisionKind;

/// One linear piece of the value function and the decision it recommends.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyPiece {
    pub alpha: Vec<f64>,
    pub decision: DecisionKind,
}

impl PolicyPiece {
    pub fn new(alpha: Vec<f64>, decision: DecisionKind) -> Self {
        Self { alpha, decision }
    }
}

/// Non-empty ordered set of policy pieces of a common dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicySet {
    pieces: Vec<PolicyPiece>,
    dimension: usize,
}

impl PolicySet {
    /// Builds a policy set after checking every piece against `dimension`.
    ///
    /// # Errors
    /// - [`PolicyError::Empty`] - `pieces` is empty
    /// - [`PolicyError::DimensionMismatch`] - A piece's alpha vector has the wrong length
    pub fn new(pieces: Vec<PolicyPiece>, dimension: usize) -> Result<Self, PolicyError> {
        if pieces.is_empty() {
            return Err(PolicyError::Empty);
        }
        if let Some((index, piece)) = pieces
            .iter()
            .enumerate()
            .find(|(_, piece)| piece.alpha.len() != dimension)
        {
            warn!(
                index,
                expected = dimension,
                got = piece.alpha.len(),
                "Rejecting policy piece of wrong dimension"
            );
            return Err(PolicyError::DimensionMismatch {
                index,
                expected: dimension,
                got: piece.alpha.len(),
            });
        }
        Ok(Self { pieces, dimension })
    }

    /// Reads and decodes a policy file.
    ///
    /// The file is read completely before decoding, so its handle is released
    /// on every path.
    ///
    /// # Errors
    /// - [`PolicyError::Io`] - The file cannot be read
    /// - Any error of [`PolicySet::from_xml_str`]
    pub fn load(path: impl AsRef<Path>, dimension: usize) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| PolicyError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let policy = Self::from_xml_str(&text, dimension)?;
        info!(
            path = %path.display(),
            pieces = policy.len(),
            dimension,
            "Loaded compressor policy"
        );
        Ok(policy)
    }

    /// Decodes a policy document.
    ///
    /// # Errors
    /// - [`PolicyError::Malformed`] - The document is not well-formed XML
    /// - [`PolicyError::MissingAction`] - A vector has no action attribute
    /// - [`PolicyError::UnknownAction`] - An action code is not 0, 1 or 2
    /// - [`PolicyError::InvalidNumber`] - A vector entry is not a finite number
    /// - [`PolicyError::DimensionMismatch`] - A vector does not have `dimension` entries
    /// - [`PolicyError::AnnouncedLengthMismatch`] - `vectorLength` disagrees with `dimension`
    /// - [`PolicyError::Empty`] - The document holds no vectors
    pub fn from_xml_str(text: &str, dimension: usize) -> Result<Self, PolicyError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut pieces = Vec::new();
        let mut open_vector: Option<(DecisionKind, String)> = None;

        loop {
            let event = reader.read_event().map_err(|err| PolicyError::Malformed {
                position: reader.buffer_position() as u64,
                reason: err.to_string(),
            })?;
            let position = reader.buffer_position() as u64;
            match event {
                Event::Start(element) => match element.name().as_ref() {
                    name if name == POLICY_VECTOR_ELEMENT.as_bytes() => {
                        let decision = vector_action(&element, pieces.len(), position)?;
                        open_vector = Some((decision, String::new()));
                    }
                    name if name == POLICY_ALPHA_VECTOR_ELEMENT.as_bytes() => {
                        check_announced_length(&element, dimension, position)?;
                    }
                    _ => {}
                },
                Event::Empty(element) => match element.name().as_ref() {
                    name if name == POLICY_VECTOR_ELEMENT.as_bytes() => {
                        let decision = vector_action(&element, pieces.len(), position)?;
                        pieces.push(decode_vector(pieces.len(), decision, "", dimension)?);
                    }
                    name if name == POLICY_ALPHA_VECTOR_ELEMENT.as_bytes() => {
                        check_announced_length(&element, dimension, position)?;
                    }
                    _ => {}
                },
                Event::Text(content) => {
                    if let Some((_, buffer)) = open_vector.as_mut() {
                        buffer.push_str(&String::from_utf8_lossy(&content));
                        buffer.push(' ');
                    }
                }
                Event::End(element) if element.name().as_ref() == POLICY_VECTOR_ELEMENT.as_bytes() => {
                    if let Some((decision, buffer)) = open_vector.take() {
                        pieces.push(decode_vector(pieces.len(), decision, &buffer, dimension)?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Self::new(pieces, dimension)
    }

    /// Piece with the greatest expected value under `belief`.
    ///
    /// Only a strictly greater value replaces the current best, so the first
    /// piece in order wins exact ties.
    pub fn best_piece(&self, belief: &Belief) -> &PolicyPiece {
        let mut best = &self.pieces[0];
        let mut best_value = belief.expected_value(&best.alpha);
        for piece in &self.pieces[1..] {
            let value = belief.expected_value(&piece.alpha);
            if value > best_value {
                best = piece;
                best_value = value;
            }
        }
        best
    }

    /// Decision recommended for `belief`.
    pub fn decide(&self, belief: &Belief) -> DecisionKind {
        self.best_piece(belief).decision
    }

    /// Expected value of every piece under `belief`, in piece order.
    pub fn expected_values(&self, belief: &Belief) -> Vec<f64> {
        self.pieces
            .iter()
            .map(|piece| belief.expected_value(&piece.alpha))
            .collect()
    }

    /// Encodes the set in the policy-file format accepted by [`PolicySet::from_xml_str`].
    ///
    /// # Errors
    /// - [`PolicyError::Encode`] - The XML writer failed
    pub fn to_xml(&self) -> Result<String, PolicyError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        self.write_xml(&mut writer)
            .map_err(|err| PolicyError::Encode {
                reason: err.to_string(),
            })?;
        String::from_utf8(writer.into_inner()).map_err(|err| PolicyError::Encode {
            reason: err.to_string(),
        })
    }

    /// Writes the set as a policy file.
    ///
    /// # Errors
    /// - [`PolicyError::Io`] - The file cannot be written
    /// - [`PolicyError::Encode`] - The XML writer failed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PolicyError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_xml()?).map_err(|err| PolicyError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        info!(path = %path.display(), pieces = self.len(), "Saved compressor policy");
        Ok(())
    }

    fn write_xml<W: io::Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        let dimension = self.dimension.to_string();
        let vectors = self.pieces.len().to_string();

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("ISO-8859-1"), None)))?;
        let mut policy = BytesStart::new("Policy");
        policy.push_attribute(("version", "0.1"));
        policy.push_attribute(("type", "value"));
        policy.push_attribute(("numStates", dimension.as_str()));
        policy.push_attribute(("numActions", DecisionKind::ALL.len().to_string().as_str()));
        writer.write_event(Event::Start(policy))?;

        let mut group = BytesStart::new(POLICY_ALPHA_VECTOR_ELEMENT);
        group.push_attribute((POLICY_VECTOR_LENGTH_ATTRIBUTE, dimension.as_str()));
        group.push_attribute(("numObsValue", "1"));
        group.push_attribute(("numVectors", vectors.as_str()));
        writer.write_event(Event::Start(group))?;

        for piece in &self.pieces {
            let code = piece.decision.policy_code().to_string();
            let mut vector = BytesStart::new(POLICY_VECTOR_ELEMENT);
            vector.push_attribute((POLICY_ACTION_ATTRIBUTE, code.as_str()));
            vector.push_attribute(("obsValue", "0"));
            let values: Vec<String> = piece.alpha.iter().map(f64::to_string).collect();
            writer.write_event(Event::Start(vector))?;
            writer.write_event(Event::Text(BytesText::new(&values.join(" "))))?;
            writer.write_event(Event::End(BytesEnd::new(POLICY_VECTOR_ELEMENT)))?;
        }

        writer.write_event(Event::End(BytesEnd::new(POLICY_ALPHA_VECTOR_ELEMENT)))?;
        writer.write_event(Event::End(BytesEnd::new("Policy")))
    }

    pub fn pieces(&self) -> &[PolicyPiece] {
        &self.pieces
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Always `false`; an empty set cannot be constructed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

/// Reads and decodes the action attribute of vector number `index`.
///
/// `position` is the reader offset just past the element, used in errors.
fn vector_action(
    element: &BytesStart<'_>,
    index: usize,
    position: u64,
) -> Result<DecisionKind, PolicyError> {
    let attribute = element
        .try_get_attribute(POLICY_ACTION_ATTRIBUTE)
        .map_err(|err| PolicyError::Malformed {
            position,
            reason: err.to_string(),
        })?
        .ok_or(PolicyError::MissingAction {
            index,
            attribute: POLICY_ACTION_ATTRIBUTE,
        })?;
    let code = String::from_utf8_lossy(&attribute.value).trim().to_string();
    code.parse::<u8>()
        .ok()
        .and_then(DecisionKind::from_policy_code)
        .ok_or_else(|| {
            warn!(index, code = %code, "Rejecting policy vector with unknown action");
            PolicyError::UnknownAction { index, code }
        })
}

/// Checks an `AlphaVector` element's announced vector length, if any.
fn check_announced_length(
    element: &BytesStart<'_>,
    dimension: usize,
    position: u64,
) -> Result<(), PolicyError> {
    let attribute = element
        .try_get_attribute(POLICY_VECTOR_LENGTH_ATTRIBUTE)
        .map_err(|err| PolicyError::Malformed {
            position,
            reason: err.to_string(),
        })?;
    let Some(attribute) = attribute else {
        return Ok(());
    };
    let announced = String::from_utf8_lossy(&attribute.value).trim().to_string();
    match announced.parse::<usize>() {
        Ok(length) if length == dimension => Ok(()),
        _ => Err(PolicyError::AnnouncedLengthMismatch {
            announced,
            expected: dimension,
        }),
    }
}

/// Parses the whitespace-separated entries of vector number `index`.
fn decode_vector(
    index: usize,
    decision: DecisionKind,
    text: &str,
    dimension: usize,
) -> Result<PolicyPiece, PolicyError> {
    let alpha = text
        .split_whitespace()
        .enumerate()
        .map(|(position, token)| match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(PolicyError::InvalidNumber {
                index,
                position,
                token: token.to_string(),
            }),
        })
        .collect::<Result<Vec<f64>, PolicyError>>()?;

    if alpha.len() != dimension {
        warn!(
            index,
            expected = dimension,
            got = alpha.len(),
            "Rejecting policy vector of wrong length"
        );
        return Err(PolicyError::DimensionMismatch {
            index,
            expected: dimension,
            got: alpha.len(),
        });
    }
    Ok(PolicyPiece::new(alpha, decision))
}
