use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Label reported when no toxicity category reaches the threshold.
pub const NONE_LABEL: &str = "none";

/// The six toxicity categories the model scores, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToxicityLabel {
    Toxic,
    SevereToxic,
    Obscene,
    Threat,
    Insult,
    IdentityHate,
}

impl ToxicityLabel {
    /// All labels, ordered as the logits produced by the model.
    pub const ALL: [ToxicityLabel; 6] = [
        Self::Toxic,
        Self::SevereToxic,
        Self::Obscene,
        Self::Threat,
        Self::Insult,
        Self::IdentityHate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Toxic => "toxic",
            Self::SevereToxic => "severe_toxic",
            Self::Obscene => "obscene",
            Self::Threat => "threat",
            Self::Insult => "insult",
            Self::IdentityHate => "identity_hate",
        }
    }

    /// Position of the label in the model output.
    pub fn index(&self) -> usize {
        match self {
            Self::Toxic => 0,
            Self::SevereToxic => 1,
            Self::Obscene => 2,
            Self::Threat => 3,
            Self::Insult => 4,
            Self::IdentityHate => 5,
        }
    }
}

impl fmt::Display for ToxicityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the six label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown label '{}'", self.0)
    }
}

impl std::error::Error for UnknownLabel {}

impl FromStr for ToxicityLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// One value per toxicity label.
///
/// Used for model probabilities (`LabelMap<f32>`) and for stored feedback
/// flags (`LabelMap<bool>`). Serializes as an object keyed by label name in
/// model output order, so the six keys are always present.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelMap<T> {
    pub toxic: T,
    pub severe_toxic: T,
    pub obscene: T,
    pub threat: T,
    pub insult: T,
    pub identity_hate: T,
}

impl<T: Copy> LabelMap<T> {
    /// Builds a map by evaluating `f` once per label, in order.
    pub fn from_fn(mut f: impl FnMut(ToxicityLabel) -> T) -> Self {
        Self {
            toxic: f(ToxicityLabel::Toxic),
            severe_toxic: f(ToxicityLabel::SevereToxic),
            obscene: f(ToxicityLabel::Obscene),
            threat: f(ToxicityLabel::Threat),
            insult: f(ToxicityLabel::Insult),
            identity_hate: f(ToxicityLabel::IdentityHate),
        }
    }

    pub fn get(&self, label: ToxicityLabel) -> T {
        match label {
            ToxicityLabel::Toxic => self.toxic,
            ToxicityLabel::SevereToxic => self.severe_toxic,
            ToxicityLabel::Obscene => self.obscene,
            ToxicityLabel::Threat => self.threat,
            ToxicityLabel::Insult => self.insult,
            ToxicityLabel::IdentityHate => self.identity_hate,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ToxicityLabel, T)> + '_ {
        ToxicityLabel::ALL.iter().map(move |&label| (label, self.get(label)))
    }
}
