//! Run configuration.
//!
//! Every option has a default, so an empty TOML document is a valid
//! configuration. CLI switches map one-to-one onto these fields.

use crate::error::IaaError;
use crate::matcher::MatchOptions;
use crate::schema::AttributeSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;

/// Whether unmatched mentions get a second, overlap-based chance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMode {
    #[default]
    ExactOnly,
    Fallback,
}

impl std::fmt::Display for MatchingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactOnly => write!(f, "exact_only"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

impl std::str::FromStr for MatchingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "exact_only" | "exact" => Ok(Self::ExactOnly),
            "fallback" => Ok(Self::Fallback),
            _ => Err(format!("unknown matching mode: {s}")),
        }
    }
}

/// Overlap ratio used by the fallback phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapMeasure {
    /// `|a ∩ b| / |a ∪ b|`
    #[default]
    Jaccard,
    /// `2|a ∩ b| / (|a| + |b|)`
    Dice,
}

impl std::fmt::Display for OverlapMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jaccard => write!(f, "jaccard"),
            Self::Dice => write!(f, "dice"),
        }
    }
}

impl std::str::FromStr for OverlapMeasure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jaccard" | "iou" => Ok(Self::Jaccard),
            "dice" => Ok(Self::Dice),
            _ => Err(format!("unknown overlap measure: {s}")),
        }
    }
}

/// How rows with an empty slot enter observed agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// An empty slot is its own category and always a disagreement.
    #[default]
    IncludeAsDisagreement,
    /// Rows with an empty slot leave the denominator.
    ExcludeFromDenominator,
}

impl UnmatchedPolicy {
    pub fn excludes_unmatched(self) -> bool {
        self == Self::ExcludeFromDenominator
    }
}

/// An agreement statistic the calculator can produce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    ObservedAgreement,
    /// Cohen's kappa per pair, macro-averaged across pairs.
    ChanceCorrected,
    ConfusionTable,
    /// Nominal Krippendorff's alpha over all annotators in scope.
    KrippendorffAlpha,
    /// Span-level detection precision/recall/F1, attribute independent.
    Detection,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::ObservedAgreement,
        Metric::ChanceCorrected,
        Metric::ConfusionTable,
        Metric::KrippendorffAlpha,
        Metric::Detection,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ObservedAgreement => "observed_agreement",
            Self::ChanceCorrected => "chance_corrected",
            Self::ConfusionTable => "confusion_table",
            Self::KrippendorffAlpha => "krippendorff_alpha",
            Self::Detection => "detection",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "kappa" | "cohen_kappa" => Ok(Self::ChanceCorrected),
            "alpha" => Ok(Self::KrippendorffAlpha),
            "observed" => Ok(Self::ObservedAgreement),
            "confusion" => Ok(Self::ConfusionTable),
            other => Self::ALL
                .into_iter()
                .find(|m| m.name() == other)
                .ok_or_else(|| format!("unknown metric: {s}")),
        }
    }
}

/// A name filter: everything, or an explicit set.
///
/// Written as the string `"all"` or as a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl Selection {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.contains(name),
        }
    }
}

impl std::str::FromStr for Selection {
    type Err = String;

    /// `all`, or a comma-separated list of names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let names: BTreeSet<String> = s
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(format!("empty selection: `{s}`"));
        }
        Ok(Self::Only(names))
    }
}

impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str("all"),
            Self::Only(names) => names.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Keyword(String),
            Names(Vec<String>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Keyword(word) if word.eq_ignore_ascii_case("all") => Ok(Self::All),
            Repr::Keyword(word) => Err(serde::de::Error::custom(format!(
                "expected `all` or a list of names, got `{word}`"
            ))),
            Repr::Names(names) => Ok(Self::Only(names.into_iter().collect())),
        }
    }
}

fn default_threshold() -> f64 {
    0.5
}

fn default_metrics() -> BTreeSet<Metric> {
    [
        Metric::ObservedAgreement,
        Metric::ChanceCorrected,
        Metric::ConfusionTable,
    ]
    .into_iter()
    .collect()
}

fn default_true() -> bool {
    true
}

/// Options for one IAA run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub matching_mode: MatchingMode,

    /// Minimum overlap ratio, in (0, 1], for a fallback pair to be accepted.
    #[serde(default = "default_threshold")]
    pub min_overlap_threshold: f64,

    #[serde(default)]
    pub overlap_measure: OverlapMeasure,

    /// Never pair mentions whose sentence indices are both known and differ.
    #[serde(default = "default_true")]
    pub same_sentence_only: bool,

    /// Head-set Dice, in (0, 1], that pairs overlapping mentions ahead of the
    /// span measure during fallback. Unset means heads are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_threshold: Option<f64>,

    #[serde(default)]
    pub annotator_subset: Selection,

    #[serde(default)]
    pub attribute_subset: Selection,

    /// Anchor annotator for multi-way alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_annotator: Option<String>,

    #[serde(default)]
    pub unmatched_policy: UnmatchedPolicy,

    #[serde(default = "default_metrics")]
    pub metrics: BTreeSet<Metric>,

    /// Report the mean over annotator pairs next to each pairwise value.
    #[serde(default = "default_true")]
    pub macro_average: bool,

    /// Abort an attribute when a mention lacks it instead of reading it as absent.
    #[serde(default)]
    pub require_complete_attributes: bool,

    #[serde(default, skip_serializing_if = "AttributeSchema::is_empty")]
    pub schema: AttributeSchema,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            matching_mode: MatchingMode::default(),
            min_overlap_threshold: default_threshold(),
            overlap_measure: OverlapMeasure::default(),
            same_sentence_only: true,
            head_threshold: None,
            annotator_subset: Selection::All,
            attribute_subset: Selection::All,
            reference_annotator: None,
            unmatched_policy: UnmatchedPolicy::default(),
            metrics: default_metrics(),
            macro_average: true,
            require_complete_attributes: false,
            schema: AttributeSchema::default(),
        }
    }
}

impl RunConfig {
    /// Parse and validate a TOML configuration document.
    pub fn from_toml_str(text: &str) -> Result<Self, IaaError> {
        let config: Self =
            toml::from_str(text).map_err(|e| IaaError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IaaError> {
        let t = self.min_overlap_threshold;
        if !(t.is_finite() && t > 0.0 && t <= 1.0) {
            return Err(IaaError::InvalidConfig(format!(
                "min_overlap_threshold must be in (0, 1], got {t}"
            )));
        }
        if let Some(t) = self.head_threshold
            && !(t.is_finite() && t > 0.0 && t <= 1.0)
        {
            return Err(IaaError::InvalidConfig(format!(
                "head_threshold must be in (0, 1], got {t}"
            )));
        }
        if let Selection::Only(names) = &self.annotator_subset
            && names.len() < 2
        {
            return Err(IaaError::InvalidConfig(format!(
                "annotator_subset needs at least 2 annotators, got {}",
                names.len()
            )));
        }
        if let Selection::Only(names) = &self.attribute_subset
            && names.is_empty()
        {
            return Err(IaaError::InvalidConfig(
                "attribute_subset is an empty list".to_string(),
            ));
        }
        if let Some(reference) = &self.reference_annotator
            && !self.annotator_subset.contains(reference)
        {
            return Err(IaaError::InvalidConfig(format!(
                "reference_annotator `{reference}` is outside annotator_subset"
            )));
        }
        if self.metrics.is_empty() {
            return Err(IaaError::InvalidConfig("no metrics requested".to_string()));
        }
        Ok(())
    }

    pub fn wants(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            fallback: self.matching_mode == MatchingMode::Fallback,
            min_overlap_threshold: self.min_overlap_threshold,
            measure: self.overlap_measure,
            same_sentence_only: self.same_sentence_only,
            head_threshold: self.head_threshold,
        }
    }
}
