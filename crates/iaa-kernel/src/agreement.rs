//! Agreement statistics over an aligned table.
//!
//! Every statistic is computed per attribute from a [`RatingGrid`]: one unit
//! per contributing row, one optional rating per annotator in scope.
//!
//! - **Observed agreement**: fraction of units on which all participating
//!   annotators give the same rating.
//! - **Cohen's kappa**: `(p_o - p_e) / (1 - p_e)` per annotator pair, from
//!   that pair's confusion table, optionally macro-averaged across pairs.
//! - **Krippendorff's alpha** (nominal): `1 - (n - 1) D_o / D_e` over the
//!   coincidence matrix of all annotators in scope.
//!
//! Degenerate inputs yield [`Score::NotComputable`], never a panic or NaN.

use crate::align::{AlignedTable, Cell};
use crate::config::{Metric, UnmatchedPolicy};
use crate::error::IaaError;
use crate::mention::AttributeValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One annotator's value for one attribute in one row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Label(String),
    /// The mention carries no value for the attribute.
    Absent,
    /// The annotator marked no mention in this row.
    NoMention,
}

impl Rating {
    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    pub fn is_no_mention(&self) -> bool {
        matches!(self, Self::NoMention)
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Label(label) => f.write_str(label),
            Self::Absent => f.write_str("<absent>"),
            Self::NoMention => f.write_str("<no mention>"),
        }
    }
}

/// A scalar statistic, or the reason it could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Score {
    Value { value: f64 },
    NotComputable { reason: String },
}

impl Score {
    pub fn value(value: f64) -> Self {
        Self::Value { value }
    }

    pub fn not_computable(reason: impl Into<String>) -> Self {
        Self::NotComputable {
            reason: reason.into(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Value { value } => Some(*value),
            Self::NotComputable { .. } => None,
        }
    }

    /// Mean of the computable scores.
    pub fn mean<'a>(scores: impl IntoIterator<Item = &'a Score>) -> Score {
        let values: Vec<f64> = scores.into_iter().filter_map(Score::as_f64).collect();
        if values.is_empty() {
            return Score::not_computable("no computable pair");
        }
        Score::value(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Value-by-value counts for one annotator pair.
///
/// `counts[i][j]` is the number of items rated `labels[i]` by `left` and
/// `labels[j]` by `right`. Labels are sorted, with [`Rating::Absent`] and
/// [`Rating::NoMention`] after all named labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionTable {
    pub left: String,
    pub right: String,
    pub labels: Vec<Rating>,
    pub counts: Vec<Vec<u64>>,
}

impl ConfusionTable {
    pub fn from_items(
        left: impl Into<String>,
        right: impl Into<String>,
        items: &[(Rating, Rating)],
    ) -> Self {
        let labels: Vec<Rating> = items
            .iter()
            .flat_map(|(a, b)| [a.clone(), b.clone()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: BTreeMap<&Rating, usize> =
            labels.iter().enumerate().map(|(i, r)| (r, i)).collect();

        let mut counts = vec![vec![0u64; labels.len()]; labels.len()];
        for (a, b) in items {
            counts[index[a]][index[b]] += 1;
        }
        Self {
            left: left.into(),
            right: right.into(),
            labels,
            counts,
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Per-label totals for the left annotator.
    pub fn row_sums(&self) -> Vec<u64> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Per-label totals for the right annotator.
    pub fn column_sums(&self) -> Vec<u64> {
        (0..self.labels.len())
            .map(|j| self.counts.iter().map(|row| row[j]).sum())
            .collect()
    }

    fn diagonal(&self) -> u64 {
        (0..self.labels.len()).map(|i| self.counts[i][i]).sum()
    }

    pub fn observed_agreement(&self) -> Score {
        let n = self.total();
        if n == 0 {
            return Score::not_computable("no rated items");
        }
        Score::value(self.diagonal() as f64 / n as f64)
    }

    pub fn cohen_kappa(&self) -> Score {
        let n = self.total();
        if n == 0 {
            return Score::not_computable("no rated items");
        }
        let rows = self.row_sums();
        let cols = self.column_sums();

        // Both marginals on one shared category.
        if rows.iter().zip(&cols).any(|(r, c)| *r == n && *c == n) {
            return Score::value(1.0);
        }

        let n = n as f64;
        let p_o = self.diagonal() as f64 / n;
        let p_e = rows
            .iter()
            .zip(&cols)
            .map(|(r, c)| (*r as f64 / n) * (*c as f64 / n))
            .sum::<f64>();
        if 1.0 - p_e == 0.0 {
            return Score::not_computable("expected agreement is 1");
        }
        Score::value((p_o - p_e) / (1.0 - p_e))
    }
}

/// Ratings for one attribute: `units[u][a]` is annotator `a`'s rating in
/// unit `u`, or `None` when `a` does not participate in that row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingGrid {
    pub annotators: Vec<String>,
    pub units: Vec<Vec<Option<Rating>>>,
}

impl RatingGrid {
    fn position(&self, annotator: &str) -> Result<usize, IaaError> {
        self.annotators
            .iter()
            .position(|a| a == annotator)
            .ok_or_else(|| IaaError::InvalidConfig(format!("annotator `{annotator}` not in scope")))
    }

    /// Rating pairs for annotators `i` and `j`.
    ///
    /// Units where either side is missing, or both marked nothing, are
    /// skipped. Under the exclude policy any "no mention" drops the unit.
    fn pair_items(&self, i: usize, j: usize, policy: UnmatchedPolicy) -> Vec<(Rating, Rating)> {
        self.units
            .iter()
            .filter_map(|unit| match (&unit[i], &unit[j]) {
                (Some(a), Some(b)) => Some((a, b)),
                _ => None,
            })
            .filter(|(a, b)| !(a.is_no_mention() && b.is_no_mention()))
            .filter(|(a, b)| {
                !(policy.excludes_unmatched() && (a.is_no_mention() || b.is_no_mention()))
            })
            .map(|(a, b)| (a.clone(), b.clone()))
            .collect()
    }

    fn confusion(&self, i: usize, j: usize, policy: UnmatchedPolicy) -> ConfusionTable {
        ConfusionTable::from_items(
            &self.annotators[i],
            &self.annotators[j],
            &self.pair_items(i, j, policy),
        )
    }

    fn observed(&self, policy: UnmatchedPolicy) -> Score {
        let mut considered = 0u64;
        let mut agreed = 0u64;
        for unit in &self.units {
            let ratings: Vec<&Rating> = unit.iter().flatten().collect();
            if ratings.iter().any(|r| r.is_no_mention()) {
                if !policy.excludes_unmatched() {
                    considered += 1;
                }
                continue;
            }
            considered += 1;
            if ratings.windows(2).all(|w| w[0] == w[1]) {
                agreed += 1;
            }
        }
        if considered == 0 {
            return Score::not_computable("no rated items");
        }
        Score::value(agreed as f64 / considered as f64)
    }

    fn alpha(&self, policy: UnmatchedPolicy) -> Score {
        let mut categories: BTreeMap<&Rating, usize> = BTreeMap::new();
        for rating in self.units.iter().flatten().flatten() {
            let next = categories.len();
            categories.entry(rating).or_insert(next);
        }
        let k = categories.len();
        let mut coincidence = vec![vec![0f64; k]; k];

        for unit in &self.units {
            let values: Vec<usize> = unit
                .iter()
                .flatten()
                .filter(|r| !(policy.excludes_unmatched() && r.is_no_mention()))
                .map(|r| categories[r])
                .collect();
            let m = values.len();
            if m < 2 {
                continue;
            }
            let weight = 1.0 / (m as f64 - 1.0);
            for (x, &c) in values.iter().enumerate() {
                for (y, &d) in values.iter().enumerate() {
                    if x != y {
                        coincidence[c][d] += weight;
                    }
                }
            }
        }

        let totals: Vec<f64> = coincidence.iter().map(|row| row.iter().sum()).collect();
        let n: f64 = totals.iter().sum();
        if n == 0.0 {
            return Score::not_computable("no pairable values");
        }
        if totals.iter().filter(|&&t| t > 0.0).count() == 1 {
            return Score::value(1.0);
        }

        let disagreement: f64 = (0..k)
            .flat_map(|c| (0..k).map(move |d| (c, d)))
            .filter(|(c, d)| c != d)
            .map(|(c, d)| coincidence[c][d])
            .sum();
        let expected = n * n - totals.iter().map(|t| t * t).sum::<f64>();
        if expected == 0.0 {
            return Score::not_computable("expected disagreement is 0");
        }
        Score::value(1.0 - (n - 1.0) * disagreement / expected)
    }
}

/// Which annotators a result covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Pair { left: String, right: String },
    AllAnnotators,
    MacroAverage,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pair { left, right } => write!(f, "{left} ~ {right}"),
            Self::AllAnnotators => f.write_str("all annotators"),
            Self::MacroAverage => f.write_str("macro average"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Scalar { value: f64 },
    ConfusionTable { table: ConfusionTable },
    NotComputable { reason: String },
}

impl From<Score> for Outcome {
    fn from(score: Score) -> Self {
        match score {
            Score::Value { value } => Self::Scalar { value },
            Score::NotComputable { reason } => Self::NotComputable { reason },
        }
    }
}

impl Outcome {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Scalar { value } => Some(*value),
            _ => None,
        }
    }
}

/// One (attribute, metric, scope) entry of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementResult {
    pub attribute: String,
    pub metric: Metric,
    pub scope: Scope,
    pub outcome: Outcome,
}

/// Computes agreement statistics over a shared, read-only table.
#[derive(Debug, Clone)]
pub struct AgreementCalculator<'a> {
    table: &'a AlignedTable,
    policy: UnmatchedPolicy,
    scope: Vec<usize>,
    strict: bool,
}

impl<'a> AgreementCalculator<'a> {
    /// All table columns in scope, missing attributes read as absent.
    pub fn new(table: &'a AlignedTable, policy: UnmatchedPolicy) -> Self {
        Self {
            table,
            policy,
            scope: (0..table.annotators.len()).collect(),
            strict: false,
        }
    }

    /// Restrict to the named annotators, kept in column order.
    pub fn with_scope<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self, IaaError> {
        let mut scope = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let col = self.table.column(name).ok_or_else(|| {
                IaaError::InvalidConfig(format!("annotator `{name}` is not a table column"))
            })?;
            scope.push(col);
        }
        scope.sort_unstable();
        scope.dedup();
        self.scope = scope;
        Ok(self)
    }

    /// Fail with `UnknownAttribute` instead of reading a missing attribute as absent.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn annotators(&self) -> Vec<&str> {
        self.scope
            .iter()
            .map(|&c| self.table.annotators[c].as_str())
            .collect()
    }

    /// Annotator pairs in scope, in column order.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let names = self.annotators();
        let mut pairs = Vec::new();
        for i in 0..names.len() {
            for j in i + 1..names.len() {
                pairs.push((names[i], names[j]));
            }
        }
        pairs
    }

    /// Ratings of `attribute` over the rows that contribute to this scope.
    pub fn ratings(&self, attribute: &str) -> Result<RatingGrid, IaaError> {
        let mut units = Vec::new();
        for row in &self.table.rows {
            let cells: Vec<(usize, &Cell)> =
                self.scope.iter().map(|&c| (c, &row.cells[c])).collect();
            let participating = cells.iter().filter(|(_, c)| c.participates()).count();
            let mentioned = cells.iter().any(|(_, c)| c.mention().is_some());
            if participating < 2 || !mentioned {
                continue;
            }

            let mut unit = Vec::with_capacity(cells.len());
            for (col, cell) in cells {
                unit.push(match cell {
                    Cell::NotAnnotated => None,
                    Cell::NoMention => Some(Rating::NoMention),
                    Cell::Mention(mention) => Some(match mention.attribute(attribute) {
                        Some(AttributeValue::Label(label)) => Rating::Label(label.clone()),
                        Some(AttributeValue::Absent) => Rating::Absent,
                        None if self.strict => {
                            return Err(IaaError::UnknownAttribute {
                                attribute: attribute.to_string(),
                                annotator: self.table.annotators[col].clone(),
                                source_id: mention.source_id.clone(),
                            });
                        }
                        None => Rating::Absent,
                    }),
                });
            }
            units.push(unit);
        }
        Ok(RatingGrid {
            annotators: self.annotators().into_iter().map(str::to_string).collect(),
            units,
        })
    }

    /// Observed agreement over all annotators in scope.
    pub fn observed_agreement(&self, attribute: &str) -> Result<Score, IaaError> {
        Ok(self.ratings(attribute)?.observed(self.policy))
    }

    pub fn pair_observed_agreement(
        &self,
        attribute: &str,
        left: &str,
        right: &str,
    ) -> Result<Score, IaaError> {
        Ok(self.confusion_table(attribute, left, right)?.observed_agreement())
    }

    pub fn confusion_table(
        &self,
        attribute: &str,
        left: &str,
        right: &str,
    ) -> Result<ConfusionTable, IaaError> {
        let grid = self.ratings(attribute)?;
        let (i, j) = (grid.position(left)?, grid.position(right)?);
        Ok(grid.confusion(i, j, self.policy))
    }

    pub fn cohen_kappa(&self, attribute: &str, left: &str, right: &str) -> Result<Score, IaaError> {
        Ok(self.confusion_table(attribute, left, right)?.cohen_kappa())
    }

    pub fn krippendorff_alpha(&self, attribute: &str) -> Result<Score, IaaError> {
        Ok(self.ratings(attribute)?.alpha(self.policy))
    }

    /// All requested attribute-level statistics for `attribute`.
    ///
    /// Results follow metric order, then pairs in column order, then the
    /// whole-scope entry and the macro average. [`Metric::Detection`] is
    /// attribute independent and skipped here.
    pub fn compute(
        &self,
        attribute: &str,
        metrics: &BTreeSet<Metric>,
        macro_average: bool,
    ) -> Result<Vec<AgreementResult>, IaaError> {
        let grid = self.ratings(attribute)?;
        let n = grid.annotators.len();
        let pair_index: Vec<(usize, usize)> =
            (0..n).flat_map(|i| (i + 1..n).map(move |j| (i, j))).collect();
        let tables: Vec<ConfusionTable> = pair_index
            .iter()
            .map(|&(i, j)| grid.confusion(i, j, self.policy))
            .collect();

        let result = |metric: Metric, scope: Scope, outcome: Outcome| AgreementResult {
            attribute: attribute.to_string(),
            metric,
            scope,
            outcome,
        };
        let pair_scope = |t: &ConfusionTable| Scope::Pair {
            left: t.left.clone(),
            right: t.right.clone(),
        };

        let mut results = Vec::new();
        for &metric in metrics {
            match metric {
                Metric::ObservedAgreement => {
                    let scores: Vec<Score> =
                        tables.iter().map(ConfusionTable::observed_agreement).collect();
                    for (t, s) in tables.iter().zip(&scores) {
                        results.push(result(metric, pair_scope(t), s.clone().into()));
                    }
                    results.push(result(
                        metric,
                        Scope::AllAnnotators,
                        grid.observed(self.policy).into(),
                    ));
                    if macro_average {
                        let mean: Outcome = Score::mean(&scores).into();
                        results.push(result(metric, Scope::MacroAverage, mean));
                    }
                }
                Metric::ChanceCorrected => {
                    let scores: Vec<Score> =
                        tables.iter().map(ConfusionTable::cohen_kappa).collect();
                    for (t, s) in tables.iter().zip(&scores) {
                        results.push(result(metric, pair_scope(t), s.clone().into()));
                    }
                    if macro_average {
                        let mean: Outcome = Score::mean(&scores).into();
                        results.push(result(metric, Scope::MacroAverage, mean));
                    }
                }
                Metric::ConfusionTable => {
                    for t in &tables {
                        results.push(result(
                            metric,
                            pair_scope(t),
                            Outcome::ConfusionTable { table: t.clone() },
                        ));
                    }
                }
                Metric::KrippendorffAlpha => {
                    results.push(result(
                        metric,
                        Scope::AllAnnotators,
                        grid.alpha(self.policy).into(),
                    ));
                }
                Metric::Detection => {}
            }
        }

        tracing::debug!(
            attribute,
            units = grid.units.len(),
            results = results.len(),
            "computed agreement"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{AlignedRow, Cell};
    use crate::document::DocumentId;
    use crate::mention::Mention;

    fn cell(label: &str) -> Cell {
        Cell::Mention(Mention::new("m", 0, 1).with_attribute("type", label))
    }

    fn table(annotators: &[&str], rows: Vec<Vec<Cell>>) -> AlignedTable {
        AlignedTable {
            annotators: annotators.iter().map(|a| a.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|cells| AlignedRow {
                    document: DocumentId::new("d"),
                    cells,
                })
                .collect(),
        }
    }

    fn value(score: Result<Score, IaaError>) -> f64 {
        score.unwrap().as_f64().unwrap()
    }

    #[test]
    fn identical_labels_agree_fully() {
        let t = table(
            &["a", "b"],
            vec![
                vec![cell("kill"), cell("kill")],
                vec![cell("kill"), cell("kill")],
                vec![cell("kill"), cell("kill")],
            ],
        );
        let calc = AgreementCalculator::new(&t, UnmatchedPolicy::default());
        assert_eq!(value(calc.observed_agreement("type")), 1.0);
        assert_eq!(value(calc.pair_observed_agreement("type", "a", "b")), 1.0);
        assert_eq!(value(calc.cohen_kappa("type", "a", "b")), 1.0);
        assert_eq!(value(calc.krippendorff_alpha("type")), 1.0);
    }

    #[test]
    fn unmatched_rows_follow_policy() {
        let t = table(
            &["a", "b"],
            vec![
                vec![cell("attack"), cell("kill")],
                vec![cell("kill"), cell("attack")],
                vec![cell("attack"), Cell::NoMention],
                vec![Cell::NoMention, cell("attack")],
            ],
        );
        let excluded = AgreementCalculator::new(&t, UnmatchedPolicy::ExcludeFromDenominator);
        assert_eq!(value(excluded.observed_agreement("type")), 0.0);
        assert_eq!(excluded.confusion_table("type", "a", "b").unwrap().total(), 2);

        let included = AgreementCalculator::new(&t, UnmatchedPolicy::IncludeAsDisagreement);
        assert_eq!(value(included.observed_agreement("type")), 0.0);
        let confusion = included.confusion_table("type", "a", "b").unwrap();
        assert_eq!(confusion.total(), 4);
        assert!(confusion.labels.contains(&Rating::NoMention));
    }

    #[test]
    fn confusion_sums_match_marginals() {
        let t = table(
            &["a", "b"],
            vec![
                vec![cell("attack"), cell("attack")],
                vec![cell("attack"), cell("kill")],
                vec![cell("kill"), cell("kill")],
                vec![cell("meet"), Cell::NoMention],
            ],
        );
        let calc = AgreementCalculator::new(&t, UnmatchedPolicy::ExcludeFromDenominator);
        let confusion = calc.confusion_table("type", "a", "b").unwrap();
        assert_eq!(
            confusion.labels,
            [Rating::label("attack"), Rating::label("kill")]
        );
        assert_eq!(confusion.row_sums(), [2, 1]);
        assert_eq!(confusion.column_sums(), [1, 2]);
        assert_eq!(confusion.total(), 3);
    }

    #[test]
    fn kappa_matches_hand_computation() {
        // p_o = 0.7; p_e = 0.5*0.6 + 0.5*0.4 = 0.5; kappa = 0.4
        let mut rows = Vec::new();
        rows.extend((0..4).map(|_| vec![cell("yes"), cell("yes")]));
        rows.extend((0..1).map(|_| vec![cell("yes"), cell("no")]));
        rows.extend((0..2).map(|_| vec![cell("no"), cell("yes")]));
        rows.extend((0..3).map(|_| vec![cell("no"), cell("no")]));
        let t = table(&["a", "b"], rows);
        let calc = AgreementCalculator::new(&t, UnmatchedPolicy::default());
        assert!((value(calc.cohen_kappa("type", "a", "b")) - 0.4).abs() < 1e-12);
        assert!((value(calc.observed_agreement("type")) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn empty_pair_is_not_computable() {
        let t = table(&["a", "b"], vec![vec![cell("x"), Cell::NoMention]]);
        let calc = AgreementCalculator::new(&t, UnmatchedPolicy::ExcludeFromDenominator);
        assert!(matches!(
            calc.cohen_kappa("type", "a", "b").unwrap(),
            Score::NotComputable { .. }
        ));
        assert!(matches!(
            calc.observed_agreement("type").unwrap(),
            Score::NotComputable { .. }
        ));
        assert!(matches!(
            calc.krippendorff_alpha("type").unwrap(),
            Score::NotComputable { .. }
        ));
    }

    #[test]
    fn alpha_on_known_reliability_data() {
        // Two coders, nominal: 3 agreeing units, 1 disagreeing.
        // o_aa = 4, o_bb = 2, o_ab = o_ba = 1, n = 8
        // alpha = 1 - 7 * 2 / (64 - 25 - 9) = 1 - 14/30
        let t = table(
            &["a", "b"],
            vec![
                vec![cell("x"), cell("x")],
                vec![cell("x"), cell("x")],
                vec![cell("y"), cell("y")],
                vec![cell("x"), cell("y")],
            ],
        );
        let calc = AgreementCalculator::new(&t, UnmatchedPolicy::default());
        assert!((value(calc.krippendorff_alpha("type")) - (1.0 - 14.0 / 30.0)).abs() < 1e-12);
    }

    #[test]
    fn non_participants_are_ignored() {
        let t = table(
            &["a", "b", "c"],
            vec![
                vec![cell("x"), cell("x"), Cell::NotAnnotated],
                vec![cell("y"), Cell::NotAnnotated, Cell::NotAnnotated],
                vec![Cell::NotAnnotated, cell("x"), cell("x")],
            ],
        );
        let calc = AgreementCalculator::new(&t, UnmatchedPolicy::default());
        assert_eq!(calc.ratings("type").unwrap().units.len(), 2);
        assert_eq!(value(calc.observed_agreement("type")), 1.0);
        assert!(matches!(
            calc.cohen_kappa("type", "a", "c").unwrap(),
            Score::NotComputable { .. }
        ));
    }

    #[test]
    fn missing_attribute_is_absent_unless_strict() {
        let bare = Cell::Mention(Mention::new("e9", 0, 1));
        let t = table(&["a", "b"], vec![vec![cell("x"), bare]]);

        let lenient = AgreementCalculator::new(&t, UnmatchedPolicy::default());
        let grid = lenient.ratings("type").unwrap();
        assert_eq!(grid.units[0][1], Some(Rating::Absent));

        let strict = AgreementCalculator::new(&t, UnmatchedPolicy::default()).strict(true);
        assert_eq!(
            strict.ratings("type").unwrap_err(),
            IaaError::UnknownAttribute {
                attribute: "type".into(),
                annotator: "b".into(),
                source_id: "e9".into(),
            }
        );
    }

    #[test]
    fn scope_restricts_columns() {
        let t = table(
            &["a", "b", "c"],
            vec![
                vec![cell("x"), cell("x"), cell("y")],
                vec![cell("y"), cell("y"), Cell::NoMention],
            ],
        );
        let calc = AgreementCalculator::new(&t, UnmatchedPolicy::default())
            .with_scope(&["c", "a"])
            .unwrap();
        assert_eq!(calc.pairs(), [("a", "c")]);
        assert_eq!(value(calc.observed_agreement("type")), 0.0);

        let err = AgreementCalculator::new(&t, UnmatchedPolicy::default())
            .with_scope(&["a", "zed"])
            .unwrap_err();
        assert!(matches!(err, IaaError::InvalidConfig(_)));
    }

    #[test]
    fn compute_orders_results() {
        let t = table(
            &["a", "b", "c"],
            vec![
                vec![cell("x"), cell("x"), cell("x")],
                vec![cell("y"), cell("x"), cell("y")],
            ],
        );
        let calc = AgreementCalculator::new(&t, UnmatchedPolicy::default());
        let metrics: BTreeSet<Metric> = Metric::ALL.into_iter().collect();
        let results = calc.compute("type", &metrics, true).unwrap();

        let layout: Vec<(Metric, String)> =
            results.iter().map(|r| (r.metric, r.scope.to_string())).collect();
        assert_eq!(
            layout[..5],
            [
                (Metric::ObservedAgreement, "a ~ b".to_string()),
                (Metric::ObservedAgreement, "a ~ c".to_string()),
                (Metric::ObservedAgreement, "b ~ c".to_string()),
                (Metric::ObservedAgreement, "all annotators".to_string()),
                (Metric::ObservedAgreement, "macro average".to_string()),
            ]
        );
        assert_eq!(results.len(), 5 + 4 + 3 + 1);
        assert_eq!(results[1].outcome.as_f64(), Some(1.0));
        assert_eq!(results[3].outcome.as_f64(), Some(0.5));
        assert_eq!(results.last().map(|r| r.metric), Some(Metric::KrippendorffAlpha));
    }

    #[test]
    fn confusion_table_json_shape() {
        let items = [
            (Rating::label("attack"), Rating::label("attack")),
            (Rating::label("attack"), Rating::NoMention),
        ];
        let confusion = ConfusionTable::from_items("a", "b", &items);
        insta::assert_json_snapshot!(confusion, @r###"
        {
          "left": "a",
          "right": "b",
          "labels": [
            {
              "label": "attack"
            },
            "no_mention"
          ],
          "counts": [
            [
              1,
              1
            ],
            [
              0,
              0
            ]
          ]
        }
        "###);
    }
}
