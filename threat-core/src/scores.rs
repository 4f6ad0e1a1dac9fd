//! Threat score values and per-department collections
//!
//! Every score that enters the core is validated once at construction,
//! so the aggregation code can rely on the [0, 90] invariant.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::{ScoreError, MAX_SCORE, MIN_SCORE};

/// A single threat observation in [0, 90]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct ThreatScore(u8);

impl ThreatScore {
    pub fn new(value: i64) -> Result<Self, ScoreError> {
        if (MIN_SCORE as i64..=MAX_SCORE as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ScoreError::ScoreOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for ThreatScore {
    type Error = ScoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ThreatScore> for u8 {
    fn from(score: ThreatScore) -> Self {
        score.0
    }
}

impl fmt::Display for ThreatScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observed threat scores for one department (may be empty)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DepartmentScoreSet {
    scores: Vec<u8>,
}

impl DepartmentScoreSet {
    /// Build a set, rejecting any value outside [0, 90]
    pub fn new(scores: Vec<u8>) -> Result<Self, ScoreError> {
        if let Some(bad) = scores.iter().find(|&&s| s > MAX_SCORE) {
            return Err(ScoreError::ScoreOutOfRange(*bad as i64));
        }
        Ok(Self { scores })
    }

    /// Caller guarantees every value is within [0, 90]
    pub(crate) fn from_bounded(scores: Vec<u8>) -> Self {
        debug_assert!(scores.iter().all(|&s| s <= MAX_SCORE));
        Self { scores }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, score: ThreatScore) {
        self.scores.push(score.value());
    }

    pub fn scores(&self) -> &[u8] {
        &self.scores
    }

    pub fn threat_scores(&self) -> impl Iterator<Item = ThreatScore> + '_ {
        self.scores.iter().map(|&s| ThreatScore(s))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn sum(&self) -> u64 {
        self.scores.iter().map(|&s| s as u64).sum()
    }

    /// Arithmetic mean, or `None` when there are no observations
    pub fn mean(&self) -> Option<f64> {
        if self.scores.is_empty() {
            None
        } else {
            Some(self.sum() as f64 / self.scores.len() as f64)
        }
    }
}

impl FromIterator<ThreatScore> for DepartmentScoreSet {
    fn from_iter<I: IntoIterator<Item = ThreatScore>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().map(ThreatScore::value).collect(),
        }
    }
}

/// A department score set carrying a positive importance weight
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedDepartmentScoreSet {
    importance: f64,
    scores: DepartmentScoreSet,
}

impl WeightedDepartmentScoreSet {
    /// Importance must be finite and strictly positive
    pub fn new(importance: f64, scores: DepartmentScoreSet) -> Result<Self, ScoreError> {
        if !importance.is_finite() || importance <= 0.0 {
            return Err(ScoreError::InvalidWeight(importance));
        }
        Ok(Self { importance, scores })
    }

    pub fn importance(&self) -> f64 {
        self.importance
    }

    pub fn scores(&self) -> &DepartmentScoreSet {
        &self.scores
    }
}

/// Scores grouped by department, as returned by a score store
pub type DepartmentScores = HashMap<String, DepartmentScoreSet>;

/// One indexed observation: the document and CSV row shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub department: String,
    pub threat_score: ThreatScore,
}

impl ScoreRecord {
    pub fn new(department: impl Into<String>, threat_score: ThreatScore) -> Self {
        Self {
            department: department.into(),
            threat_score,
        }
    }
}

/// Group records by department
pub fn group_records<I>(records: I) -> DepartmentScores
where
    I: IntoIterator<Item = ScoreRecord>,
{
    let mut grouped = DepartmentScores::new();
    for record in records {
        grouped
            .entry(record.department)
            .or_default()
            .push(record.threat_score);
    }
    grouped
}
