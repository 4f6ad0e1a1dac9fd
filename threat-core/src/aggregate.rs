//! Aggregation engine
//!
//! Reduces a collection of per-department score sets to one value in
//! [0, 90]. Three strategies share the same final clamp:
//! - **Robust**: flatten all non-empty sets; no observations yields 0
//! - **Strict**: flatten everything; no observations is an error
//! - **Weighted**: importance-weighted mean of department means

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DepartmentScoreSet, ScoreError, WeightedDepartmentScoreSet, MAX_SCORE, MIN_SCORE};

/// Clamp a raw value into [0, 90]. NaN maps to 0.
pub fn clamp_score(value: f64) -> f64 {
    value.max(MIN_SCORE as f64).min(MAX_SCORE as f64)
}

/// A clamped aggregate, created fresh by each aggregation call
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct AggregatedScore(f64);

impl AggregatedScore {
    fn from_raw(raw: f64) -> Self {
        Self(clamp_score(raw))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Nearest whole score, as reported
    pub fn rounded(self) -> u8 {
        self.0.round() as u8
    }
}

impl fmt::Display for AggregatedScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Empty-input policy for unweighted aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    /// Skip empty departments; no observations at all yields 0
    #[default]
    Robust,
    /// No observations at all is an [`ScoreError::EmptyInput`]
    Strict,
}

impl AggregationStrategy {
    pub fn aggregate<'a, I>(self, sets: I) -> Result<AggregatedScore, ScoreError>
    where
        I: IntoIterator<Item = &'a DepartmentScoreSet>,
    {
        match self {
            Self::Robust => Ok(aggregate_robust(sets)),
            Self::Strict => aggregate_strict(sets),
        }
    }
}

impl fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Robust => write!(f, "robust"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Unweighted flatten-mean that skips empty departments
pub fn aggregate_robust<'a, I>(sets: I) -> AggregatedScore
where
    I: IntoIterator<Item = &'a DepartmentScoreSet>,
{
    let (sum, count) = sets
        .into_iter()
        .filter(|set| !set.is_empty())
        .fold((0u64, 0usize), |(sum, count), set| {
            (sum + set.sum(), count + set.len())
        });

    if count == 0 {
        return AggregatedScore::from_raw(0.0);
    }
    AggregatedScore::from_raw(sum as f64 / count as f64)
}

/// Unweighted flatten-mean that refuses to average nothing
pub fn aggregate_strict<'a, I>(sets: I) -> Result<AggregatedScore, ScoreError>
where
    I: IntoIterator<Item = &'a DepartmentScoreSet>,
{
    let mut sum = 0u64;
    let mut count = 0usize;
    for set in sets {
        sum += set.sum();
        count += set.len();
    }

    if count == 0 {
        return Err(ScoreError::EmptyInput(None));
    }
    Ok(AggregatedScore::from_raw(sum as f64 / count as f64))
}

/// Importance-weighted mean of department means
///
/// Every department must carry at least one observation. An empty
/// collection has zero total importance and is rejected. Importances are
/// scaled by the largest one so their sum stays finite.
pub fn aggregate_weighted<'a, I>(sets: I) -> Result<AggregatedScore, ScoreError>
where
    I: IntoIterator<Item = &'a WeightedDepartmentScoreSet>,
{
    let mut entries = Vec::new();
    for entry in sets {
        let department_mean = entry
            .scores()
            .mean()
            .ok_or(ScoreError::EmptyInput(None))?;
        entries.push((entry.importance(), department_mean));
    }

    let max_importance = entries
        .iter()
        .map(|&(importance, _)| importance)
        .fold(0.0, f64::max);

    let mut total_weighted = 0.0;
    let mut total_importance = 0.0;
    for (importance, department_mean) in entries {
        let scaled = importance / max_importance;
        total_weighted += scaled * department_mean;
        total_importance += scaled;
    }

    if total_importance <= 0.0 {
        return Err(ScoreError::InvalidWeight(total_importance));
    }
    Ok(AggregatedScore::from_raw(total_weighted / total_importance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_with;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SAMPLES: usize = 50;

    fn set(scores: &[u8]) -> DepartmentScoreSet {
        DepartmentScoreSet::new(scores.to_vec()).unwrap()
    }

    fn weighted(importance: f64, scores: &[u8]) -> WeightedDepartmentScoreSet {
        WeightedDepartmentScoreSet::new(importance, set(scores)).unwrap()
    }

    fn synthetic(rng: &mut StdRng, specs: &[(i64, i64)]) -> Vec<DepartmentScoreSet> {
        specs
            .iter()
            .map(|&(mean, variance)| generate_with(rng, mean, variance, SAMPLES))
            .collect()
    }

    #[test]
    fn test_robust_mean_across_departments() {
        let sets = vec![set(&[10, 20]), set(&[30]), set(&[])];
        let score = aggregate_robust(&sets);
        assert!((score.value() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_robust_all_empty_is_zero() {
        let sets = vec![set(&[]), set(&[])];
        assert_eq!(aggregate_robust(&sets).value(), 0.0);
        assert_eq!(aggregate_robust(std::iter::empty::<&DepartmentScoreSet>()).value(), 0.0);
    }

    #[test]
    fn test_strict_all_empty_fails() {
        let sets = vec![set(&[]), set(&[])];
        assert_eq!(aggregate_strict(&sets), Err(ScoreError::EmptyInput(None)));
        assert_eq!(
            AggregationStrategy::Strict.aggregate(std::iter::empty::<&DepartmentScoreSet>()),
            Err(ScoreError::EmptyInput(None))
        );
    }

    #[test]
    fn test_strict_matches_robust_on_data() {
        let sets = vec![set(&[40, 50]), set(&[]), set(&[60])];
        let strict = aggregate_strict(&sets).unwrap();
        assert_eq!(strict, aggregate_robust(&sets));
        assert!((strict.value() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_strategy_is_robust() {
        assert_eq!(AggregationStrategy::default(), AggregationStrategy::Robust);
        let empty: Vec<DepartmentScoreSet> = Vec::new();
        assert_eq!(AggregationStrategy::default().aggregate(&empty).unwrap().value(), 0.0);
    }

    #[test]
    fn test_weighted_equal_importance() {
        let sets = vec![weighted(1.0, &[50]), weighted(1.0, &[50])];
        assert!((aggregate_weighted(&sets).unwrap().value() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_skewed_importance() {
        let sets = vec![weighted(3.0, &[10]), weighted(1.0, &[90])];
        assert!((aggregate_weighted(&sets).unwrap().value() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_uses_department_means() {
        // (2 * 15 + 1 * 60) / 3
        let sets = vec![weighted(2.0, &[10, 20]), weighted(1.0, &[60])];
        assert!((aggregate_weighted(&sets).unwrap().value() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_huge_importance() {
        let sets = vec![weighted(1e308, &[50]), weighted(1e308, &[50])];
        assert!((aggregate_weighted(&sets).unwrap().value() - 50.0).abs() < 1e-9);

        let sets = vec![weighted(f64::MAX, &[10]), weighted(f64::MAX / 3.0, &[90])];
        assert!((aggregate_weighted(&sets).unwrap().value() - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_empty_department_fails() {
        let sets = vec![weighted(1.0, &[50]), weighted(2.0, &[])];
        assert_eq!(aggregate_weighted(&sets), Err(ScoreError::EmptyInput(None)));
    }

    #[test]
    fn test_weighted_zero_total_importance_fails() {
        let sets: Vec<WeightedDepartmentScoreSet> = Vec::new();
        assert_eq!(aggregate_weighted(&sets), Err(ScoreError::InvalidWeight(0.0)));
    }

    #[test]
    fn test_clamp_is_idempotent() {
        for x in [-1e9, -0.5, 0.0, 12.3, 90.0, 90.0001, 1e12, f64::INFINITY, f64::NEG_INFINITY] {
            let once = clamp_score(x);
            assert_eq!(clamp_score(once), once);
            assert!((0.0..=90.0).contains(&once));
        }
        assert_eq!(clamp_score(f64::NAN), 0.0);
    }

    #[test]
    fn test_rounded_report_value() {
        let sets = vec![set(&[10, 11])];
        let score = aggregate_robust(&sets);
        assert_eq!(score.value(), 10.5);
        assert_eq!(score.rounded(), 11);
        assert_eq!(score.to_string(), "10.50");
    }

    #[test]
    fn test_no_outliers() {
        let mut rng = StdRng::seed_from_u64(1);
        let data = synthetic(&mut rng, &[(45, 5), (50, 5), (48, 5), (47, 5), (46, 5)]);
        let score = aggregate_robust(&data).value();
        assert!((0.0..=90.0).contains(&score));
        assert!((score - 47.2).abs() < 5.0);
    }

    #[test]
    fn test_high_variance() {
        let mut rng = StdRng::seed_from_u64(2);
        let data = synthetic(&mut rng, &[(60, 20), (30, 25), (25, 30), (45, 10), (50, 15)]);
        let score = aggregate_robust(&data).value();
        assert!((0.0..=90.0).contains(&score));
    }

    #[test]
    fn test_single_high_outlier() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut data = synthetic(&mut rng, &[(20, 5), (35, 5), (70, 5), (55, 5)]);
        data.push(generate_with(&mut rng, 45, 5, SAMPLES - 1));
        let baseline = aggregate_robust(&data).value();

        data.last_mut()
            .unwrap()
            .push(crate::ThreatScore::new(90).unwrap());
        let score = aggregate_robust(&data).value();

        assert!((0.0..=90.0).contains(&score));
        assert!(score > baseline, "outlier not influencing score");
        assert!((score - 45.0).abs() < 3.0);
    }

    #[test]
    fn test_extreme_values() {
        let mut rng = StdRng::seed_from_u64(4);
        let data = synthetic(&mut rng, &[(85, 2), (80, 2), (90, 0), (87, 1), (86, 1)]);
        let score = aggregate_robust(&data).value();
        assert!((0.0..=90.0).contains(&score));
        assert!((score - 86.6).abs() < 2.0);
    }

    #[test]
    fn test_all_low_threat() {
        let mut rng = StdRng::seed_from_u64(5);
        let data = synthetic(&mut rng, &[(5, 2), (10, 3), (2, 1), (8, 2), (6, 1)]);
        let score = aggregate_robust(&data).value();
        assert!((0.0..=90.0).contains(&score));
        assert!(score < 10.0);
    }
}
