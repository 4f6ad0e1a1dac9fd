//! Synthetic score generation
//!
//! Draws uniform integer scores from a window around a mean, bounded to
//! [0, 90]. Used to build test fixtures and demo data.

use rand::Rng;

use crate::{DepartmentScoreSet, MAX_SCORE};

/// Half-open `[lower, upper)` draw window for a mean and variance
///
/// A degenerate window collapses to the single value below `upper`, and
/// `upper` never drops below 1, so the window always lies in [0, 90].
pub fn score_bounds(mean: i64, variance: i64) -> (u8, u8) {
    let lower = mean.saturating_sub(variance).max(0);
    let upper = mean
        .saturating_add(variance)
        .saturating_add(1)
        .min(MAX_SCORE as i64);

    if lower >= upper {
        let upper = upper.max(1);
        return ((upper - 1) as u8, upper as u8);
    }
    (lower as u8, upper as u8)
}

/// Generate `count` scores with the thread-local RNG
pub fn generate(mean: i64, variance: i64, count: usize) -> DepartmentScoreSet {
    generate_with(&mut rand::thread_rng(), mean, variance, count)
}

/// Generate `count` scores from a caller-supplied RNG
pub fn generate_with<R: Rng>(
    rng: &mut R,
    mean: i64,
    variance: i64,
    count: usize,
) -> DepartmentScoreSet {
    let (lower, upper) = score_bounds(mean, variance);
    let scores = (0..count).map(|_| rng.gen_range(lower..upper)).collect();
    DepartmentScoreSet::from_bounded(scores)
}
