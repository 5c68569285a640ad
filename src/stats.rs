//! Local recomputation of run statistics.
//!
//! Percentiles use the inverted empirical CDF: the smallest sorted value
//! whose cumulative fraction reaches `p / 100`. This is the discontinuous
//! estimator the evaluation service reports, so linear interpolation must
//! not be substituted here.

use serde::Serialize;

use crate::error::{EvalError, EvalResult, Mismatch, StatField};

/// Absolute tolerance used when none is configured.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub mean: f64,
    pub p20: f64,
    pub p90: f64,
}

impl Statistics {
    pub fn new(mean: f64, p20: f64, p90: f64) -> Self {
        Self { mean, p20, p90 }
    }

    pub fn get(&self, field: StatField) -> f64 {
        match field {
            StatField::Mean => self.mean,
            StatField::P20 => self.p20,
            StatField::P90 => self.p90,
        }
    }
}

/// Computes mean, p20 and p90 of `scores`.
pub fn compute_statistics(scores: &[f64]) -> EvalResult<Statistics> {
    if scores.is_empty() {
        return Err(EvalError::EmptyInput);
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;

    Ok(Statistics {
        mean,
        p20: percentile_sorted(&sorted, 20.0),
        p90: percentile_sorted(&sorted, 90.0),
    })
}

/// Inverted-CDF percentile of an arbitrary (unsorted) slice.
pub fn percentile(scores: &[f64], p: f64) -> EvalResult<f64> {
    if !(0.0..=100.0).contains(&p) {
        return Err(EvalError::InvalidPercentile { p });
    }
    if scores.is_empty() {
        return Err(EvalError::EmptyInput);
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(percentile_sorted(&sorted, p))
}

// `sorted` must be non-empty and ascending.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    // Multiply before dividing so integral percentiles stay exact.
    // `max` also maps a NaN rank to the first element.
    let rank = (p * n as f64 / 100.0).ceil().max(1.0);
    sorted[(rank as usize - 1).min(n - 1)]
}

/// Every field whose absolute difference exceeds `tolerance`.
pub fn compare(
    expected: &Statistics,
    actual: &Statistics,
    tolerance: f64,
) -> Vec<Mismatch> {
    [StatField::Mean, StatField::P20, StatField::P90]
        .into_iter()
        .filter_map(|field| {
            let expected = expected.get(field);
            let actual = actual.get(field);
            if (expected - actual).abs() <= tolerance {
                None
            } else {
                Some(Mismatch {
                    field,
                    expected,
                    actual,
                    tolerance,
                })
            }
        })
        .collect()
}

pub fn verify(
    expected: &Statistics,
    actual: &Statistics,
    tolerance: f64,
) -> bool {
    compare(expected, actual, tolerance).is_empty()
}

/// Like [`verify`], but reports every failing field as an error.
pub fn ensure_within(
    expected: &Statistics,
    actual: &Statistics,
    tolerance: f64,
) -> EvalResult<()> {
    let mismatches = compare(expected, actual, tolerance);
    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(EvalError::ToleranceExceeded { mismatches })
    }
}
