//! Checks over one fetched evaluation run.
//!
//! A [`Scenario`] is built once from the submitted fixtures and the run the
//! service returned. Statistics are recomputed at construction and every
//! check reads from that immutable snapshot.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{EvalError, EvalResult, Mismatch};
use crate::eval::models::{EvalRun, RunId};
use crate::fixtures::FixtureEntry;
use crate::stats::{self, Statistics};

/// Names of the positional score checks, in fixture order.
const ITEM_NAMES: [&str; 3] = ["high", "low", "medium"];

pub fn item_check_name(index: usize) -> String {
    ITEM_NAMES
        .get(index)
        .map(|name| format!("{name}_score"))
        .unwrap_or_else(|| format!("item-{index}"))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub name: String,
    pub passed: bool,
    pub detail: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<Mismatch>,
}

impl CheckOutcome {
    fn pass(name: impl Into<String>, detail: String) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail,
            mismatches: Vec::new(),
        }
    }

    fn fail(name: impl Into<String>, detail: String) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail,
            mismatches: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    run_id: RunId,
    fixtures: Vec<FixtureEntry>,
    run: EvalRun,
    recomputed: Statistics,
}

impl Scenario {
    pub fn new(
        run_id: RunId,
        fixtures: Vec<FixtureEntry>,
        run: EvalRun,
    ) -> EvalResult<Self> {
        if run.results.len() != fixtures.len() {
            return Err(EvalError::ResultCountMismatch {
                expected: fixtures.len(),
                actual: run.results.len(),
            });
        }
        let recomputed = stats::compute_statistics(&run.scores())?;
        debug!(
            "Recomputed mean={} p20={} p90={} for run {}",
            recomputed.mean, recomputed.p20, recomputed.p90, run_id
        );
        Ok(Self {
            run_id,
            fixtures,
            run,
            recomputed,
        })
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn run(&self) -> &EvalRun {
        &self.run
    }

    pub fn fixtures(&self) -> &[FixtureEntry] {
        &self.fixtures
    }

    pub fn recomputed(&self) -> Statistics {
        self.recomputed
    }

    pub fn reported(&self) -> Statistics {
        Statistics::new(self.run.aggregate_score, self.run.p20, self.run.p90)
    }

    pub fn check_metadata(&self, label: &str, tag: &str) -> CheckOutcome {
        let mut problems = Vec::new();
        if self.run.label != label {
            problems.push(format!(
                "label {:?} does not match {:?}",
                self.run.label, label
            ));
        }
        if !self.run.tags.contains(tag) {
            problems.push(format!("tag {:?} missing", tag));
        }

        if problems.is_empty() {
            CheckOutcome::pass(
                "metadata",
                format!("label {:?} with tag {:?}", label, tag),
            )
        } else {
            CheckOutcome::fail("metadata", problems.join("; "))
        }
    }

    pub fn check_statistics(&self, tolerance: f64) -> CheckOutcome {
        let reported = self.reported();
        info!(
            "expected mean={:.4} p20={:.4} p90={:.4}, \
             reported mean={:.4} p20={:.4} p90={:.4}",
            self.recomputed.mean,
            self.recomputed.p20,
            self.recomputed.p90,
            reported.mean,
            reported.p20,
            reported.p90
        );

        let mismatches =
            stats::compare(&self.recomputed, &reported, tolerance);
        if mismatches.is_empty() {
            CheckOutcome::pass(
                "statistics",
                format!("mean, p20 and p90 within {}", tolerance),
            )
        } else {
            let detail = EvalError::ToleranceExceeded {
                mismatches: mismatches.clone(),
            }
            .to_string();
            CheckOutcome {
                mismatches,
                ..CheckOutcome::fail("statistics", detail)
            }
        }
    }

    /// Compares the score at `index` with the fixture's ground truth.
    pub fn check_item(
        &self,
        index: usize,
        tolerance: f64,
    ) -> EvalResult<CheckOutcome> {
        let result = self
            .run
            .results
            .get(index)
            .ok_or(EvalError::MissingResult { index })?;
        let fixture = self
            .fixtures
            .get(index)
            .ok_or(EvalError::MissingResult { index })?;
        Ok(item_outcome(index, result.score, fixture.score, tolerance))
    }

    /// Metadata, statistics and every positional score.
    pub fn check_all(
        &self,
        label: &str,
        tag: &str,
        tolerance: f64,
    ) -> Vec<CheckOutcome> {
        let mut outcomes = vec![
            self.check_metadata(label, tag),
            self.check_statistics(tolerance),
        ];
        let items = self.run.results.iter().zip(&self.fixtures).enumerate();
        outcomes.extend(items.map(|(index, (result, fixture))| {
            item_outcome(index, result.score, fixture.score, tolerance)
        }));
        outcomes
    }
}

fn item_outcome(
    index: usize,
    actual: f64,
    expected: f64,
    tolerance: f64,
) -> CheckOutcome {
    let detail = format!(
        "expected {:.4}, actual {:.4}, tolerance {}",
        expected, actual, tolerance
    );
    let name = item_check_name(index);
    if (actual - expected).abs() <= tolerance {
        CheckOutcome::pass(name, detail)
    } else {
        CheckOutcome::fail(name, detail)
    }
}
