use std::fmt;

/// A statistic that can be compared against a service-reported value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    Mean,
    P20,
    P90,
}

impl fmt::Display for StatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatField::Mean => write!(f, "mean"),
            StatField::P20 => write!(f, "p20"),
            StatField::P90 => write!(f, "p90"),
        }
    }
}

/// One statistic that fell outside the allowed tolerance.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Mismatch {
    pub field: StatField,
    pub expected: f64,
    pub actual: f64,
    pub tolerance: f64,
}

impl Mismatch {
    pub fn difference(&self) -> f64 {
        (self.expected - self.actual).abs()
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {:.4}, actual {:.4}, |diff| {:.4} > tolerance {}",
            self.field,
            self.expected,
            self.actual,
            self.difference(),
            self.tolerance
        )
    }
}

fn join_mismatches(mismatches: &[Mismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while verifying an evaluation run.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Statistics were requested over zero scores.
    #[error("cannot compute statistics over an empty score set")]
    EmptyInput,

    /// The service returned no run for a submitted identifier.
    #[error("evaluation run not found: {run_id}")]
    RunNotFound { run_id: String },

    /// Recomputed statistics diverge from the reported ones.
    #[error("tolerance exceeded: {}", join_mismatches(.mismatches))]
    ToleranceExceeded { mismatches: Vec<Mismatch> },

    /// The run holds a different number of results than fixtures submitted.
    #[error("run returned {actual} results for {expected} submitted fixtures")]
    ResultCountMismatch { expected: usize, actual: usize },

    #[error("no result at index {index}")]
    MissingResult { index: usize },

    #[error("fixture file holds {found} records, at least {required} required")]
    NotEnoughFixtures { required: usize, found: usize },

    #[error("invalid run id: {run_id:?}")]
    InvalidRunId { run_id: String },

    #[error("percentile must be within 0..=100, got {p}")]
    InvalidPercentile { p: f64 },

    #[error("score is not a number: {value:?}")]
    InvalidScore { value: String },

    /// Non-success response from the evaluation API.
    #[error("evaluation API error {status}: {body}")]
    Api { status: u16, body: String },
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;
