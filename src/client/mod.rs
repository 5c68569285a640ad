pub mod fake;
pub mod real;

use anyhow::Result;
use async_trait::async_trait;

use crate::eval::models::{EvalRun, EvaluationSubmission, RunId};

/// A trait that abstracts the evaluation service for testing
///
/// The real implementation talks HTTP to the hosted service; the fake one
/// returns scripted runs and records what was submitted.
#[async_trait]
pub trait EvalClientTrait: Send + Sync {
    /// Submits one batch of traces and returns the identifier of the run
    /// the service created for it.
    async fn evaluate(
        &self,
        submission: &EvaluationSubmission,
    ) -> Result<RunId>;

    /// Fetches a run by identifier
    ///
    /// # Returns
    /// `Ok(None)` when the service has no run with this identifier
    async fn get_eval_run(&self, run_id: &RunId) -> Result<Option<EvalRun>>;
}
