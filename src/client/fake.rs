use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::client::EvalClientTrait;
use crate::eval::models::{EvalRun, EvaluationSubmission, RunId};

/// A fake evaluation service for tests
///
/// Each call to `evaluate` hands out the next queued run under a fresh
/// identifier (`fake-run-<n>`), so tests control exactly what the
/// orchestrator fetches back. Submissions are recorded for verification.
///
/// # Example
///
/// ```
/// use faithcheck::client::EvalClientTrait;
/// use faithcheck::client::fake::FakeEvalClient;
/// use faithcheck::eval::models::{EvalRun, EvaluationSubmission, RunResult};
/// use std::collections::BTreeSet;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let run = EvalRun {
///         label: "demo".to_string(),
///         tags: BTreeSet::new(),
///         results: vec![RunResult::with_score(0.9)],
///         aggregate_score: 0.9,
///         p20: 0.9,
///         p90: 0.9,
///     };
///     let client = FakeEvalClient::new().with_run(run);
///
///     let submission =
///         EvaluationSubmission::faithfulness("demo", BTreeSet::new());
///     let run_id = client.evaluate(&submission).await?;
///     let fetched = client.get_eval_run(&run_id).await?;
///
///     assert_eq!(fetched.unwrap().aggregate_score, 0.9);
///     Ok(())
/// }
/// ```
pub struct FakeEvalClient {
    queued: Mutex<Vec<EvalRun>>,
    runs: Mutex<HashMap<RunId, EvalRun>>,
    report_missing: bool,
    pub submissions: Mutex<Vec<EvaluationSubmission>>,
}

impl Default for FakeEvalClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEvalClient {
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(Vec::new()),
            runs: Mutex::new(HashMap::new()),
            report_missing: false,
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Queue a run to be created by the next `evaluate` call
    pub fn with_run(self, run: EvalRun) -> Self {
        self.queued.lock().unwrap().push(run);
        self
    }

    /// Register a run under a known identifier
    pub fn with_existing_run(self, run_id: &str, run: EvalRun) -> Self {
        self.runs.lock().unwrap().insert(RunId::from(run_id), run);
        self
    }

    /// Make every fetch report the run as absent
    pub fn with_missing_runs(mut self) -> Self {
        self.report_missing = true;
        self
    }
}

#[async_trait]
impl EvalClientTrait for FakeEvalClient {
    async fn evaluate(
        &self,
        submission: &EvaluationSubmission,
    ) -> Result<RunId> {
        self.submissions.lock().unwrap().push(submission.clone());

        let mut queued = self.queued.lock().unwrap();
        if queued.is_empty() {
            return Err(anyhow!("no fake evaluation runs configured"));
        }
        let run = queued.remove(0);

        let mut runs = self.runs.lock().unwrap();
        let run_id = RunId(format!("fake-run-{}", runs.len() + 1));
        runs.insert(run_id.clone(), run);
        Ok(run_id)
    }

    async fn get_eval_run(&self, run_id: &RunId) -> Result<Option<EvalRun>> {
        if self.report_missing {
            return Ok(None);
        }
        Ok(self.runs.lock().unwrap().get(run_id).cloned())
    }
}
