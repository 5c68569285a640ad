use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::client::EvalClientTrait;
use crate::error::EvalError;
use crate::eval::models::{EvalRun, EvaluationSubmission, RunId};
use crate::fixtures::FixtureEntry;
use crate::scenario::Scenario;

/// Drives the evaluation service: one batched submission, one fetch.
pub struct EvaluationOrchestrator {
    client: Arc<dyn EvalClientTrait>,
    description: Option<String>,
}

impl EvaluationOrchestrator {
    pub fn new(client: Arc<dyn EvalClientTrait>) -> Self {
        Self {
            client,
            description: None,
        }
    }

    /// Free-text description attached to every submission.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Submits all entries, in order, as a single faithfulness evaluation.
    #[instrument(
        skip(self, entries, tags),
        fields(count = entries.len()),
        err
    )]
    pub async fn submit(
        &self,
        entries: &[FixtureEntry],
        label: &str,
        tags: &BTreeSet<String>,
    ) -> Result<RunId> {
        let mut submission =
            EvaluationSubmission::faithfulness(label, tags.clone())
                .with_description(self.description.clone());
        for entry in entries {
            submission.add_trace(entry.to_request());
        }

        let run_id = self.client.evaluate(&submission).await?;
        info!("Submitted {} traces as run {}", entries.len(), run_id);
        Ok(run_id)
    }

    pub async fn fetch(&self, run_id: &RunId) -> Result<Option<EvalRun>> {
        self.client.get_eval_run(run_id).await
    }

    /// Fetches a run, treating absence as an error.
    pub async fn fetch_required(&self, run_id: &RunId) -> Result<EvalRun> {
        match self.fetch(run_id).await? {
            Some(run) => Ok(run),
            None => {
                warn!("Evaluation run {} not found", run_id);
                Err(EvalError::RunNotFound {
                    run_id: run_id.to_string(),
                }
                .into())
            }
        }
    }

    /// Submits the fixtures and builds the scenario from the fetched run.
    pub async fn run(
        &self,
        entries: Vec<FixtureEntry>,
        label: &str,
        tags: &BTreeSet<String>,
    ) -> Result<Scenario> {
        let run_id = self.submit(&entries, label, tags).await?;
        self.load(run_id, entries).await
    }

    /// Builds the scenario for an existing run.
    pub async fn load(
        &self,
        run_id: RunId,
        entries: Vec<FixtureEntry>,
    ) -> Result<Scenario> {
        let run = self.fetch_required(&run_id).await?;
        Ok(Scenario::new(run_id, entries, run)?)
    }
}
