use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

use crate::client::EvalClientTrait;
use crate::error::EvalError;
use crate::eval::models::{
    EvalRun, EvaluationSubmission, RunId, SubmitResponse,
};

pub const DEFAULT_API_URL: &str = "https://platform.lynxius.ai";

const USER_AGENT_VALUE: &str =
    concat!("faithcheck/", env!("CARGO_PKG_VERSION"));

// A real implementation of the evaluation client
pub struct RealEvalClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for RealEvalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealEvalClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RealEvalClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self> {
        // A trailing slash keeps `join` from dropping the last path segment.
        let mut normalized = base_url.trim_end_matches('/').to_string();
        normalized.push('/');
        let base_url = Url::parse(&normalized)
            .with_context(|| format!("Invalid API URL: {}", base_url))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT_VALUE)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    fn evals_url(&self) -> Result<Url> {
        Ok(self.base_url.join("api/evals/")?)
    }

    // The id is pushed as one percent-encoded segment, never resolved as a
    // relative reference.
    fn run_url(&self, run_id: &RunId) -> Result<Url> {
        let id = run_id.as_str();
        if matches!(id, "" | "." | "..") {
            return Err(EvalError::InvalidRunId {
                run_id: id.to_string(),
            }
            .into());
        }

        let mut url = self.evals_url()?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API URL cannot hold a path"))?
            .pop_if_empty()
            .push(id)
            .push("");
        Ok(url)
    }
}

async fn api_error(response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("Could not read error response: {}", e));
    EvalError::Api {
        status: status.as_u16(),
        body,
    }
    .into()
}

#[async_trait]
impl EvalClientTrait for RealEvalClient {
    #[instrument(
        skip(self, submission),
        fields(
            label = %submission.label,
            traces = submission.traces.len()
        ),
        err
    )]
    async fn evaluate(
        &self,
        submission: &EvaluationSubmission,
    ) -> Result<RunId> {
        let url = self.evals_url()?;
        debug!("Submitting evaluation to {}", url);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(submission)
            .send()
            .await
            .context("Failed to send evaluation request")?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: SubmitResponse = response
            .json()
            .await
            .context("Failed to parse evaluation submission response")?;
        info!("Created evaluation run {}", body.uuid);
        Ok(body.uuid)
    }

    #[instrument(skip(self), err)]
    async fn get_eval_run(&self, run_id: &RunId) -> Result<Option<EvalRun>> {
        let url = self.run_url(run_id)?;
        debug!("Fetching evaluation run from {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Failed to send run fetch request")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let run: EvalRun = response.json().await.with_context(|| {
            format!("Failed to parse evaluation run {}", run_id)
        })?;
        Ok(Some(run))
    }
}

pub fn create_eval_client(
    base_url: &str,
    api_key: Option<String>,
    timeout: Duration,
) -> Result<Arc<dyn EvalClientTrait>> {
    let api_key = api_key.ok_or_else(|| {
        anyhow::anyhow!("Evaluation API key not configured")
    })?;
    Ok(Arc::new(RealEvalClient::new(base_url, &api_key, timeout)?))
}
