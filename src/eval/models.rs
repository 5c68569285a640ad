use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_with_macros::skip_serializing_none;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::EvalError;

/// Evaluator name sent with every submission.
pub const FAITHFULNESS_EVALUATOR: &str = "faithfulness";

/// Opaque identifier of a server-side evaluation run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One trace to be scored: identity is its position in the submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub query: String,
    pub reference: String,
    pub output: String,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSubmission {
    pub label: String,
    pub tags: BTreeSet<String>,
    pub evaluator: String,
    pub traces: Vec<EvaluationRequest>,
    pub description: Option<String>,
}

impl EvaluationSubmission {
    pub fn faithfulness(label: &str, tags: BTreeSet<String>) -> Self {
        Self {
            label: label.to_string(),
            tags,
            evaluator: FAITHFULNESS_EVALUATOR.to_string(),
            traces: Vec::new(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn add_trace(&mut self, request: EvaluationRequest) {
        self.traces.push(request);
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubmitResponse {
    pub uuid: RunId,
}

/// A single scored trace inside a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(deserialize_with = "lenient_f64")]
    pub score: f64,
    // Service-specific fields such as rationale or trace ids.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RunResult {
    pub fn with_score(score: f64) -> Self {
        Self {
            score,
            extra: BTreeMap::new(),
        }
    }
}

/// Server-side record of one batch evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalRun {
    pub label: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub results: Vec<RunResult>,
    #[serde(deserialize_with = "lenient_f64")]
    pub aggregate_score: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub p20: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub p90: f64,
}

impl EvalRun {
    pub fn scores(&self) -> Vec<f64> {
        self.results.iter().map(|r| r.score).collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

/// Accepts `0.5` as well as `"0.5"`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s.trim().parse::<f64>().map_err(|_| {
            serde::de::Error::custom(EvalError::InvalidScore { value: s })
        }),
    }
}
