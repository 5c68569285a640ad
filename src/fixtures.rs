use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

use crate::error::EvalError;
use crate::eval::models::{lenient_f64, EvaluationRequest};

/// Fixtures needed for the high, low and medium score checks.
pub const MIN_FIXTURES: usize = 3;

/// One labeled example with its ground-truth faithfulness score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureEntry {
    pub query: String,
    pub reference: String,
    pub output: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub score: f64,
}

impl FixtureEntry {
    pub fn to_request(&self) -> EvaluationRequest {
        EvaluationRequest {
            query: self.query.clone(),
            reference: self.reference.clone(),
            output: self.output.clone(),
        }
    }
}

pub fn parse_fixtures(yaml: &str) -> Result<Vec<FixtureEntry>> {
    let entries: Vec<FixtureEntry> =
        serde_yaml::from_str(yaml).context("Failed to parse fixture YAML")?;
    Ok(entries)
}

#[instrument(err)]
pub fn load_fixtures(path: &Path) -> Result<Vec<FixtureEntry>> {
    let contents = std::fs::read_to_string(path).with_context(|| {
        format!("Failed to read fixture file {}", path.display())
    })?;
    let entries = parse_fixtures(&contents)
        .with_context(|| format!("Invalid fixture file {}", path.display()))?;
    debug!("Loaded {} fixtures from {}", entries.len(), path.display());
    Ok(entries)
}

/// Checks that enough records exist for the positional score checks.
pub fn require_min_fixtures(entries: &[FixtureEntry]) -> Result<(), EvalError> {
    if entries.len() < MIN_FIXTURES {
        return Err(EvalError::NotEnoughFixtures {
            required: MIN_FIXTURES,
            found: entries.len(),
        });
    }
    Ok(())
}
