use crate::client::real::create_eval_client;
use crate::client::EvalClientTrait;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

pub mod cli;
pub mod client;
pub mod error;
pub mod eval;
pub mod fixtures;
pub mod orchestrator;
pub mod report;
pub mod scenario;
pub mod stats;

pub mod test_utils;

pub use error::{EvalError, Mismatch, StatField};
pub use stats::{compute_statistics, verify, Statistics, DEFAULT_TOLERANCE};

// Shared state handed to every command
pub struct AppState {
    pub eval_client: Arc<dyn EvalClientTrait>,
    pub api_url: String,
}

impl AppState {
    pub fn new_for_testing_with_client(
        eval_client: Arc<dyn EvalClientTrait>,
    ) -> Self {
        Self {
            eval_client,
            api_url: "http://localhost:8000".to_string(),
        }
    }
}

// Configuration collected from the command line and environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[instrument(skip(config), fields(api_url = %config.api_url), err)]
pub fn create_app_state(config: AppConfig) -> Result<Arc<AppState>> {
    let eval_client = create_eval_client(
        &config.api_url,
        config.api_key,
        Duration::from_secs(config.timeout_secs),
    )?;
    info!("Using evaluation API at {}", config.api_url);

    Ok(Arc::new(AppState {
        eval_client,
        api_url: config.api_url,
    }))
}
