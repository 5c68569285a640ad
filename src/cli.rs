use clap::Parser;

use crate::client::real::DEFAULT_API_URL;

/// Command-line arguments shared by every subcommand
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    /// Evaluation API key
    #[arg(long, env = "FAITHCHECK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Evaluation API base URL
    #[arg(long, default_value = DEFAULT_API_URL, env = "FAITHCHECK_API_URL")]
    pub api_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,
}
