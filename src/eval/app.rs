use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::eval::models::RunId;
use crate::fixtures::{load_fixtures, require_min_fixtures};
use crate::orchestrator::EvaluationOrchestrator;
use crate::report::{ReportFormat, VerificationReport};
use crate::stats::{compute_statistics, DEFAULT_TOLERANCE};
use crate::{cli::CommonArgs, create_app_state, AppConfig, AppState};

pub const DEFAULT_LABEL: &str = "unit_test_faithfulness";
pub const DEFAULT_TAG: &str = "faithfulness";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    pub common_args: CommonArgs,
}

#[derive(clap::Args, Debug, Clone)]
struct CheckArgs {
    /// YAML file with query/reference/output/score records
    #[arg(long)]
    fixtures: PathBuf,

    /// Label of the evaluation run
    #[arg(long, default_value = DEFAULT_LABEL)]
    label: String,

    /// Tags attached to the run; the first one is checked on the result
    #[arg(long = "tag", default_values_t = [DEFAULT_TAG.to_string()])]
    tags: Vec<String>,

    /// Absolute tolerance for score and statistic comparisons
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Output format (text, json, csv)
    #[arg(long, default_value = "text")]
    format: String,

    /// Free-text description sent with the submission
    #[arg(long)]
    description: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit fixtures for evaluation and verify the returned run
    Run(CheckArgs),

    /// Verify an existing run against fixtures
    CheckRun {
        /// Identifier of the run to fetch
        #[arg(long)]
        run_id: String,

        #[command(flatten)]
        check: CheckArgs,
    },

    /// Print local statistics of the fixture ground-truth scores
    Stats {
        #[arg(long)]
        fixtures: PathBuf,
    },
}

pub async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let passed = run_app(Cli::parse()).await?;
    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

/// Runs one command; returns whether every check passed.
pub async fn run_app(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Stats { fixtures } => {
            info!("Computing fixture statistics for {}", fixtures.display());
            print_fixture_statistics(&fixtures)?;
            Ok(true)
        }
        Commands::Run(check) => {
            let state = state_from_args(cli.common_args)?;
            info!(
                "Running evaluation {} with format {}",
                check.label, check.format
            );
            run_evaluation(state, &check, None).await
        }
        Commands::CheckRun { run_id, check } => {
            let state = state_from_args(cli.common_args)?;
            info!("Checking run {} with format {}", run_id, check.format);
            run_evaluation(state, &check, Some(RunId(run_id))).await
        }
    }
}

fn state_from_args(args: CommonArgs) -> Result<Arc<AppState>> {
    create_app_state(AppConfig {
        api_url: args.api_url,
        api_key: args.api_key,
        timeout_secs: args.timeout_secs,
    })
}

async fn run_evaluation(
    state: Arc<AppState>,
    check: &CheckArgs,
    existing: Option<RunId>,
) -> Result<bool> {
    let format: ReportFormat = check.format.parse()?;
    let fixtures = load_fixtures(&check.fixtures)?;
    require_min_fixtures(&fixtures)?;

    let tags: BTreeSet<String> = check.tags.iter().cloned().collect();
    let tag = check.tags.first().map(String::as_str).unwrap_or(DEFAULT_TAG);

    let orchestrator = EvaluationOrchestrator::new(state.eval_client.clone())
        .with_description(check.description.clone());
    let scenario = match existing {
        Some(run_id) => orchestrator.load(run_id, fixtures).await?,
        None => orchestrator.run(fixtures, &check.label, &tags).await?,
    };

    let report = VerificationReport::from_scenario(
        &scenario,
        &check.label,
        tag,
        check.tolerance,
    );
    print!("{}", report.render(format)?);
    Ok(report.passed())
}

fn print_fixture_statistics(path: &Path) -> Result<()> {
    let fixtures = load_fixtures(path)?;
    let scores: Vec<f64> = fixtures.iter().map(|f| f.score).collect();
    let stats = compute_statistics(&scores)?;
    println!(
        "{} fixtures: mean={:.4} p20={:.4} p90={:.4}",
        scores.len(),
        stats.mean,
        stats.p20,
        stats.p90
    );
    Ok(())
}
