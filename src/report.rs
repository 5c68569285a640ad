use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::str::FromStr;

use crate::scenario::{CheckOutcome, Scenario};
use crate::stats::Statistics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
}

impl FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            unknown => Err(anyhow!("Unknown report format: {}", unknown)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub label: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub tolerance: f64,
    pub recomputed: Statistics,
    pub reported: Statistics,
    pub outcomes: Vec<CheckOutcome>,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    check: &'a str,
    passed: bool,
    detail: &'a str,
}

impl VerificationReport {
    pub fn from_scenario(
        scenario: &Scenario,
        label: &str,
        tag: &str,
        tolerance: f64,
    ) -> Self {
        Self {
            label: label.to_string(),
            run_id: scenario.run_id().to_string(),
            generated_at: Utc::now(),
            tolerance,
            recomputed: scenario.recomputed(),
            reported: scenario.reported(),
            outcomes: scenario.check_all(label, tag, tolerance),
        }
    }

    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => serde_json::to_string_pretty(self)
                .context("Failed to serialize report"),
            ReportFormat::Csv => self.render_csv(),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Run {} ({}) at {}",
            self.run_id,
            self.label,
            self.generated_at.to_rfc3339()
        );
        let _ = writeln!(
            out,
            "recomputed: mean={:.4} p20={:.4} p90={:.4}",
            self.recomputed.mean, self.recomputed.p20, self.recomputed.p90
        );
        let _ = writeln!(
            out,
            "reported:   mean={:.4} p20={:.4} p90={:.4}",
            self.reported.mean, self.reported.p20, self.reported.p90
        );
        for outcome in &self.outcomes {
            let status = if outcome.passed { "PASS" } else { "FAIL" };
            let _ = writeln!(
                out,
                "[{}] {}: {}",
                status, outcome.name, outcome.detail
            );
        }
        let failed = self.failures().count();
        if failed == 0 {
            let _ = writeln!(out, "All {} checks passed", self.outcomes.len());
        } else {
            let _ = writeln!(
                out,
                "{} of {} checks failed",
                failed,
                self.outcomes.len()
            );
        }
        out
    }

    fn render_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for outcome in &self.outcomes {
            writer.serialize(CsvRow {
                check: &outcome.name,
                passed: outcome.passed,
                detail: &outcome.detail,
            })?;
        }
        let bytes = writer.into_inner().context("Failed to flush CSV")?;
        Ok(String::from_utf8(bytes)?)
    }
}
