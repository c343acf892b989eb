use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use covpilot_core::config::PipelineConfig;
use covpilot_core::trend_log::DEFAULT_NOTE;
use covpilot_core::trend_log::TrendEntry;
use covpilot_core::trend_log::TrendLog;
use covpilot_coverage::CoverageReport;
use owo_colors::OwoColorize;

/// History table used when neither `--history` nor `trend_log` is set.
const DEFAULT_HISTORY: &str = "docs/coverage_history.md";

#[derive(Debug, Parser)]
pub struct SummaryArgs {
    /// Text for the notes column.
    #[arg(long, default_value = DEFAULT_NOTE)]
    pub note: String,

    /// Coverage report to read instead of the configured one.
    #[arg(short, long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// History table to append to.
    #[arg(long, value_name = "PATH")]
    pub history: Option<PathBuf>,
}

pub(crate) fn run(config: PipelineConfig, args: SummaryArgs) -> Result<i32> {
    let report_path = args.report.unwrap_or_else(|| config.report_file());
    let report = CoverageReport::parse(&report_path)
        .with_context(|| format!("failed to read coverage report {}", report_path.display()))?;

    let entry = TrendEntry::from_report(&report, args.note);
    let history = args
        .history
        .or(config.trend_log)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY));
    TrendLog::new(&history)
        .append(&entry)
        .with_context(|| format!("failed to append to {}", history.display()))?;

    println!("{}", "Coverage summary:".bright_blue());
    println!("  Instruction: {}", entry.instruction.bright_cyan());
    println!("  Branch:      {}", entry.branch.bright_cyan());
    println!("  Recorded in {}", history.display());
    Ok(0)
}
