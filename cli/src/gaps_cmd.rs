use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use covpilot_core::config::PipelineConfig;
use covpilot_coverage::CoverageGap;
use covpilot_coverage::CoverageReport;
use covpilot_coverage::SelectionPolicy;
use covpilot_coverage::select_many;
use owo_colors::OwoColorize;

#[derive(Debug, Parser)]
pub struct GapsArgs {
    /// Ranking policy (worst-first or first-found).
    #[arg(long, value_name = "POLICY", default_value_t = SelectionPolicy::WorstFirst)]
    pub policy: SelectionPolicy,

    /// Number of gaps to list.
    #[arg(short = 'n', long, default_value_t = 10)]
    pub top: usize,

    /// Only consider packages starting with this prefix (dotted or slashed).
    #[arg(short, long, value_name = "PREFIX")]
    pub package: Option<String>,

    /// Keep inner classes (`Outer$Inner`) in the ranking.
    #[arg(long)]
    pub include_inner: bool,

    /// Keep classes whose name contains `Test`.
    #[arg(long)]
    pub include_tests: bool,

    /// Print the gaps as JSON.
    #[arg(long)]
    pub json: bool,

    /// Coverage report to read instead of the configured one.
    #[arg(short, long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

pub(crate) fn run(config: PipelineConfig, args: GapsArgs) -> Result<i32> {
    let report_path = args.report.unwrap_or_else(|| config.report_file());
    let report = CoverageReport::parse(&report_path)
        .with_context(|| format!("failed to read coverage report {}", report_path.display()))?;

    let mut options = config.selection.options;
    options.skip_inner_classes = !args.include_inner;
    options.skip_test_classes = !args.include_tests;
    options.limit = Some(args.top);
    if args.package.is_some() {
        options.package_prefix = args.package;
    }
    let gaps = select_many(&report, args.policy, &options);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&gaps)?);
        return Ok(0);
    }
    if gaps.is_empty() {
        println!("{} No coverage gaps found", "✓".bright_green());
        return Ok(0);
    }
    println!("{}", render_table(&gaps));
    Ok(0)
}

fn render_table(gaps: &[CoverageGap]) -> String {
    let rows: Vec<[String; 6]> = gaps
        .iter()
        .enumerate()
        .map(|(index, gap)| {
            let target = match gap.method_signature() {
                Some(signature) => format!("{}.{signature}", gap.dotted_class_name()),
                None => gap.dotted_class_name(),
            };
            [
                (index + 1).to_string(),
                target,
                format!("{:.2}", gap.instruction_percent),
                format!("{:.2}", gap.branch_percent),
                gap.missed.to_string(),
                gap.missed_branches.to_string(),
            ]
        })
        .collect();
    let header = ["#", "Class", "Inst %", "Branch %", "Missed inst", "Missed br"];
    let width = |column: usize| {
        rows.iter()
            .map(|row| row[column].len())
            .chain(std::iter::once(header[column].len()))
            .max()
            .unwrap_or_default()
    };
    let widths: Vec<usize> = (0..header.len()).map(width).collect();

    let mut out = String::new();
    out.push_str(&format_row(&header.map(str::to_string), &widths));
    for row in &rows {
        out.push('\n');
        out.push_str(&format_row(row, &widths));
    }
    out
}

fn format_row(cells: &[String; 6], widths: &[usize]) -> String {
    let [rank, class, inst, branch, missed, missed_branches] = cells;
    format!(
        "{rank:>w0$}  {class:<w1$}  {inst:>w2$}  {branch:>w3$}  {missed:>w4$}  {missed_branches:>w5$}",
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
        w3 = widths[3],
        w4 = widths[4],
        w5 = widths[5],
    )
    .trim_end()
    .to_string()
}
