use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use covpilot_core::config::PipelineConfig;
use covpilot_core::pipeline::CommitStatus;
use covpilot_core::pipeline::Pipeline;
use covpilot_core::pipeline::PipelineOutcome;
use covpilot_core::pipeline::RunOptions;
use covpilot_coverage::SelectionPolicy;
use owo_colors::OwoColorize;

use crate::progress::ConsoleProgress;

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Stop after selecting a gap and print it.
    #[arg(long)]
    pub dry_run: bool,

    /// Leave the new test uncommitted.
    #[arg(long)]
    pub no_commit: bool,

    /// Override `codebase_root` from the configuration.
    #[arg(long, value_name = "PATH")]
    pub codebase_root: Option<PathBuf>,

    /// Override the selection policy (first-found or worst-first).
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<SelectionPolicy>,

    /// Create `<Class>GeneratedTest.java` when the companion test is absent.
    #[arg(long)]
    pub scaffold_missing: bool,
}

pub(crate) async fn run(mut config: PipelineConfig, args: RunArgs) -> Result<i32> {
    if let Some(root) = args.codebase_root {
        config.codebase_root = root;
    }
    if let Some(policy) = args.policy {
        config.selection.policy = policy;
    }
    config.scaffold_missing |= args.scaffold_missing;
    config.validate()?;

    let options = RunOptions {
        dry_run: args.dry_run,
        no_commit: args.no_commit,
    };
    let pipeline = Pipeline::from_config(config, options)?.with_progress(Arc::new(ConsoleProgress));
    let report = pipeline.run().await;

    match &report.outcome {
        Ok(PipelineOutcome::NoGap) => {
            println!("{} No coverage gap left to fill.", "✓".bright_green());
        }
        Ok(PipelineOutcome::DryRun { gap, source_file }) => {
            println!(
                "{} Next gap: {} ({} missed instructions, {:.2}% covered)",
                "▶".bright_blue(),
                gap.describe().bright_cyan(),
                gap.missed,
                gap.percent
            );
            println!("  Class:  {}", gap.dotted_class_name());
            println!("  Source: {}", source_file.display());
        }
        Ok(PipelineOutcome::Completed {
            gap,
            inserted,
            verified,
            commit,
        }) => {
            let method = inserted.method_name.as_deref().unwrap_or("generated members");
            println!(
                "{} Added {} to {} for {}",
                "✓".bright_green(),
                method.bright_cyan(),
                inserted.path.display(),
                gap.describe()
            );
            if !verified {
                println!("  {}", "Verification failed; review the new test manually.".yellow());
            }
            match commit {
                CommitStatus::Created => println!("  Committed."),
                CommitStatus::NothingToCommit => println!("  Nothing to commit."),
                CommitStatus::Skipped => println!("  Commit skipped."),
                CommitStatus::Failed(reason) => {
                    println!("  {} {}", "Commit failed:".yellow(), reason);
                }
            }
        }
        Err(err) => {
            eprintln!("{} {err}", "✗".bright_red());
        }
    }
    Ok(report.exit_code())
}
