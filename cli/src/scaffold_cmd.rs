use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use covpilot_core::config::PipelineConfig;
use covpilot_core::test_file;
use owo_colors::OwoColorize;

#[derive(Debug, Parser)]
pub struct ScaffoldArgs {
    /// Java source file to scaffold a test class for.
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Test source root; defaults to the configured one.
    #[arg(long, value_name = "PATH")]
    pub test_root: Option<PathBuf>,
}

pub(crate) fn run(config: PipelineConfig, args: ScaffoldArgs) -> Result<i32> {
    let test_dir = args.test_root.unwrap_or_else(|| config.test_dir());
    let path = test_file::scaffold_for_source(&test_dir, &args.source)
        .with_context(|| format!("failed to scaffold a test for {}", args.source.display()))?;
    println!("{} {}", "✓".bright_green(), path.display());
    Ok(0)
}
