//! Command-line front end for the covpilot pipeline.

mod gaps_cmd;
mod progress;
mod publish_cmd;
mod run_cmd;
mod scaffold_cmd;
mod summary_cmd;

use std::path::Path;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use covpilot_core::PipelineError;
use covpilot_core::config::CONFIG_FILE_NAME;
use covpilot_core::config::PipelineConfig;
use tracing::debug;

pub use gaps_cmd::GapsArgs;
pub use publish_cmd::PublishArgs;
pub use run_cmd::RunArgs;
pub use scaffold_cmd::ScaffoldArgs;
pub use summary_cmd::SummaryArgs;

/// Exit code for usage and configuration errors, matching clap's own.
pub const USAGE_EXIT_CODE: i32 = 2;

/// Grow test coverage of a Java codebase one generated test at a time.
#[derive(Debug, Parser)]
#[command(name = "covpilot", version)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build, pick one coverage gap, generate a test for it and commit.
    Run(RunArgs),

    /// Rank coverage gaps in the current report.
    Gaps(GapsArgs),

    /// Print aggregate coverage and append it to the history table.
    Summary(SummaryArgs),

    /// Create an empty `<Class>GeneratedTest.java` for a source file.
    Scaffold(ScaffoldArgs),

    /// Push the current branch and open a pull request.
    Publish(PublishArgs),
}

impl Cli {
    /// Runs the selected subcommand and returns the process exit code.
    pub async fn run(self) -> Result<i32> {
        let config = self.config.as_deref();
        match self.command {
            Command::Run(args) => run_cmd::run(load_config(config, true)?, args).await,
            Command::Gaps(args) => gaps_cmd::run(load_config(config, false)?, args),
            Command::Summary(args) => summary_cmd::run(load_config(config, false)?, args),
            Command::Scaffold(args) => scaffold_cmd::run(load_config(config, false)?, args),
            Command::Publish(args) => publish_cmd::run(load_config(config, false)?, args).await,
        }
    }
}

/// Loads the configuration. An explicit `--config` must exist; the default
/// file may be absent unless `required`, in which case defaults apply.
fn load_config(explicit: Option<&Path>, required: bool) -> Result<PipelineConfig> {
    let path = explicit.unwrap_or(Path::new(CONFIG_FILE_NAME));
    if explicit.is_none() && !required && !path.exists() {
        debug!("no {CONFIG_FILE_NAME} found, using defaults");
        return Ok(PipelineConfig::default());
    }
    if !path.is_file() {
        return Err(PipelineError::Config(format!(
            "configuration file {} not found",
            path.display()
        ))
        .into());
    }
    Ok(PipelineConfig::load(path)?)
}

/// Exit code for an error that escaped a subcommand.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::Config(_)) => USAGE_EXIT_CODE,
        _ => 1,
    }
}
