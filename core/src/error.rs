use std::io;
use std::path::PathBuf;

use covpilot_coverage::CoverageError;
use covpilot_git_tooling::GitToolingError;
use covpilot_synthesis::SynthesisError;
use thiserror::Error;

use crate::test_file::TestFileError;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Coverage(#[from] CoverageError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    TestFile(#[from] TestFileError),

    /// The build command ran and failed. `tail` holds its last output lines.
    #[error("build command `{command}` failed (exit code {exit_code:?})")]
    BuildFailed {
        command: String,
        exit_code: Option<i32>,
        tail: String,
    },

    #[error("build command `{command}` timed out after {seconds}s")]
    BuildTimedOut {
        command: String,
        seconds: u64,
        tail: String,
    },

    #[error("source file for {class} not found at {path:?}")]
    SourceMissing { class: String, path: PathBuf },

    #[error("version control failed: {0}")]
    VcsFailed(#[from] GitToolingError),

    #[error("background task failed: {0}")]
    Task(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// Captured command output worth showing the operator, if any.
    pub fn output_tail(&self) -> Option<&str> {
        match self {
            PipelineError::BuildFailed { tail, .. } | PipelineError::BuildTimedOut { tail, .. } => {
                Some(tail.as_str())
            }
            _ => None,
        }
    }
}
