use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitToolingError {
    #[error("`{program}` was not found on PATH")]
    ProgramNotFound { program: &'static str },

    #[error("{path:?} is not inside a git repository")]
    NotARepository { path: PathBuf },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, GitToolingError>;
