use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("coverage artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("malformed coverage artifact: {reason}")]
    MalformedArtifact { reason: String },

    #[error("failed to read coverage artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoverageError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedArtifact {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoverageError>;
