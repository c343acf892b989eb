use thiserror::Error;

/// Failure of a single backend call, classified for retry purposes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Server-side or transport trouble; worth another attempt.
    #[error("transient backend failure: {0}")]
    Transient(String),

    /// The request itself is wrong (bad key, unknown model, malformed body).
    #[error("backend rejected the request: {0}")]
    Permanent(String),
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Transient(_))
    }
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis backend unavailable after {attempts} attempt(s): {last_error}")]
    Unavailable {
        attempts: u32,
        last_error: BackendError,
    },

    #[error("synthesis backend returned no usable text")]
    EmptyResponse,

    #[error(transparent)]
    Backend(BackendError),
}

pub type Result<T> = std::result::Result<T, SynthesisError>;
