//! Asks a generative model for one JUnit test method and reduces the reply to
//! splice-ready code.
//!
//! [`SynthesisClient`] owns the retry loop; backends only classify their
//! failures as transient or permanent.

mod backend;
mod client;
mod error;
mod extract;
mod prompt;
mod retry;

pub use backend::DEFAULT_GEMINI_BASE_URL;
pub use backend::DEFAULT_MODEL;
pub use backend::GeminiBackend;
pub use backend::SynthesisBackend;
pub use client::SynthesisClient;
pub use client::SynthesisResult;
pub use error::BackendError;
pub use error::Result;
pub use error::SynthesisError;
pub use extract::extract_code;
pub use prompt::DEFAULT_EXCERPT_LENGTH;
pub use prompt::PromptTemplate;
pub use prompt::SynthesisRequest;
pub use retry::DEFAULT_RETRY_BACKOFF;
pub use retry::DEFAULT_RETRY_COUNT;
pub use retry::RetryDecision;
pub use retry::RetryPolicy;
pub use retry::RetryState;
pub use retry::Sleeper;
pub use retry::TokioSleeper;
