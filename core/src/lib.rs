//! Pipeline that builds a Java codebase, picks an under-tested method from its
//! coverage report, asks a model for a test and splices it into the companion
//! test class.

pub mod build_runner;
pub mod config;
mod error;
pub mod pipeline;
pub mod progress;
pub mod test_file;
pub mod trend_log;
pub mod vcs;

pub use error::PipelineError;
pub use error::Result;
