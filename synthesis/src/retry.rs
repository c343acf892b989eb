use std::time::Duration;

use async_trait::async_trait;

use crate::error::BackendError;

pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Total attempts and the fixed pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_COUNT,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait for the backoff, then call again.
    Retry(Duration),
    /// Stop and surface the error.
    GiveUp,
}

/// Bookkeeping for one `synthesize` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
    pub last_error: Option<BackendError>,
}

impl RetryState {
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Records a failed attempt. Only transient failures with attempts left
    /// are retried.
    pub fn record_failure(&mut self, error: BackendError, policy: &RetryPolicy) -> RetryDecision {
        let retry = error.is_transient() && self.attempt < policy.max_attempts.max(1);
        self.last_error = Some(error);
        if retry {
            RetryDecision::Retry(policy.backoff)
        } else {
            RetryDecision::GiveUp
        }
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
