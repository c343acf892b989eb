use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::backend::SynthesisBackend;
use crate::error::Result;
use crate::error::SynthesisError;
use crate::extract::extract_code;
use crate::prompt::PromptTemplate;
use crate::prompt::SynthesisRequest;
use crate::retry::RetryDecision;
use crate::retry::RetryPolicy;
use crate::retry::RetryState;
use crate::retry::Sleeper;
use crate::retry::TokioSleeper;

/// Reply of a successful synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisResult {
    /// Text exactly as the backend returned it.
    pub raw: String,
    /// Code reduced from `raw`, ready to splice.
    pub code: String,
    pub attempts: u32,
}

/// Renders the prompt, calls the backend with bounded retry and extracts the
/// code block. Holds no state between calls.
pub struct SynthesisClient {
    backend: Arc<dyn SynthesisBackend>,
    sleeper: Arc<dyn Sleeper>,
    retry: RetryPolicy,
    template: PromptTemplate,
}

impl SynthesisClient {
    pub fn new(backend: Arc<dyn SynthesisBackend>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            sleeper: Arc::new(TokioSleeper),
            retry,
            template: PromptTemplate::default(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResult> {
        let prompt = self.template.render(request);
        let mut state = RetryState::default();
        loop {
            let attempt = state.begin_attempt();
            info!(
                model = self.backend.model(),
                class = %request.class_name,
                method = %request.method_signature,
                attempt,
                "requesting test synthesis"
            );
            match self.backend.generate(&prompt).await {
                Ok(raw) => {
                    let code = extract_code(&raw, &request.language)
                        .ok_or(SynthesisError::EmptyResponse)?;
                    return Ok(SynthesisResult {
                        raw,
                        code,
                        attempts: attempt,
                    });
                }
                Err(error) => match state.record_failure(error.clone(), &self.retry) {
                    RetryDecision::Retry(backoff) => {
                        warn!(attempt, ?backoff, %error, "synthesis attempt failed; retrying");
                        self.sleeper.sleep(backoff).await;
                    }
                    RetryDecision::GiveUp if error.is_transient() => {
                        return Err(SynthesisError::Unavailable {
                            attempts: state.attempt,
                            last_error: error,
                        });
                    }
                    RetryDecision::GiveUp => return Err(SynthesisError::Backend(error)),
                },
            }
        }
    }
}
