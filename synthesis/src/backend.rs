use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::error::BackendError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// A generative model reachable with one prompt in, one text out.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Gemini `generateContent` over REST.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key, model)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl SynthesisBackend for GeminiBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let body = GenerateContentRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        };
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = format!("{status}: {}", detail.trim());
            debug!(%status, model = %self.model, "generateContent failed");
            return Err(if is_transient_status(status) {
                BackendError::Transient(message)
            } else {
                BackendError::Permanent(message)
            });
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| BackendError::Permanent(format!("undecodable response: {err}")))?;
        Ok(payload.into_text())
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn classify_transport_error(err: reqwest::Error) -> BackendError {
    if err.is_builder() {
        BackendError::Permanent(err.to_string())
    } else {
        BackendError::Transient(err.to_string())
    }
}
