use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use covpilot_synthesis::GeminiBackend;
use covpilot_synthesis::RetryPolicy;
use covpilot_synthesis::SynthesisClient;
use covpilot_synthesis::SynthesisError;
use covpilot_synthesis::SynthesisRequest;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

const ENDPOINT: &str = "/v1beta/models/gemini-test:generateContent";

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff: Duration::from_millis(10),
    }
}

fn request() -> SynthesisRequest {
    SynthesisRequest::new(
        "com.example.Calculator",
        "divide(II)I",
        "public class Calculator { int divide(int a, int b) { return a / b; } }",
        2000,
        "java",
    )
}

#[tokio::test]
async fn recovers_after_two_unavailable_replies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{
                "text": "Sure.\n```java\n@Test\nvoid dividesEvenly() {\n    assertEquals(2, new Calculator().divide(4, 2));\n}\n```"
            }]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(server.uri(), "key", "gemini-test");
    let result = SynthesisClient::new(Arc::new(backend), fast_retry())
        .synthesize(&request())
        .await
        .unwrap();

    assert_eq!(result.attempts, 3);
    assert_eq!(
        result.code,
        "@Test\nvoid dividesEvenly() {\n    assertEquals(2, new Calculator().divide(4, 2));\n}"
    );
}

#[tokio::test]
async fn reports_unavailable_when_server_never_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(server.uri(), "key", "gemini-test");
    let err = SynthesisClient::new(Arc::new(backend), fast_retry())
        .synthesize(&request())
        .await
        .unwrap_err();

    assert_matches!(err, SynthesisError::Unavailable { attempts: 3, .. });
}
