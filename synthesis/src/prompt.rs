use serde::Serialize;

pub const DEFAULT_EXCERPT_LENGTH: usize = 2000;

const DEFAULT_TEMPLATE: &str = "\
You are an experienced {language} engineer writing JUnit 5 unit tests.

Write exactly one complete test method that exercises:
Class: {class_name}
Method: {method_signature}

Source of the class under test (possibly truncated):
```{language}
{excerpt}
```

Rules:
- annotate the method with @Test
- give it a descriptive name
- assert on observable behaviour, not just absence of exceptions
- rely only on the standard library and JUnit 5
- reply with the method code only, no prose and no surrounding class";

/// What to ask the backend for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisRequest {
    pub class_name: String,
    pub method_signature: String,
    pub excerpt: String,
    /// Fence tag expected around the answer, e.g. `java`.
    pub language: String,
}

impl SynthesisRequest {
    /// Builds a request whose excerpt is the first `excerpt_length`
    /// characters of `source`.
    pub fn new(
        class_name: impl Into<String>,
        method_signature: impl Into<String>,
        source: &str,
        excerpt_length: usize,
        language: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_signature: method_signature.into(),
            excerpt: excerpt(source, excerpt_length),
            language: language.into(),
        }
    }
}

/// Instruction text with `{class_name}`, `{method_signature}`, `{excerpt}`
/// and `{language}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn render(&self, request: &SynthesisRequest) -> String {
        // The excerpt goes last so placeholders that happen to occur in user
        // source are not expanded.
        self.text
            .replace("{class_name}", &request.class_name)
            .replace("{method_signature}", &request.method_signature)
            .replace("{language}", &request.language)
            .replace("{excerpt}", &request.excerpt)
    }
}

fn excerpt(source: &str, max_chars: usize) -> String {
    match source.char_indices().nth(max_chars) {
        Some((cut, _)) => source[..cut].to_string(),
        None => source.to_string(),
    }
}
