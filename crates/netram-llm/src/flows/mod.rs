//! Structured AI flows.
//!
//! A flow pairs a typed input with a prompt template and a JSON output
//! schema. [`FlowRunner`] renders the prompt, asks the backend for JSON,
//! decodes the reply into the flow's output type and audits the call.

use minijinja::Environment;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::audit::{AuditLog, LlmAuditEntry};
use crate::backend::{LlmBackend, LlmError, LlmRequest, Message};
use crate::media::{DataUriError, MediaPart};

pub mod eye_image;
pub mod document;
pub mod summarize;
pub mod topic_summary;
pub mod rewrite;
pub mod literature_review;
pub mod conditions;

pub use eye_image::{AnalyzeEyeImage, EyeImageInput, EyeImageAnalysis};
pub use document::{AnalyzeDocumentContent, DocumentInput, DocumentAnalysis};
pub use summarize::{SummarizeText, SummarizeInput, Summary};
pub use topic_summary::{GenerateMedicalTopicSummary, TopicInput, TopicSummary};
pub use rewrite::{RewriteResearchArticle, RewriteInput, RewriteOutput, TargetAudience};
pub use literature_review::{GenerateLiteratureReviewSnippet, LiteratureReviewInput, LiteratureReviewSnippet};
pub use conditions::{SuggestConditions, ConditionsInput, ConditionSuggestions};

#[derive(Debug, Error)]
pub enum FlowError {
    /// The caller's input was rejected before any model call.
    #[error("{0}")]
    InvalidInput(String),
    #[error("Prompt template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error(transparent)]
    Backend(#[from] LlmError),
    #[error("AI flow {flow} did not return an output")]
    EmptyOutput { flow: &'static str },
    #[error("AI flow {flow} returned malformed output: {reason}")]
    InvalidOutput { flow: &'static str, reason: String },
}

impl From<DataUriError> for FlowError {
    fn from(e: DataUriError) -> Self {
        FlowError::InvalidInput(e.to_string())
    }
}

impl FlowError {
    pub fn is_input_error(&self) -> bool {
        matches!(self, FlowError::InvalidInput(_))
    }
}

pub trait Flow {
    const NAME: &'static str;
    const TEMPLATE: &'static str;
    type Input: Serialize + Send + Sync;
    type Output: DeserializeOwned + Send;

    fn output_schema() -> Value;

    fn validate(_input: &Self::Input) -> Result<(), FlowError> {
        Ok(())
    }

    fn media(_input: &Self::Input) -> Result<Vec<MediaPart>, FlowError> {
        Ok(Vec::new())
    }

    fn finalize(_input: &Self::Input, output: Self::Output) -> Self::Output {
        output
    }
}

/// Rejects missing or whitespace-only text fields.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), FlowError> {
    if value.trim().is_empty() {
        return Err(FlowError::InvalidInput(format!("{field} is required.")));
    }
    Ok(())
}

/// Remove a surrounding Markdown code fence (```json … ```), if any.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

pub struct FlowRunner {
    backend: Arc<dyn LlmBackend>,
    audit: Arc<AuditLog>,
    env: Environment<'static>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl FlowRunner {
    pub fn new(backend: Arc<dyn LlmBackend>, audit: Arc<AuditLog>) -> Self {
        let mut env = Environment::new();
        let templates = [
            (AnalyzeEyeImage::NAME, AnalyzeEyeImage::TEMPLATE),
            (AnalyzeDocumentContent::NAME, AnalyzeDocumentContent::TEMPLATE),
            (SummarizeText::NAME, SummarizeText::TEMPLATE),
            (GenerateMedicalTopicSummary::NAME, GenerateMedicalTopicSummary::TEMPLATE),
            (RewriteResearchArticle::NAME, RewriteResearchArticle::TEMPLATE),
            (GenerateLiteratureReviewSnippet::NAME, GenerateLiteratureReviewSnippet::TEMPLATE),
            (SuggestConditions::NAME, SuggestConditions::TEMPLATE),
        ];
        for (name, source) in templates {
            if let Err(e) = env.add_template(name, source) {
                warn!(flow = name, error = %e, "Prompt template failed to compile");
            }
        }
        Self { backend, audit, env, max_tokens: None, temperature: None }
    }

    pub fn with_generation(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = Some(max_tokens);
        self.temperature = Some(temperature);
        self
    }

    pub fn backend(&self) -> &Arc<dyn LlmBackend> {
        &self.backend
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    fn render<F: Flow>(&self, input: &F::Input) -> Result<String, FlowError> {
        let prompt = match self.env.get_template(F::NAME) {
            Ok(t) => t.render(input)?,
            Err(_) => self.env.render_str(F::TEMPLATE, input)?,
        };
        Ok(prompt)
    }

    #[instrument(skip_all, fields(flow = F::NAME))]
    pub async fn run<F: Flow>(&self, input: F::Input) -> Result<F::Output, FlowError> {
        F::validate(&input)?;
        let media = F::media(&input)?;
        let prompt = self.render::<F>(&input)?;
        debug!(prompt_chars = prompt.len(), media = media.len(), "Running flow");

        let req = LlmRequest {
            messages: vec![Message::user(prompt)],
            media,
            response_schema: Some(F::output_schema()),
            model: None,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let started = Instant::now();
        let result = self.backend.complete(req).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                self.audit.record(LlmAuditEntry::new(
                    F::NAME,
                    self.backend.model_id().to_string(),
                    self.backend.name().to_string(),
                    0,
                    0,
                    "",
                    latency_ms,
                    Some(e.to_string()),
                ));
                return Err(e.into());
            }
        };

        let body = strip_code_fences(&resp.content);
        let parsed = if body.is_empty() {
            Err(FlowError::EmptyOutput { flow: F::NAME })
        } else {
            serde_json::from_str::<F::Output>(body).map_err(|e| FlowError::InvalidOutput {
                flow: F::NAME,
                reason: e.to_string(),
            })
        };

        self.audit.record(LlmAuditEntry::new(
            F::NAME,
            resp.model.clone(),
            self.backend.name().to_string(),
            resp.prompt_tokens,
            resp.completion_tokens,
            &resp.content,
            latency_ms,
            parsed.as_ref().err().map(|e| e.to_string()),
        ));

        Ok(F::finalize(&input, parsed?))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::backend::LlmResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a canned body and keeps every request it saw.
    pub struct StubBackend {
        reply: Result<String, String>,
        pub requests: Mutex<Vec<LlmRequest>>,
    }

    impl StubBackend {
        pub fn replying(body: &str) -> Arc<Self> {
            Arc::new(Self { reply: Ok(body.to_string()), requests: Mutex::new(Vec::new()) })
        }

        pub fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self { reply: Err(message.to_string()), requests: Mutex::new(Vec::new()) })
        }

        pub fn last_request(&self) -> LlmRequest {
            self.requests.lock().unwrap().last().cloned().expect("no request recorded")
        }
    }

    #[async_trait]
    impl LlmBackend for StubBackend {
        async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
            self.requests.lock().unwrap().push(req);
            match &self.reply {
                Ok(body) => Ok(LlmResponse {
                    content: body.clone(),
                    model: "stub-model".into(),
                    prompt_tokens: 7,
                    completion_tokens: 3,
                }),
                Err(msg) => Err(LlmError::Unavailable(msg.clone())),
            }
        }

        fn name(&self) -> &'static str { "stub" }
        fn model_id(&self) -> &str { "stub-model" }
        fn is_local(&self) -> bool { true }
        fn max_output_tokens(&self) -> usize { 1024 }
    }

    pub fn runner(backend: Arc<StubBackend>) -> FlowRunner {
        FlowRunner::new(backend, Arc::new(AuditLog::new(16)))
    }
}
