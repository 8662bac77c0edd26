use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{require_text, Flow, FlowError};

pub struct SummarizeText;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeInput {
    pub text_to_summarize: String,
    /// e.g. "medical abstract", "patient information"
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
}

impl Flow for SummarizeText {
    const NAME: &'static str = "summarizeText";
    const TEMPLATE: &'static str = "\
You are an expert summarization AI.
Provide a concise and accurate summary of the following text.
{% if context %}The context for this summary is: {{ context }}.
{% else %}The summary should be general-purpose.
{% endif %}
Keep the summary to 2-4 sentences if possible, focusing on the most critical information.

Text to summarize:
{{ text_to_summarize }}";

    type Input = SummarizeInput;
    type Output = Summary;

    fn output_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "summary": {"type": "string", "description": "The summarized version of the input text."}
            },
            "required": ["summary"]
        })
    }

    fn validate(input: &SummarizeInput) -> Result<(), FlowError> {
        require_text("Text to summarize", &input.text_to_summarize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::testing::{runner, StubBackend};

    #[tokio::test]
    async fn test_context_reaches_prompt() {
        let stub = StubBackend::replying(r#"{"summary": "ok"}"#);
        runner(stub.clone())
            .run::<SummarizeText>(SummarizeInput {
                text_to_summarize: "Glaucoma is a group of eye conditions.".into(),
                context: Some("patient information".into()),
            })
            .await
            .unwrap();
        let prompt = &stub.last_request().messages[0].content;
        assert!(prompt.contains("The context for this summary is: patient information."));
        assert!(!prompt.contains("general-purpose"));
    }

    #[tokio::test]
    async fn test_without_context() {
        let stub = StubBackend::replying(r#"{"summary": "ok"}"#);
        runner(stub.clone())
            .run::<SummarizeText>(SummarizeInput { text_to_summarize: "Some text.".into(), context: None })
            .await
            .unwrap();
        assert!(stub.last_request().messages[0].content.contains("general-purpose"));
    }
}
