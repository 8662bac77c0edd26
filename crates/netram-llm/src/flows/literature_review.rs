use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{require_text, Flow, FlowError};

pub struct GenerateLiteratureReviewSnippet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteratureReviewInput {
    pub topic: String,
    /// Comma-separated focus keywords.
    #[serde(default)]
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteratureReviewSnippet {
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_source_types: Option<Vec<String>>,
}

impl Flow for GenerateLiteratureReviewSnippet {
    const NAME: &'static str = "generateLiteratureReviewSnippet";
    const TEMPLATE: &'static str = "\
You are an expert AI research assistant specializing in medical literature.
Write a concise literature review snippet (2-3 paragraphs) on the topic below.
{% if keywords %}Focus the review on these keywords: {{ keywords }}
{% endif %}
Topic: {{ topic }}

Also provide:
1. suggested_keywords: 3-5 additional keywords for further research on this topic.
2. potential_source_types: 2-3 kinds of sources where primary studies can be found
   (for example PubMed, ClinicalTrials.gov, Cochrane systematic reviews, specialty journals).

Keep the snippet informative, neutral and professional. Base it on established knowledge
and do not invent findings.";

    type Input = LiteratureReviewInput;
    type Output = LiteratureReviewSnippet;

    fn output_schema() -> Value {
        let list = json!({"type": "array", "items": {"type": "string"}});
        json!({
            "type": "object",
            "properties": {
                "snippet": {"type": "string"},
                "suggested_keywords": list,
                "potential_source_types": list
            },
            "required": ["snippet"]
        })
    }

    fn validate(input: &LiteratureReviewInput) -> Result<(), FlowError> {
        require_text("Topic", &input.topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::testing::{runner, StubBackend};

    #[tokio::test]
    async fn test_keywords_focus_the_prompt() {
        let stub = StubBackend::replying(r#"{"snippet": "Glaucoma research...", "suggested_keywords": ["IOP"]}"#);
        let out = runner(stub.clone())
            .run::<GenerateLiteratureReviewSnippet>(LiteratureReviewInput {
                topic: "Glaucoma".into(),
                keywords: Some("treatment, new therapies".into()),
            })
            .await
            .unwrap();
        assert_eq!(out.suggested_keywords, Some(vec!["IOP".to_string()]));
        assert_eq!(out.potential_source_types, None);
        assert!(stub.last_request().messages[0].content.contains("keywords: treatment, new therapies"));
    }
}
