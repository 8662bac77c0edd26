//! Structured medical summary of an uploaded document.
//!
//! The document arrives either as extracted text or as a data URI (PDF,
//! image, DOCX) that is attached to the request as media.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Flow, FlowError};
use crate::media::MediaPart;

pub struct AnalyzeDocumentContent;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentInput {
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub file_data_uri: Option<String>,
    /// Original file name, for context only.
    #[serde(default)]
    pub file_name: Option<String>,
}

impl DocumentInput {
    fn text(&self) -> Option<&str> {
        self.text_content.as_deref().filter(|t| !t.trim().is_empty())
    }

    fn data_uri(&self) -> Option<&str> {
        self.file_data_uri.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// Every section is optional; a document may not discuss all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_points_summary: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etiology: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prognosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_summary: Option<String>,
}

impl Flow for AnalyzeDocumentContent {
    const NAME: &'static str = "analyzeDocumentContent";
    const TEMPLATE: &'static str = "\
You are an expert medical information AI.
Analyze the provided document{% if file_name %} (from file: {{ file_name }}){% endif %} and produce a structured medical summary.
{% if text_content %}
Document text:
{{ text_content }}
{% else %}
The document is attached as media.
{% endif %}
Based on the document, provide:
1. topic: the main medical topic or condition discussed.
2. key_points_summary: 3-5 bullet points covering the most critical aspects.
3. etiology: primary causes and significant risk factors, if discussed.
4. symptoms: common early signs and progression, if discussed.
5. diagnosis: diagnostic methods, tests or tools, if discussed.
6. treatment: medical, surgical or lifestyle options, if discussed.
7. prognosis: expected outcomes and long-term outlook, if discussed.
8. overall_summary: a brief summary of the document's medically relevant content.

Omit sections the document does not cover.
Only use information present in, or directly inferable from, the document.";

    type Input = DocumentInput;
    type Output = DocumentAnalysis;

    fn output_schema() -> Value {
        let text = json!({"type": "string"});
        json!({
            "type": "object",
            "properties": {
                "topic": text,
                "key_points_summary": {"type": "array", "items": {"type": "string"}},
                "etiology": text,
                "symptoms": text,
                "diagnosis": text,
                "treatment": text,
                "prognosis": text,
                "overall_summary": text
            }
        })
    }

    fn validate(input: &DocumentInput) -> Result<(), FlowError> {
        if input.text().is_none() && input.data_uri().is_none() {
            return Err(FlowError::InvalidInput(
                "Either text content or a file data URI must be provided.".to_string(),
            ));
        }
        Ok(())
    }

    fn media(input: &DocumentInput) -> Result<Vec<MediaPart>, FlowError> {
        // text wins when both are given
        match (input.text(), input.data_uri()) {
            (None, Some(uri)) => Ok(vec![MediaPart::from_data_uri(uri)?]),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::testing::{runner, StubBackend};

    #[tokio::test]
    async fn test_requires_text_or_file() {
        let stub = StubBackend::replying("{}");
        let err = runner(stub)
            .run::<AnalyzeDocumentContent>(DocumentInput {
                text_content: Some("  ".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_input_error());
    }

    #[tokio::test]
    async fn test_text_document_has_no_media() {
        let stub = StubBackend::replying(r#"{"topic": "Cataract", "key_points_summary": ["Clouding of the lens"]}"#);
        let out = runner(stub.clone())
            .run::<AnalyzeDocumentContent>(DocumentInput {
                text_content: Some("Cataract is a clouding of the lens.".into()),
                file_name: Some("notes.txt".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(out.topic.as_deref(), Some("Cataract"));
        assert_eq!(out.prognosis, None);

        let req = stub.last_request();
        assert!(req.media.is_empty());
        assert!(req.messages[0].content.contains("(from file: notes.txt)"));
        assert!(req.messages[0].content.contains("Cataract is a clouding"));
    }

    #[tokio::test]
    async fn test_file_document_is_attached() {
        let stub = StubBackend::replying("{}");
        let out = runner(stub.clone())
            .run::<AnalyzeDocumentContent>(DocumentInput {
                file_data_uri: Some("data:application/pdf;base64,JVBERi0x".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(out, DocumentAnalysis::default());
        let req = stub.last_request();
        assert_eq!(req.media[0].mime_type, "application/pdf");
        assert!(req.messages[0].content.contains("attached as media"));
    }
}
