//! Rewrite or regenerate a research article from its source text.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use super::{Flow, FlowError};

pub const MIN_ARTICLE_CHARS: usize = 100;
pub const LONG_ARTICLE_CHARS: usize = 50_000;

pub struct RewriteResearchArticle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetAudience {
    General,
    MedicalProfessional,
    #[default]
    Researcher,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteInput {
    pub original_article_text: String,
    /// e.g. "summarize for a lay audience". Empty means write a full new article.
    #[serde(default)]
    pub rewrite_instructions: Option<String>,
    #[serde(default)]
    pub target_audience: TargetAudience,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteOutput {
    pub generated_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_summary: Option<String>,
}

impl Flow for RewriteResearchArticle {
    const NAME: &'static str = "rewriteResearchArticle";
    const TEMPLATE: &'static str = "\
You are an expert academic AI assistant specializing in medical research writing.
Process the original research article below and generate new content according to the instructions.

Original article text:
{{ original_article_text }}

Instructions:
{% if rewrite_instructions %}{{ rewrite_instructions }}
{% else %}Write a comprehensive new research article based on the key findings, methodology and discussion of the original.
Structure it with an Abstract, Introduction, Methods, Results, Discussion and Conclusion.
{% endif %}Target audience: {{ target_audience }}

Return generated_content with the rewritten or generated article, and source_summary with a brief
summary of the points from the original that informed it.
Keep a formal academic tone appropriate for the target audience.";

    type Input = RewriteInput;
    type Output = RewriteOutput;

    fn output_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "generated_content": {"type": "string"},
                "source_summary": {"type": "string"}
            },
            "required": ["generated_content"]
        })
    }

    fn validate(input: &RewriteInput) -> Result<(), FlowError> {
        let chars = input.original_article_text.chars().count();
        if chars < MIN_ARTICLE_CHARS {
            return Err(FlowError::InvalidInput(
                "Original article text is too short for meaningful rewriting.".to_string(),
            ));
        }
        if chars > LONG_ARTICLE_CHARS {
            warn!(chars, "Article text is very long; the model may truncate it");
        }
        Ok(())
    }
}
