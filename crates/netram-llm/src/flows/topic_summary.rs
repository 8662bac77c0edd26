use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{require_text, Flow, FlowError};

pub struct GenerateMedicalTopicSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicInput {
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    /// Always the topic that was asked for.
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub key_points_summary: Vec<String>,
    pub etiology: String,
    pub symptoms: String,
    pub diagnosis: String,
    pub treatment: String,
    pub prognosis: String,
    pub overall_summary: String,
}

impl Flow for GenerateMedicalTopicSummary {
    const NAME: &'static str = "generateMedicalTopicSummary";
    const TEMPLATE: &'static str = "\
You are an expert medical information AI.
For the medical topic: {{ topic }}, provide a comprehensive yet structured summary.

First, provide key_points_summary: 3-5 bullet points covering the most critical aspects of the topic.
Then provide the detailed sections:
1. etiology: primary causes and significant risk factors associated with {{ topic }}.
2. symptoms: common early signs and how {{ topic }} typically progresses.
3. diagnosis: diagnostic methods, tests and tools used to confirm {{ topic }}, with key criteria if applicable.
4. treatment: main medical, surgical and lifestyle options for {{ topic }}, including current best practice.
5. prognosis: expected outcomes and long-term outlook, and the factors that influence it.
6. overall_summary: a brief narrative summary of {{ topic }}, distinct from the key points.

Keep the information accurate and clear, suitable for a medical professional or a well-informed patient.";

    type Input = TopicInput;
    type Output = TopicSummary;

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
            },
            "required": [
                "key_points_summary", "etiology", "symptoms", "diagnosis",
                "treatment", "prognosis", "overall_summary"
            ]
        })
    }

    fn validate(input: &TopicInput) -> Result<(), FlowError> {
        require_text("Topic", &input.topic)
    }

    fn finalize(input: &TopicInput, mut output: TopicSummary) -> TopicSummary {
        output.topic = input.topic.clone();
        output
    }
}
