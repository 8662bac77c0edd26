//! Differential suggestions from presenting symptoms.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{require_text, Flow, FlowError};

pub struct SuggestConditions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionsInput {
    pub symptoms: String,
    #[serde(default)]
    pub patient_history: Option<String>,
}

/// `confidence_scores[i]` belongs to `possible_conditions[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSuggestions {
    pub possible_conditions: Vec<String>,
    #[serde(default)]
    pub confidence_scores: Vec<f64>,
    #[serde(default)]
    pub recommendations: String,
}

impl Flow for SuggestConditions {
    const NAME: &'static str = "suggestConditions";
    const TEMPLATE: &'static str = "\
You are an experienced ophthalmologist assisting with triage.
A patient presents with these symptoms: {{ symptoms }}
{% if patient_history %}Patient history: {{ patient_history }}
{% endif %}
List the possible conditions, most likely first, with a confidence score between 0 and 1 for each,
and give recommendations for next steps. Always advise confirmation by a clinician.";

    type Input = ConditionsInput;
    type Output = ConditionSuggestions;

    fn output_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "possible_conditions": {"type": "array", "items": {"type": "string"}},
                "confidence_scores": {"type": "array", "items": {"type": "number"}},
                "recommendations": {"type": "string"}
            },
            "required": ["possible_conditions", "confidence_scores", "recommendations"]
        })
    }

    fn validate(input: &ConditionsInput) -> Result<(), FlowError> {
        require_text("Symptoms", &input.symptoms)
    }

    fn finalize(_input: &ConditionsInput, mut output: ConditionSuggestions) -> ConditionSuggestions {
        let n = output.possible_conditions.len();
        output.confidence_scores.resize(n, 0.0);
        for score in &mut output.confidence_scores {
            *score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
        }
        output
    }
}
