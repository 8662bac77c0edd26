//! Eye scan (OCT, fundus) analysis.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Flow, FlowError};
use crate::media::MediaPart;

pub struct AnalyzeEyeImage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EyeImageInput {
    /// `data:<mimetype>;base64,<encoded_data>`
    pub eye_scan_data_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeImageAnalysis {
    pub analysis_result: String,
    #[serde(default)]
    pub suggested_diagnoses: Vec<String>,
}

impl Flow for AnalyzeEyeImage {
    const NAME: &'static str = "analyzeEyeImage";
    const TEMPLATE: &'static str = "\
You are an expert ophthalmologist specializing in analyzing eye scan images.
Identify potential anomalies in the attached eye scan and suggest possible diagnoses.

Return `analysis_result` with your analysis of the image and
`suggested_diagnoses` with the possible diagnoses it supports.";

    type Input = EyeImageInput;
    type Output = EyeImageAnalysis;

    fn output_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "analysis_result": {"type": "string", "description": "Analysis of the eye scan image."},
                "suggested_diagnoses": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Possible diagnoses based on the analysis."
                }
            },
            "required": ["analysis_result", "suggested_diagnoses"]
        })
    }

    fn media(input: &EyeImageInput) -> Result<Vec<MediaPart>, FlowError> {
        let part = MediaPart::from_data_uri(&input.eye_scan_data_uri)?;
        Ok(vec![part])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::testing::{runner, StubBackend};

    #[tokio::test]
    async fn test_image_is_attached() {
        let stub = StubBackend::replying(
            r#"{"analysis_result": "Drusen in macula.", "suggested_diagnoses": ["Early AMD"]}"#,
        );
        let out = runner(stub.clone())
            .run::<AnalyzeEyeImage>(EyeImageInput { eye_scan_data_uri: "data:image/jpeg;base64,/9j/".into() })
            .await
            .unwrap();
        assert_eq!(out.suggested_diagnoses, vec!["Early AMD"]);

        let req = stub.last_request();
        assert_eq!(req.media.len(), 1);
        assert_eq!(req.media[0].mime_type, "image/jpeg");
        // the payload travels as media, never inside the prompt text
        assert!(!req.messages[0].content.contains("/9j/"));
    }

    #[tokio::test]
    async fn test_bad_uri_is_input_error() {
        let stub = StubBackend::replying("{}");
        let err = runner(stub)
            .run::<AnalyzeEyeImage>(EyeImageInput { eye_scan_data_uri: "not-a-uri".into() })
            .await
            .unwrap_err();
        assert!(err.is_input_error());
    }
}
