//! File-upload analysis: `/api/diagnosis` and `/api/analyze-document`.
//!
//! Both take a multipart form with a single `file` field. Text files are
//! handed to the model as text; images, PDFs and Word documents travel as a
//! base64 data URI, which the hosted model caps at roughly 4 MB.

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use netram_llm::flows::{AnalyzeDocumentContent, AnalyzeEyeImage, DocumentAnalysis, DocumentInput, EyeImageAnalysis};
use netram_llm::media::encode_data_uri;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// Encoded payload ceiling (characters of the full `data:` URI).
pub const MAX_DATA_URI_LEN: f64 = 3.9 * 1024.0 * 1024.0;
/// Plain-text ceiling, in characters.
pub const MAX_TEXT_CHARS: usize = 180_000;

const PDF: &str = "application/pdf";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Upload {
    pub fn is_text(&self) -> bool {
        matches!(self.content_type.as_str(), "text/plain" | "text/csv")
            || self.file_name.ends_with(".txt")
            || self.file_name.ends_with(".csv")
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    fn is_binary_document(&self) -> bool {
        matches!(self.content_type.as_str(), PDF | DOCX)
    }

    fn data_uri(&self) -> ApiResult<String> {
        let uri = encode_data_uri(&self.content_type, &self.bytes);
        if uri.len() as f64 > MAX_DATA_URI_LEN {
            return Err(ApiError::PayloadTooLarge(
                "Encoded file data too large for AI processing (max approx 4MB).".into(),
            ));
        }
        Ok(uri)
    }

    fn text(&self) -> ApiResult<String> {
        let text = String::from_utf8_lossy(&self.bytes).into_owned();
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(ApiError::PayloadTooLarge(
                "Text content too large for direct processing (max 180k chars).".into(),
            ));
        }
        Ok(text)
    }

    fn unsupported(&self, supported: &str) -> ApiError {
        let kind = if self.content_type.is_empty() { "unknown" } else { &self.content_type };
        ApiError::UnsupportedMediaType(format!("Unsupported file type: {kind}. Supported types: {supported}."))
    }
}

/// Pulls the `file` field out of the form and enforces the raw size limit.
async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> ApiResult<Upload> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_ascii_lowercase();
        let bytes = field.bytes().await?;
        if bytes.len() > max_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "File size exceeds {}MB limit",
                max_bytes / (1024 * 1024)
            )));
        }
        return Ok(Upload { file_name, content_type, bytes });
    }
    Err(ApiError::BadRequest("No file uploaded".into()))
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DiagnosisResult {
    Image(EyeImageAnalysis),
    Document(DocumentAnalysis),
}

#[derive(Debug, Serialize)]
pub struct DiagnosisResponse {
    pub diagnosis_result: DiagnosisResult,
    pub result_type: &'static str,
}

/// POST /api/diagnosis
pub async fn diagnosis(
    State(state): State<SharedState>,
    _user: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<DiagnosisResponse>> {
    let upload = read_upload(multipart, state.max_upload_bytes).await?;
    let data_uri = upload.data_uri()?;
    info!(file = %upload.file_name, content_type = %upload.content_type, bytes = upload.bytes.len(), "Diagnosis upload");

    if upload.is_image() {
        let analysis = state.flows
            .run::<AnalyzeEyeImage>(netram_llm::flows::EyeImageInput { eye_scan_data_uri: data_uri })
            .await?;
        return Ok(Json(DiagnosisResponse {
            diagnosis_result: DiagnosisResult::Image(analysis),
            result_type: "image_analysis",
        }));
    }

    let input = if upload.is_text() {
        DocumentInput { text_content: Some(upload.text()?), file_name: Some(upload.file_name.clone()), ..Default::default() }
    } else if upload.is_binary_document() {
        DocumentInput { file_data_uri: Some(data_uri), file_name: Some(upload.file_name.clone()), ..Default::default() }
    } else {
        return Err(upload.unsupported("PDF, DOCX, TXT, CSV, common image formats (JPG, PNG, WebP)"));
    };

    let analysis = state.flows.run::<AnalyzeDocumentContent>(input).await?;
    Ok(Json(DiagnosisResponse {
        diagnosis_result: DiagnosisResult::Document(analysis),
        result_type: "document_analysis",
    }))
}

/// POST /api/analyze-document
pub async fn analyze_document(
    State(state): State<SharedState>,
    _user: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<DocumentAnalysis>> {
    let upload = read_upload(multipart, state.max_upload_bytes).await?;
    let file_name = Some(upload.file_name.clone());

    let input = if upload.is_text() {
        DocumentInput { text_content: Some(upload.text()?), file_name, ..Default::default() }
    } else if upload.is_image() || upload.is_binary_document() {
        DocumentInput { file_data_uri: Some(upload.data_uri()?), file_name, ..Default::default() }
    } else {
        return Err(upload.unsupported("TXT, CSV, PDF, DOCX, images"));
    };

    Ok(Json(state.flows.run::<AnalyzeDocumentContent>(input).await?))
}
