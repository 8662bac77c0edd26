//! `data:` URI handling for media attached to prompts.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("expected a data URI of the form 'data:<mimetype>;base64,<encoded_data>'")]
    Malformed,
    #[error("data URI is missing a MIME type")]
    MissingMimeType,
    #[error("data URI payload is not valid base64")]
    InvalidBase64,
}

/// Inline media attached to an LLM request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPart {
    pub mime_type: String,
    /// Base64 payload, without the `data:` prefix.
    pub data: String,
}

impl MediaPart {
    /// Parse `data:<mime>;base64,<payload>`.
    pub fn from_data_uri(uri: &str) -> Result<Self, DataUriError> {
        let rest = uri.trim().strip_prefix("data:").ok_or(DataUriError::Malformed)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUriError::Malformed)?;
        let mime = header.strip_suffix(";base64").ok_or(DataUriError::Malformed)?;
        // drop parameters such as `;charset=utf-8`
        let mime = mime.split(';').next().unwrap_or_default().trim();
        if mime.is_empty() {
            return Err(DataUriError::MissingMimeType);
        }
        STANDARD.decode(payload).map_err(|_| DataUriError::InvalidBase64)?;
        Ok(Self { mime_type: mime.to_ascii_lowercase(), data: payload.to_string() })
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self { mime_type: mime_type.into(), data: STANDARD.encode(bytes) }
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Build a data URI directly from raw bytes.
pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_uri() {
        let part = MediaPart::from_data_uri("data:image/PNG;base64,aGVsbG8=").unwrap();
        assert_eq!(part.mime_type, "image/png");
        assert_eq!(part.data, "aGVsbG8=");
        assert!(part.is_image());
    }

    #[test]
    fn test_parameters_are_dropped() {
        let part = MediaPart::from_data_uri("data:text/plain;charset=utf-8;base64,aGk=").unwrap();
        assert_eq!(part.mime_type, "text/plain");
    }

    #[test]
    fn test_rejects_non_data_uris() {
        assert_eq!(MediaPart::from_data_uri("https://x.org/a.png"), Err(DataUriError::Malformed));
        assert_eq!(MediaPart::from_data_uri("data:image/png,raw"), Err(DataUriError::Malformed));
        assert_eq!(MediaPart::from_data_uri("data:;base64,aGk="), Err(DataUriError::MissingMimeType));
        assert_eq!(MediaPart::from_data_uri("data:image/png;base64,@@@"), Err(DataUriError::InvalidBase64));
    }

    #[test]
    fn test_encode_matches_parse() {
        let uri = encode_data_uri("application/pdf", b"%PDF-1.4");
        let part = MediaPart::from_data_uri(&uri).unwrap();
        assert_eq!(part.to_data_uri(), uri);
    }
}
