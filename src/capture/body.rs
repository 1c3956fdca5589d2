//! Request body classification driven by the `Content-Type` header.

use serde::{Deserialize, Serialize};

use super::multipart::{extract_file, FileUpload};
use crate::error::RecordError;

/// A request body after classification.
///
/// The variant is chosen from the request `Content-Type` alone; the payload is
/// never sniffed to guess its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestBody {
    /// No body, or an empty one.
    None,
    /// An `application/json` document.
    Json {
        /// Parsed document.
        document: serde_json::Value,
    },
    /// A file posted as `multipart/form-data`.
    FileUpload(FileUpload),
    /// Any other body, as lossy UTF-8 text.
    Opaque {
        /// Body text.
        text: String,
    },
}

impl RequestBody {
    /// Classifies a raw body by its content type.
    ///
    /// Multipart bodies without a file part fall back to [`RequestBody::Opaque`].
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidJsonBody`] when a JSON content type
    /// carries a body that does not parse.
    pub fn classify(content_type: Option<&str>, body: Option<&[u8]>) -> Result<Self, RecordError> {
        let Some(body) = body.filter(|b| !b.is_empty()) else {
            return Ok(Self::None);
        };
        let content_type = content_type.unwrap_or_default();
        let lowered = content_type.to_ascii_lowercase();

        if lowered.contains("application/json") {
            let document = serde_json::from_slice(body)
                .map_err(|e| RecordError::InvalidJsonBody(e.to_string()))?;
            return Ok(Self::Json { document });
        }
        if lowered.contains("multipart/form-data") {
            if let Some(upload) = extract_file(body, content_type) {
                return Ok(Self::FileUpload(upload));
            }
            tracing::debug!("multipart body without a file part, keeping it opaque");
        }
        Ok(Self::Opaque { text: String::from_utf8_lossy(body).into_owned() })
    }

    /// Returns `true` unless this is [`RequestBody::None`].
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_or_missing_body_is_none() {
        assert_eq!(
            RequestBody::classify(Some("application/json"), None).unwrap(),
            RequestBody::None
        );
        assert_eq!(
            RequestBody::classify(Some("application/json"), Some(b"")).unwrap(),
            RequestBody::None
        );
    }

    #[test]
    fn json_content_type_parses_document() {
        let body = RequestBody::classify(
            Some("application/json; charset=utf-8"),
            Some(br#"{"b": 1, "a": [true, null]}"#),
        )
        .unwrap();
        assert_eq!(body, RequestBody::Json { document: json!({"a": [true, null], "b": 1}) });
    }

    #[test]
    fn invalid_json_is_a_record_error() {
        let err = RequestBody::classify(Some("application/json"), Some(b"{oops")).unwrap_err();
        assert!(matches!(err, RecordError::InvalidJsonBody(_)));
    }

    #[test]
    fn json_looking_text_without_json_header_stays_opaque() {
        let body = RequestBody::classify(Some("text/plain"), Some(br#"{"a":1}"#)).unwrap();
        assert_eq!(body, RequestBody::Opaque { text: r#"{"a":1}"#.into() });
    }

    #[test]
    fn multipart_without_file_is_opaque() {
        let raw = b"--B\r\nContent-Disposition: form-data; name=\"q\"\r\n\r\nv\r\n--B--";
        let body =
            RequestBody::classify(Some("multipart/form-data; boundary=B"), Some(raw)).unwrap();
        assert!(matches!(body, RequestBody::Opaque { .. }));
    }

    #[test]
    fn multipart_with_file_is_upload() {
        let raw = b"--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
                    \r\nhi\r\n--B--";
        let body =
            RequestBody::classify(Some("multipart/form-data; boundary=B"), Some(raw)).unwrap();
        let RequestBody::FileUpload(upload) = body else { panic!("expected upload") };
        assert_eq!(upload.payload, "hi");
    }
}
