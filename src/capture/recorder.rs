//! Normalizer for browser network-recorder entries.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

use super::{parse_timestamp, Exchange, Headers, Normalizer, SourceKind, Transaction};
use crate::error::RecordError;

/// Multipart bodies longer than this are stored base64-encoded by the recorder.
pub const MULTIPART_INLINE_LIMIT: usize = 10_000;

/// One recorder entry.
#[derive(Debug, Deserialize)]
pub struct RecorderEntry {
    /// ISO-8601 capture time.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Full request URL.
    pub url: Option<String>,
    /// HTTP method.
    #[serde(default)]
    pub method: Option<String>,
    /// Request headers and body.
    #[serde(default)]
    pub request: RecorderRequest,
    /// Response status, headers and body.
    pub response: Option<RecorderResponse>,
}

/// Request half of a recorder entry.
#[derive(Debug, Default, Deserialize)]
pub struct RecorderRequest {
    /// Header map.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Post data as text (or base64 for large multipart bodies).
    #[serde(default)]
    pub body: Option<String>,
}

/// Response half of a recorder entry.
#[derive(Debug, Deserialize)]
pub struct RecorderResponse {
    /// HTTP status code.
    pub status: Option<u16>,
    /// Header map.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Body text, or base64 when `is_binary`.
    #[serde(default)]
    pub body: Option<String>,
    /// Whether `body` is base64.
    #[serde(default)]
    pub is_binary: bool,
    /// Content type as seen by the recorder.
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Normalizes [`RecorderEntry`] records.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecorderNormalizer;

impl Normalizer for RecorderNormalizer {
    type Record = RecorderEntry;

    fn kind(&self) -> SourceKind {
        SourceKind::Recorder
    }

    fn normalize(&self, entry: RecorderEntry, index: usize) -> Result<Transaction, RecordError> {
        let url = entry.url.ok_or(RecordError::MissingField("url"))?;
        let response = entry.response.ok_or(RecordError::MissingResponse)?;
        let status = response.status.ok_or(RecordError::MissingField("response.status"))?;

        let request_headers: Headers = entry.request.headers.into();
        let request_content_type = request_headers.get("content-type").unwrap_or_default();
        let request_body = entry
            .request
            .body
            .map(|body| request_bytes(body, request_content_type));

        let mut response_map = response.headers;
        if let Some(content_type) = response.content_type.filter(|ct| !ct.is_empty()) {
            let present = response_map.keys().any(|k| k.eq_ignore_ascii_case("content-type"));
            if !present {
                response_map.insert("content-type".into(), content_type);
            }
        }

        let response_body = match response.body {
            Some(body) if response.is_binary => Some(
                STANDARD
                    .decode(body.trim())
                    .map_err(|e| RecordError::InvalidBase64(e.to_string()))?,
            ),
            Some(body) => Some(body.into_bytes()),
            None => None,
        };

        Exchange {
            id: format!("entry_{index:06}"),
            method: entry.method.unwrap_or_else(|| "GET".into()),
            url,
            fallback_path: None,
            request_headers,
            request_body,
            response_status: status,
            response_headers: response_map.into(),
            response_body,
            timestamp: entry.timestamp.as_deref().and_then(parse_timestamp),
        }
        .into_transaction()
    }
}

/// Recovers raw request bytes from recorded post data.
///
/// The recorder base64-encodes multipart bodies over
/// [`MULTIPART_INLINE_LIMIT`]. Such a body no longer contains its boundary
/// marker; it is decoded here so downstream extraction sees the original
/// bytes. A body that fails to decode is kept as text.
fn request_bytes(body: String, content_type: &str) -> Vec<u8> {
    if !content_type.to_ascii_lowercase().contains("multipart/form-data") || body.starts_with("--")
    {
        return body.into_bytes();
    }
    match STANDARD.decode(body.trim()) {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::debug!(%error, "multipart body is neither raw nor base64, keeping text");
            body.into_bytes()
        }
    }
}
