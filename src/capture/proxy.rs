//! Normalizer for proxy-log flows converted to JSON.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::DateTime;
use serde::Deserialize;

use super::{parse_timestamp, Exchange, Normalizer, SourceKind, Transaction};
use crate::error::RecordError;

/// One flow record: `{id, request, response, duration}`.
#[derive(Debug, Deserialize)]
pub struct ProxyFlow {
    /// Flow identifier (`flow_000001`).
    #[serde(default)]
    pub id: Option<String>,
    /// Request half of the flow.
    pub request: Option<ProxyRequest>,
    /// Response half; absent when the flow never completed.
    #[serde(default)]
    pub response: Option<ProxyResponse>,
    /// Seconds between request start and response end.
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Request half of a proxy flow.
#[derive(Debug, Deserialize)]
pub struct ProxyRequest {
    /// HTTP method.
    pub method: Option<String>,
    /// Full request URL.
    #[serde(default)]
    pub url: String,
    /// Path with query, used when the URL is unusable.
    #[serde(default)]
    pub path: Option<String>,
    /// Protocol version string.
    #[serde(default, alias = "httpVersion")]
    pub http_version: Option<String>,
    /// Header map.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Start time in epoch seconds.
    #[serde(default)]
    pub timestamp: Option<f64>,
    /// Start time as ISO-8601.
    #[serde(default)]
    pub timestamp_iso: Option<String>,
    /// Body decoded as UTF-8 text.
    #[serde(default, alias = "body")]
    pub body_text: Option<String>,
    /// Body as base64, for payloads that were not text.
    #[serde(default)]
    pub body_base64: Option<String>,
}

/// Response half of a proxy flow.
#[derive(Debug, Deserialize)]
pub struct ProxyResponse {
    /// HTTP status code.
    #[serde(alias = "statusCode")]
    pub status_code: Option<u16>,
    /// Reason phrase.
    #[serde(default)]
    pub reason: Option<String>,
    /// Header map.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8 text.
    #[serde(default, alias = "body")]
    pub body_text: Option<String>,
    /// Body as base64, for payloads that were not text.
    #[serde(default)]
    pub body_base64: Option<String>,
}

/// Normalizes [`ProxyFlow`] records.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProxyNormalizer;

impl Normalizer for ProxyNormalizer {
    type Record = ProxyFlow;

    fn kind(&self) -> SourceKind {
        SourceKind::Proxy
    }

    fn normalize(&self, flow: ProxyFlow, index: usize) -> Result<Transaction, RecordError> {
        let request = flow.request.ok_or(RecordError::MissingField("request"))?;
        let response = flow.response.ok_or(RecordError::MissingResponse)?;
        let method = request.method.ok_or(RecordError::MissingField("request.method"))?;
        let status = response.status_code.ok_or(RecordError::MissingField("response.status_code"))?;

        let timestamp = request
            .timestamp_iso
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| request.timestamp.and_then(epoch_to_utc));

        Exchange {
            id: flow.id.unwrap_or_else(|| format!("flow_{index:06}")),
            method,
            url: request.url,
            fallback_path: request.path,
            request_body: decode_body(request.body_text, request.body_base64)?,
            request_headers: request.headers.into(),
            response_status: status,
            response_body: decode_body(response.body_text, response.body_base64)?,
            response_headers: response.headers.into(),
            timestamp,
        }
        .into_transaction()
    }
}

/// Text wins over base64; an undecodable base64 body fails the record.
fn decode_body(
    text: Option<String>,
    base64: Option<String>,
) -> Result<Option<Vec<u8>>, RecordError> {
    if let Some(text) = text {
        return Ok(Some(text.into_bytes()));
    }
    base64
        .map(|encoded| {
            STANDARD.decode(encoded.trim()).map_err(|e| RecordError::InvalidBase64(e.to_string()))
        })
        .transpose()
}

#[allow(clippy::cast_possible_truncation)]
fn epoch_to_utc(seconds: f64) -> Option<chrono::DateTime<chrono::Utc>> {
    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}
