//! Test case synthesis from an endpoint group's canonical sample.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::group::EndpointGroup;
use super::naming::test_name;
use crate::capture::{ParsedValue, RequestBody, Transaction};

static ATTACHMENT_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"filename="([^"]+)""#).expect("valid regex"));

/// Filename asserted when an attachment does not name one.
pub const DEFAULT_ATTACHMENT_NAME: &str = "downloaded_file";

/// One synthesized regression test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Test function name, unique within its suite once assembled.
    pub name: String,
    /// HTTP method.
    pub method: String,
    /// URL path.
    pub path: String,
    /// Coerced query parameters, sorted by key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_params: BTreeMap<String, ParsedValue>,
    /// Request payload to send.
    pub request: RequestBody,
    /// Recorded result to assert.
    pub expected: Expected,
    /// How many captured transactions shared this signature.
    pub observed: usize,
}

/// Expected status and body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expected {
    /// Status code.
    pub status: u16,
    /// Body assertion.
    pub body: ExpectedBody,
}

/// How the response body is asserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpectedBody {
    /// Structural equality with a JSON document.
    Json {
        /// Expected document.
        document: serde_json::Value,
    },
    /// Exact text equality; the body was UTF-8 but not JSON.
    Text {
        /// Expected text.
        text: String,
    },
    /// Exact byte equality; the body was not UTF-8.
    Binary {
        /// Base64 of the expected bytes.
        base64: String,
    },
    /// A `Content-Disposition: attachment` download.
    File {
        /// Filename that must appear in `Content-Disposition`.
        filename: String,
        /// Expected `Content-Type`, when one was recorded.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
        /// Base64 of the expected bytes.
        base64: String,
    },
}

impl ExpectedBody {
    /// Derives the body assertion from a recorded response.
    ///
    /// Attachments are asserted by header and bytes. A body with a
    /// `Content-Type` is decoded as JSON, falling back to text, then to
    /// bytes; without one it is opaque and only ever text or bytes.
    #[must_use]
    pub fn from_response(transaction: &Transaction) -> Self {
        let body = transaction.response_body.as_deref().unwrap_or_default();
        let headers = &transaction.response_headers;

        if let Some(disposition) = headers
            .get("content-disposition")
            .filter(|d| d.to_ascii_lowercase().contains("attachment"))
        {
            let filename = ATTACHMENT_FILENAME
                .captures(disposition)
                .and_then(|c| c.get(1))
                .map_or_else(|| DEFAULT_ATTACHMENT_NAME.to_string(), |m| m.as_str().to_string());
            return Self::File {
                filename,
                content_type: headers.get("content-type").map(String::from),
                base64: STANDARD.encode(body),
            };
        }

        let typed = headers.get("content-type").is_some();
        match std::str::from_utf8(body) {
            Ok(text) if typed => serde_json::from_str(text).map_or_else(
                |_| Self::Text { text: text.to_string() },
                |document| Self::Json { document },
            ),
            Ok(text) => Self::Text { text: text.to_string() },
            Err(_) => Self::Binary { base64: STANDARD.encode(body) },
        }
    }

    /// Returns the raw expected bytes for byte-level assertions.
    #[must_use]
    pub fn bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::Binary { base64 } | Self::File { base64, .. } => STANDARD.decode(base64).ok(),
            Self::Text { text } => Some(text.as_bytes().to_vec()),
            Self::Json { .. } => None,
        }
    }
}

/// Synthesizes the test case for a group from its first member.
#[must_use]
pub fn synthesize(group: &EndpointGroup, significant_params: &[String]) -> TestCase {
    let sample = group.sample();
    TestCase {
        name: test_name(&sample.path, &sample.payload, &group.params, significant_params),
        method: sample.method.clone(),
        path: sample.path.clone(),
        query_params: group.params.clone(),
        request: sample.payload.clone(),
        expected: Expected {
            status: sample.response_status,
            body: ExpectedBody::from_response(sample),
        },
        observed: group.len(),
    }
}
