//! Replays synthesized test cases against a live service.
//!
//! Each case is sent once with `reqwest` and the response is checked the
//! same way the generated tests check it. Transport failures count as
//! mismatches, never as fatal errors.

use std::fmt;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};

use crate::capture::{Headers, ParsedValue, RequestBody};
use crate::error::{Error, Result};
use crate::suite::Suite;
use crate::synth::{Expected, ExpectedBody, TestCase};

/// A single way a replayed response differs from the recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// The request could not be built or sent.
    Transport(String),
    /// Status code differs.
    Status {
        /// Recorded status.
        expected: u16,
        /// Replayed status.
        actual: u16,
    },
    /// A download header is missing or differs.
    Header {
        /// Header name.
        name: &'static str,
        /// What the header had to contain or equal.
        expected: String,
        /// Replayed value.
        actual: Option<String>,
    },
    /// The body differs.
    Body(String),
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "request failed: {message}"),
            Self::Status { expected, actual } => write!(f, "status {actual}, expected {expected}"),
            Self::Header { name, expected, actual: Some(actual) } => {
                write!(f, "header {name} is `{actual}`, expected `{expected}`")
            }
            Self::Header { name, expected, actual: None } => {
                write!(f, "header {name} missing, expected `{expected}`")
            }
            Self::Body(message) => write!(f, "body {message}"),
        }
    }
}

/// Result of replaying one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Resource the case belongs to.
    pub resource: String,
    /// Test name.
    pub name: String,
    /// Every difference found; empty when the case passed.
    pub mismatches: Vec<Mismatch>,
}

impl Outcome {
    /// Returns `true` when the response matched the recording.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Outcomes of a replay run, in suite order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// One outcome per replayed case.
    pub outcomes: Vec<Outcome>,
}

impl ReplayReport {
    /// Number of cases that did not match.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed()).count()
    }

    /// Converts a report with failures into [`Error::ReplayFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReplayFailed`] if any case failed.
    pub fn into_result(self) -> Result<Self> {
        match self.failed() {
            0 => Ok(self),
            failed => Err(Error::ReplayFailed { failed, total: self.outcomes.len() }),
        }
    }
}

/// Replays every case of `suites` against `base_url` on a current-thread runtime.
///
/// # Errors
///
/// Returns [`Error::Replay`] if the runtime or HTTP client cannot be built.
pub fn replay(base_url: &str, suites: &[Suite]) -> Result<ReplayReport> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Replay(format!("failed to start runtime: {e}")))?;
    let client = Client::builder()
        .build()
        .map_err(|e| Error::Replay(format!("failed to build HTTP client: {e}")))?;
    Ok(runtime.block_on(replay_all(&client, base_url, suites)))
}

/// Replays every case of `suites` with `client`, one at a time.
pub async fn replay_all(client: &Client, base_url: &str, suites: &[Suite]) -> ReplayReport {
    let mut report = ReplayReport::default();
    for suite in suites {
        for case in &suite.cases {
            let mismatches = match send(client, base_url, case).await {
                Ok((status, headers, body)) => {
                    check_response(&case.expected, status, &headers, &body)
                }
                Err(message) => vec![Mismatch::Transport(message)],
            };
            if mismatches.is_empty() {
                tracing::info!(test = %case.name, "replay passed");
            } else {
                for mismatch in &mismatches {
                    tracing::warn!(test = %case.name, %mismatch, "replay mismatch");
                }
            }
            report.outcomes.push(Outcome {
                resource: suite.resource.clone(),
                name: case.name.clone(),
                mismatches,
            });
        }
    }
    report
}

async fn send(
    client: &Client,
    base_url: &str,
    case: &TestCase,
) -> std::result::Result<(u16, Headers, Vec<u8>), String> {
    let request = build_request(client, base_url, case)?;
    let response = request.send().await.map_err(|e| e.to_string())?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
        })
        .collect();
    let body = response.bytes().await.map_err(|e| e.to_string())?;
    Ok((status, headers, body.to_vec()))
}

fn build_request(
    client: &Client,
    base_url: &str,
    case: &TestCase,
) -> std::result::Result<RequestBuilder, String> {
    let method = Method::from_bytes(case.method.as_bytes())
        .map_err(|_| format!("invalid method `{}`", case.method))?;
    let url = format!("{}{}", base_url.trim_end_matches('/'), case.path);
    let mut request = client.request(method, url);

    if !case.query_params.is_empty() {
        let query: Vec<(&str, String)> =
            case.query_params.iter().map(|(k, v)| (k.as_str(), wire_value(v))).collect();
        request = request.query(&query);
    }

    request = match &case.request {
        RequestBody::None => request,
        RequestBody::Json { document } => request.json(document),
        RequestBody::FileUpload(upload) => {
            let bytes = upload.bytes().map_err(|e| format!("upload payload: {e}"))?;
            let part = Part::bytes(bytes)
                .file_name(upload.filename.clone())
                .mime_str(&upload.content_type)
                .map_err(|e| e.to_string())?;
            request.multipart(Form::new().part(upload.field_name.clone(), part))
        }
        RequestBody::Opaque { text } => request.body(text.clone()),
    };
    Ok(request)
}

/// Query value as an HTTP client sends it: lower-case booleans, empty null.
fn wire_value(value: &ParsedValue) -> String {
    match value {
        ParsedValue::Null => String::new(),
        ParsedValue::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Compares a replayed response with the recorded expectation.
#[must_use]
pub fn check_response(
    expected: &Expected,
    status: u16,
    headers: &Headers,
    body: &[u8],
) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    if status != expected.status {
        mismatches.push(Mismatch::Status { expected: expected.status, actual: status });
    }

    match &expected.body {
        ExpectedBody::Json { document } => match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(actual) if actual == *document => {}
            Ok(_) => mismatches.push(Mismatch::Body(
                "differs from the recorded JSON document".into(),
            )),
            Err(e) => mismatches.push(Mismatch::Body(format!("is not JSON: {e}"))),
        },
        ExpectedBody::Text { text } => {
            if body != text.as_bytes() {
                mismatches.push(Mismatch::Body("differs from the recorded text".into()));
            }
        }
        ExpectedBody::Binary { .. } => check_bytes(&expected.body, body, &mut mismatches),
        ExpectedBody::File { filename, content_type, .. } => {
            let disposition = headers.get("content-disposition");
            let attached = disposition
                .is_some_and(|d| d.contains("attachment") && d.contains(filename.as_str()));
            if !attached {
                mismatches.push(Mismatch::Header {
                    name: "content-disposition",
                    expected: format!("attachment; filename=\"{filename}\""),
                    actual: disposition.map(String::from),
                });
            }
            if let Some(content_type) = content_type {
                let actual = headers.get("content-type");
                if actual != Some(content_type.as_str()) {
                    mismatches.push(Mismatch::Header {
                        name: "content-type",
                        expected: content_type.clone(),
                        actual: actual.map(String::from),
                    });
                }
            }
            check_bytes(&expected.body, body, &mut mismatches);
        }
    }
    mismatches
}

fn check_bytes(expected: &ExpectedBody, body: &[u8], mismatches: &mut Vec<Mismatch>) {
    match expected.bytes() {
        Some(bytes) if bytes == body => {}
        Some(bytes) => mismatches.push(Mismatch::Body(format!(
            "has {} bytes that differ from the recorded {} bytes",
            body.len(),
            bytes.len()
        ))),
        None => mismatches.push(Mismatch::Body("recording is not valid base64".into())),
    }
}
