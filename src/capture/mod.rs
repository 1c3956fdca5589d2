//! Captured traffic: the canonical transaction model and the normalizers that
//! produce it from each capture source.
//!
//! Two sources are understood:
//!
//! ```text
//! proxy     {"metadata": {...}, "transactions": [{"id", "request", "response", "duration"}]}
//! recorder  [{"timestamp", "url", "method", "request": {...}, "response": {...}}]
//! ```
//!
//! Both normalize into [`Transaction`]. A record that fails to normalize is
//! skipped with a [`Diagnostic`]; it never aborts the batch.

pub mod body;
pub mod coerce;
pub mod multipart;
pub mod proxy;
pub mod recorder;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::context::ServiceContext;
use crate::error::{Error, RecordError, Result};
pub use body::RequestBody;
pub use coerce::{coerce, ParsedValue};
pub use multipart::{extract_file, FileUpload};

/// Header map with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Returns the first value whose name matches `name`, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for Headers {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut pairs: Vec<(String, String)> = iter.into_iter().collect();
        pairs.sort();
        Self(pairs)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Headers {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut pairs: Vec<(String, String)> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        pairs.sort();
        Self(pairs)
    }
}

/// One observed HTTP exchange in canonical form.
///
/// Built once by a normalizer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Source record identifier, for diagnostics.
    pub id: String,
    /// Upper-cased HTTP method.
    pub method: String,
    /// URL path without the query string.
    pub path: String,
    /// URL-decoded query pairs in wire order, duplicates kept.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub request_headers: Headers,
    /// Raw request body.
    pub request_body: Option<Vec<u8>>,
    /// Request body classified by its content type.
    pub payload: RequestBody,
    /// Response status code.
    pub response_status: u16,
    /// Response headers.
    pub response_headers: Headers,
    /// Raw response body, interpreted through the response `Content-Type`.
    pub response_body: Option<Vec<u8>>,
    /// When the request was sent, if the source recorded it.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Source-neutral pieces of a record, before URL and body parsing.
#[derive(Debug, Default)]
pub(crate) struct Exchange {
    pub id: String,
    pub method: String,
    pub url: String,
    pub fallback_path: Option<String>,
    pub request_headers: Headers,
    pub request_body: Option<Vec<u8>>,
    pub response_status: u16,
    pub response_headers: Headers,
    pub response_body: Option<Vec<u8>>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Exchange {
    /// Splits the URL, decodes the query, and classifies the request body.
    pub(crate) fn into_transaction(self) -> std::result::Result<Transaction, RecordError> {
        let (path, query) = split_url(&self.url, self.fallback_path.as_deref())?;
        let payload = RequestBody::classify(
            self.request_headers.get("content-type"),
            self.request_body.as_deref(),
        )?;

        Ok(Transaction {
            id: self.id,
            method: self.method.to_ascii_uppercase(),
            path,
            query,
            request_headers: self.request_headers,
            request_body: self.request_body,
            payload,
            response_status: self.response_status,
            response_headers: self.response_headers,
            response_body: self.response_body,
            timestamp: self.timestamp,
        })
    }
}

fn split_url(
    raw: &str,
    fallback_path: Option<&str>,
) -> std::result::Result<(String, Vec<(String, String)>), RecordError> {
    let parsed = Url::parse(raw).or_else(|_| {
        let base = Url::parse("http://capture.invalid/").map_err(|_| ())?;
        let relative = if raw.is_empty() {
            fallback_path.ok_or(())?
        } else {
            raw
        };
        if relative.starts_with('/') {
            base.join(relative).map_err(|_| ())
        } else {
            Err(())
        }
    });
    let url = parsed.map_err(|()| RecordError::InvalidUrl(raw.to_string()))?;
    Ok((url.path().to_string(), parse_query(url.query().unwrap_or_default())))
}

/// Splits a raw query string into URL-decoded pairs.
///
/// Segments without `=` are ignored. `+` decodes to a space.
#[must_use]
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|segment| segment.contains('='))
        .filter_map(|segment| url::form_urlencoded::parse(segment.as_bytes()).next())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Parses an RFC 3339 or naive ISO-8601 timestamp (naive values are UTC).
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc)).ok().or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|t| t.and_utc())
    })
}

/// Which capture producer a file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Proxy-log flows converted to JSON.
    Proxy,
    /// Browser-automation network recorder.
    Recorder,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proxy => f.write_str("proxy"),
            Self::Recorder => f.write_str("recorder"),
        }
    }
}

/// Source selection requested by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceSelection {
    /// Detect from the top-level shape.
    #[default]
    Auto,
    /// Force the proxy format.
    Proxy,
    /// Force the recorder format.
    Recorder,
}

/// Maps one source-specific record into a [`Transaction`].
pub trait Normalizer {
    /// Typed form of a record in this source.
    type Record: DeserializeOwned;

    /// Source this normalizer reads.
    fn kind(&self) -> SourceKind;

    /// Normalizes a single record.
    ///
    /// # Errors
    ///
    /// Returns a [`RecordError`] when the record cannot be normalized.
    fn normalize(
        &self,
        record: Self::Record,
        index: usize,
    ) -> std::result::Result<Transaction, RecordError>;
}

/// A record that was skipped during normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Position of the record in the capture.
    pub index: usize,
    /// Record identifier, when the record carried one.
    pub id: Option<String>,
    /// Why the record was skipped.
    pub error: RecordError,
}

/// Output of normalizing a whole capture.
#[derive(Debug, Default)]
pub struct Normalized {
    /// Transactions in capture order.
    pub transactions: Vec<Transaction>,
    /// Skipped records.
    pub diagnostics: Vec<Diagnostic>,
}

/// Normalizes every record, skipping and reporting the ones that fail.
pub fn normalize_all<N: Normalizer>(normalizer: &N, records: Vec<serde_json::Value>) -> Normalized {
    let mut out = Normalized::default();
    for (index, value) in records.into_iter().enumerate() {
        let id = value.get("id").and_then(serde_json::Value::as_str).map(String::from);
        let result = serde_json::from_value::<N::Record>(value)
            .map_err(|e| RecordError::Malformed(e.to_string()))
            .and_then(|record| normalizer.normalize(record, index));

        match result {
            Ok(transaction) => out.transactions.push(transaction),
            Err(error) => {
                tracing::warn!(index, id = id.as_deref(), %error, "skipping capture record");
                out.diagnostics.push(Diagnostic { index, id, error });
            }
        }
    }
    tracing::debug!(
        source = %normalizer.kind(),
        kept = out.transactions.len(),
        skipped = out.diagnostics.len(),
        "normalized capture"
    );
    out
}

/// A capture file after top-level parsing.
#[derive(Debug)]
pub struct Capture {
    /// Detected or forced source.
    pub kind: SourceKind,
    /// Proxy metadata block, when present.
    pub metadata: Option<serde_json::Value>,
    /// Unparsed records.
    pub records: Vec<serde_json::Value>,
}

impl Capture {
    /// Reads and parses a capture file through the filesystem port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputNotFound`] for a missing file, [`Error::Io`] when it
    /// cannot be read, [`Error::InvalidCapture`] for unparsable or unrecognised
    /// JSON, and [`Error::EmptyCapture`] when it holds no records.
    pub fn load(ctx: &ServiceContext, path: &Path, selection: SourceSelection) -> Result<Self> {
        if !ctx.fs.exists(path) {
            return Err(Error::InputNotFound(path.to_path_buf()));
        }
        let content = ctx
            .fs
            .read_to_string(path)
            .map_err(|e| Error::Io { path: path.to_path_buf(), message: e.to_string() })?;
        Self::parse(&content, selection)
    }

    /// Parses capture JSON text.
    ///
    /// # Errors
    ///
    /// See [`Capture::load`].
    pub fn parse(content: &str, selection: SourceSelection) -> Result<Self> {
        let root: serde_json::Value =
            serde_json::from_str(content).map_err(|e| Error::InvalidCapture(e.to_string()))?;

        let (metadata, records) = match root {
            serde_json::Value::Object(mut map) => {
                let records = match map.remove("transactions") {
                    Some(serde_json::Value::Array(records)) => records,
                    _ => {
                        return Err(Error::InvalidCapture(
                            "expected a `transactions` array or a top-level array".into(),
                        ))
                    }
                };
                (map.remove("metadata"), records)
            }
            serde_json::Value::Array(records) => (None, records),
            _ => return Err(Error::InvalidCapture("expected a JSON object or array".into())),
        };

        if records.is_empty() {
            return Err(Error::EmptyCapture("the capture contains no records".into()));
        }

        let kind = match selection {
            SourceSelection::Proxy => SourceKind::Proxy,
            SourceSelection::Recorder => SourceKind::Recorder,
            SourceSelection::Auto => detect_kind(metadata.is_some(), &records),
        };
        Ok(Self { kind, metadata, records })
    }

    /// Normalizes the records with the normalizer for this capture's source.
    #[must_use]
    pub fn normalize(self) -> Normalized {
        match self.kind {
            SourceKind::Proxy => normalize_all(&proxy::ProxyNormalizer, self.records),
            SourceKind::Recorder => normalize_all(&recorder::RecorderNormalizer, self.records),
        }
    }
}

fn detect_kind(has_metadata: bool, records: &[serde_json::Value]) -> SourceKind {
    if has_metadata {
        return SourceKind::Proxy;
    }
    let top_level_url = records.first().and_then(|r| r.get("url")).is_some();
    if top_level_url {
        SourceKind::Recorder
    } else {
        SourceKind::Proxy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_lookup_ignores_case() {
        let headers = Headers::from([("Content-Type", "application/json")]);
        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(headers.get("accept"), None);
    }

    #[test]
    fn parse_query_decodes_and_skips_bare_keys() {
        let pairs = parse_query("name=Bob%20Smith&flag&q=a%2Bb&sp=x+y&empty=");
        assert_eq!(
            pairs,
            vec![
                ("name".into(), "Bob Smith".into()),
                ("q".into(), "a+b".into()),
                ("sp".into(), "x y".into()),
                ("empty".into(), String::new()),
            ]
        );
    }

    #[test]
    fn split_url_accepts_relative_paths() {
        let (path, query) = split_url("/api/items?limit=5", None).unwrap();
        assert_eq!(path, "/api/items");
        assert_eq!(query, vec![("limit".into(), "5".into())]);
    }

    #[test]
    fn split_url_uses_fallback_path_when_url_is_empty() {
        let (path, _) = split_url("", Some("/api/fallback?x=1")).unwrap();
        assert_eq!(path, "/api/fallback");
    }

    #[test]
    fn split_url_rejects_garbage() {
        assert!(matches!(split_url("not a url", None), Err(RecordError::InvalidUrl(_))));
    }

    #[test]
    fn parse_timestamp_handles_naive_and_offset_forms() {
        assert!(parse_timestamp("2024-05-01T10:00:00.123456").is_some());
        assert!(parse_timestamp("2024-05-01T10:00:00+02:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn parse_detects_sources() {
        let proxy =
            Capture::parse(r#"{"metadata": {}, "transactions": [{}]}"#, SourceSelection::Auto)
                .unwrap();
        assert_eq!(proxy.kind, SourceKind::Proxy);

        let recorder =
            Capture::parse(r#"[{"url": "http://x/api", "method": "GET"}]"#, SourceSelection::Auto)
                .unwrap();
        assert_eq!(recorder.kind, SourceKind::Recorder);

        let bare_proxy =
            Capture::parse(r#"[{"request": {"url": "http://x/"}}]"#, SourceSelection::Auto)
                .unwrap();
        assert_eq!(bare_proxy.kind, SourceKind::Proxy);
    }

    #[test]
    fn parse_honours_forced_source() {
        let capture = Capture::parse(r#"[{"url": "http://x/"}]"#, SourceSelection::Proxy).unwrap();
        assert_eq!(capture.kind, SourceKind::Proxy);
    }

    #[test]
    fn parse_rejects_empty_and_invalid_input() {
        assert!(matches!(
            Capture::parse("[]", SourceSelection::Auto),
            Err(Error::EmptyCapture(_))
        ));
        assert!(matches!(
            Capture::parse(r#"{"transactions": []}"#, SourceSelection::Auto),
            Err(Error::EmptyCapture(_))
        ));
        assert!(matches!(
            Capture::parse("not json", SourceSelection::Auto),
            Err(Error::InvalidCapture(_))
        ));
        assert!(matches!(
            Capture::parse("42", SourceSelection::Auto),
            Err(Error::InvalidCapture(_))
        ));
    }
}
