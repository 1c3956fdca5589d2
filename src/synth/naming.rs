//! Test name derivation.
//!
//! Names are built as `test_<segment><body suffix><query suffix>`, lower-cased,
//! with every run of non-alphanumeric characters collapsed to one `_`.
//! Uniqueness is not guaranteed here; see `Suite::assemble`.

use std::collections::BTreeMap;

use crate::capture::{ParsedValue, RequestBody};

/// Values longer than this are shortened before going into a name.
const MAX_VALUE_CHARS: usize = 20;
/// Characters kept from a shortened value.
const TRUNCATED_VALUE_CHARS: usize = 10;

/// Derives the test name for an endpoint usage.
#[must_use]
pub fn test_name(
    path: &str,
    body: &RequestBody,
    params: &BTreeMap<String, ParsedValue>,
    significant_params: &[String],
) -> String {
    let base = path.split('/').filter(|s| !s.is_empty()).next_back().unwrap_or("endpoint");
    let raw = format!(
        "{base}{}{}",
        body_suffix(body),
        query_suffix(params, significant_params)
    );
    format!("test_{}", collapse(&raw.to_lowercase()))
}

fn body_suffix(body: &RequestBody) -> String {
    match body {
        RequestBody::FileUpload(upload) => {
            let stem = upload
                .filename
                .rsplit_once('.')
                .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
                .map_or(upload.filename.as_str(), |(stem, _)| stem);
            format!("_upload_{}", replace_unsafe(stem))
        }
        RequestBody::Json { document: serde_json::Value::Object(map) } if !map.is_empty() => {
            let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
            keys.sort_unstable();
            format!("_with_{}", keys.iter().take(2).copied().collect::<Vec<_>>().join("_"))
        }
        _ => String::new(),
    }
}

fn query_suffix(params: &BTreeMap<String, ParsedValue>, significant_params: &[String]) -> String {
    let mut suffix = String::new();
    for name in significant_params {
        let Some(value) = params.get(name).filter(|v| !v.is_blank()) else {
            continue;
        };
        let mut text = value.to_string();
        if text.chars().count() > MAX_VALUE_CHARS {
            text = text.chars().take(TRUNCATED_VALUE_CHARS).collect::<String>() + "...";
        }
        suffix.push_str(&format!("_{name}_{}", replace_unsafe(&text)));
    }
    if suffix.is_empty() && !params.is_empty() {
        suffix.push_str("_with_params");
    }
    suffix
}

/// Replaces every character outside `[A-Za-z0-9_]` with `_`.
fn replace_unsafe(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Collapses each run of non-alphanumeric characters into a single `_`.
fn collapse(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}
