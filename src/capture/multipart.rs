//! Recovery of a single uploaded file from a `multipart/form-data` body.
//!
//! This is not a full multipart parser: only the first part
//! carrying a `filename="..."` attribute is considered, and every other part
//! is ignored.

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use serde::{Deserialize, Serialize};

static BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"boundary="?([^\s;"]+)"?"#).expect("valid regex"));
static FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"filename="([^"]+)""#).expect("valid regex"));
static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|[;\s])name="([^"]+)""#).expect("valid regex"));
static PART_CONTENT_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)content-type:[ \t]*([^\r\n]+)").expect("valid regex"));

/// Number of leading payload characters inspected by the binary heuristic.
const BINARY_SNIFF_CHARS: usize = 100;

/// A file recovered from a multipart request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpload {
    /// Form field the file was posted under (`file` when absent).
    pub field_name: String,
    /// Original filename from the `Content-Disposition` attribute.
    pub filename: String,
    /// Part content type (`application/octet-stream` when absent).
    pub content_type: String,
    /// Text payload, or the base64 encoding of the bytes when `is_binary`.
    pub payload: String,
    /// Result of the control-character heuristic.
    pub is_binary: bool,
}

impl FileUpload {
    /// Returns the raw payload bytes, decoding base64 for binary uploads.
    ///
    /// # Errors
    ///
    /// Returns an error if a binary payload is not valid base64.
    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        if self.is_binary {
            STANDARD.decode(&self.payload)
        } else {
            Ok(self.payload.as_bytes().to_vec())
        }
    }
}

/// Extracts the first file part from `body`.
///
/// Returns `None` when `content_type` is not multipart, carries no boundary,
/// or no part has a `filename` attribute.
///
/// A payload is classified binary when any of its first 100 characters is a
/// control character other than `\r`, `\n` or `\t`. Short binary payloads that
/// open with printable bytes are misread as text, and a text payload is
/// decoded lossily: bytes that are not valid UTF-8 are replaced with U+FFFD
/// and cannot be recovered from the upload.
#[must_use]
pub fn extract_file(body: &[u8], content_type: &str) -> Option<FileUpload> {
    if !content_type.to_ascii_lowercase().contains("multipart/form-data") {
        return None;
    }
    let boundary = BOUNDARY.captures(content_type)?.get(1)?.as_str();
    let marker = format!("--{boundary}");

    split(body, marker.as_bytes()).into_iter().find_map(parse_part)
}

fn parse_part(part: &[u8]) -> Option<FileUpload> {
    let header_end = find(part, b"\r\n\r\n", 0)?;
    let headers = String::from_utf8_lossy(&part[..header_end]);
    let filename = FILENAME.captures(&headers)?.get(1)?.as_str().to_string();

    let field_name = FIELD_NAME
        .captures(&headers)
        .and_then(|c| c.get(1))
        .map_or_else(|| "file".to_string(), |m| m.as_str().to_string());
    let content_type = PART_CONTENT_TYPE
        .captures(&headers)
        .and_then(|c| c.get(1))
        .map_or_else(|| "application/octet-stream".to_string(), |m| m.as_str().trim().to_string());

    let mut data = &part[header_end + 4..];
    if let Some(stripped) = data.strip_suffix(b"\r\n") {
        data = stripped;
    }

    let is_binary = looks_binary(data);
    let payload = if is_binary {
        STANDARD.encode(data)
    } else {
        String::from_utf8_lossy(data).into_owned()
    };

    Some(FileUpload { field_name, filename, content_type, payload, is_binary })
}

fn looks_binary(data: &[u8]) -> bool {
    String::from_utf8_lossy(data)
        .chars()
        .take(BINARY_SNIFF_CHARS)
        .any(|c| (c as u32) < 32 && !matches!(c, '\r' | '\n' | '\t'))
}

/// Byte-wise `str::split`.
fn split<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut pieces = Vec::new();
    let mut start = 0;
    while let Some(at) = find(haystack, needle, start) {
        pieces.push(&haystack[start..at]);
        start = at + needle.len();
    }
    pieces.push(&haystack[start..]);
    pieces
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..].windows(needle.len()).position(|w| w == needle).map(|i| i + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT_TYPE: &str = "multipart/form-data; boundary=B";

    #[test]
    fn extracts_text_upload() {
        let body = b"--B\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            HELLO\r\n--B--";
        let upload = extract_file(body, CONTENT_TYPE).unwrap();

        assert_eq!(upload.field_name, "file");
        assert_eq!(upload.filename, "a.txt");
        assert_eq!(upload.content_type, "text/plain");
        assert_eq!(upload.payload, "HELLO");
        assert!(!upload.is_binary);
    }

    #[test]
    fn binary_payload_is_base64_encoded() {
        let mut body =
            b"--B\r\nContent-Disposition: form-data; name=\"doc\"; filename=\"x.bin\"\r\n\r\n"
                .to_vec();
        body.extend_from_slice(&[0x00, 0x01, 0x02, b'A']);
        body.extend_from_slice(b"\r\n--B--");

        let upload = extract_file(&body, CONTENT_TYPE).unwrap();
        assert!(upload.is_binary);
        assert_eq!(upload.field_name, "doc");
        assert_eq!(upload.content_type, "application/octet-stream");
        assert_eq!(upload.bytes().unwrap(), vec![0x00, 0x01, 0x02, b'A']);
    }

    #[test]
    fn invalid_utf8_text_payload_is_replaced() {
        let mut body =
            b"--B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"n.txt\"\r\n\r\nab"
                .to_vec();
        body.extend_from_slice(&[0xff, 0xfe]);
        body.extend_from_slice(b"cd\r\n--B--");

        let upload = extract_file(&body, CONTENT_TYPE).unwrap();
        assert!(!upload.is_binary);
        assert_eq!(upload.payload, "ab\u{fffd}\u{fffd}cd");
        assert_eq!(upload.bytes().unwrap(), "ab\u{fffd}\u{fffd}cd".as_bytes());
    }

    #[test]
    fn skips_parts_without_filename() {
        let body = b"--B\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\r\n\
            hello\r\n--B\r\n\
            Content-Disposition: form-data; filename=\"b.csv\"\r\n\r\n\
            a,b\r\n--B--";
        let upload = extract_file(body, CONTENT_TYPE).unwrap();
        assert_eq!(upload.filename, "b.csv");
        assert_eq!(upload.field_name, "file");
        assert_eq!(upload.payload, "a,b");
    }

    #[test]
    fn first_file_part_wins() {
        let body = b"--B\r\n\
            Content-Disposition: form-data; name=\"one\"; filename=\"1.txt\"\r\n\r\n\
            first\r\n--B\r\n\
            Content-Disposition: form-data; name=\"two\"; filename=\"2.txt\"\r\n\r\n\
            second\r\n--B--";
        let upload = extract_file(body, CONTENT_TYPE).unwrap();
        assert_eq!(upload.filename, "1.txt");
        assert_eq!(upload.payload, "first");
    }

    #[test]
    fn rejects_non_multipart_or_missing_boundary() {
        let body = b"--B\r\nContent-Disposition: form-data; filename=\"a\"\r\n\r\nx\r\n--B--";
        assert!(extract_file(body, "application/json").is_none());
        assert!(extract_file(body, "multipart/form-data").is_none());
    }

    #[test]
    fn quoted_boundary_is_unwrapped() {
        let body = b"--xyz\r\n\
            Content-Disposition: form-data; name=\"f\"; filename=\"q.txt\"\r\n\r\n\
            ok\r\n--xyz--";
        let upload = extract_file(body, "multipart/form-data; boundary=\"xyz\"").unwrap();
        assert_eq!(upload.payload, "ok");
    }
}
