//! Rendering of suites as async pytest modules.
//!
//! Every test awaits one call on the client fixture and asserts the recorded
//! status code, then the body: JSON by structural equality, text and bytes
//! exactly, downloads by `Content-Disposition`/`Content-Type` and bytes.
//! Python literals are emitted with sorted dict keys, so the same suite always
//! renders to the same text.

use std::collections::BTreeMap;

use serde_json::Value;

use super::render::Renderer;
use super::Suite;
use crate::capture::{ParsedValue, RequestBody};
use crate::synth::{ExpectedBody, TestCase};

const INDENT: usize = 4;

/// Methods whose httpx shortcut accepts a request body.
const BODY_SHORTCUTS: &[&str] = &["post", "put", "patch"];
/// Methods with an httpx shortcut at all.
const SHORTCUTS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];

/// Renders pytest modules driving an async HTTP client fixture.
#[derive(Debug, Clone)]
pub struct PytestRenderer {
    fixture: String,
}

impl PytestRenderer {
    /// Creates a renderer whose tests take the named client fixture.
    #[must_use]
    pub fn new(fixture: impl Into<String>) -> Self {
        Self { fixture: fixture.into() }
    }

    fn render_case(&self, case: &TestCase) -> String {
        let fixture = &self.fixture;
        let mut out = format!("\n\n@pytest.mark.asyncio\nasync def {}({fixture}):\n", case.name);

        out.push_str(&expected_setup(&case.expected.body));
        out.push_str(&payload_setup(&case.request));
        out.push('\n');

        let method = case.method.to_ascii_lowercase();
        let shortcuts = if case.request.is_present() {
            BODY_SHORTCUTS
        } else {
            SHORTCUTS
        };
        if shortcuts.contains(&method.as_str()) {
            out.push_str(&format!("    response = await {fixture}.{method}(\n"));
        } else {
            out.push_str(&format!("    response = await {fixture}.request(\n"));
            out.push_str(&format!("        {},\n", py_str(&case.method)));
        }
        out.push_str(&format!("        {},\n", py_str(&case.path)));
        if !case.query_params.is_empty() {
            out.push_str(&format!("        params={},\n", params_literal(&case.query_params)));
        }
        out.push_str(&payload_argument(&case.request));
        out.push_str("    )\n\n");

        out.push_str(&format!("    assert response.status_code == {}\n", case.expected.status));
        out.push_str(&body_assertions(&case.expected.body));
        out
    }
}

impl Renderer for PytestRenderer {
    fn extension(&self) -> &'static str {
        "py"
    }

    fn render(&self, suite: &Suite) -> Result<String, String> {
        let mut out = format!(
            "\"\"\"Golden regression tests for the `{}` resource.\n\n\
             Generated from recorded traffic by goldentrace.\n\"\"\"\n\n\
             import base64\nimport io\nimport json\n\nimport pytest\n",
            suite.resource
        );
        for case in &suite.cases {
            out.push_str(&self.render_case(case));
        }
        Ok(out)
    }
}

fn expected_setup(body: &ExpectedBody) -> String {
    match body {
        ExpectedBody::Json { document } => {
            format!("    expected = {}\n", py_literal(document, INDENT))
        }
        ExpectedBody::Text { text } => format!("    expected = {}\n", py_str(text)),
        ExpectedBody::Binary { base64 } | ExpectedBody::File { base64, .. } => {
            format!("    expected = base64.b64decode({})\n", py_str(base64))
        }
    }
}

fn payload_setup(request: &RequestBody) -> String {
    match request {
        RequestBody::None => String::new(),
        RequestBody::Json { document } => {
            format!("    payload = {}\n", py_literal(document, INDENT))
        }
        RequestBody::FileUpload(upload) if upload.is_binary => {
            format!("    file_data = base64.b64decode({})\n", py_str(&upload.payload))
        }
        RequestBody::FileUpload(upload) => {
            format!("    file_data = {}.encode(\"utf-8\")\n", py_str(&upload.payload))
        }
        RequestBody::Opaque { text } => format!("    payload = {}\n", py_str(text)),
    }
}

fn payload_argument(request: &RequestBody) -> String {
    match request {
        RequestBody::None => String::new(),
        RequestBody::Json { .. } => "        json=payload,\n".to_string(),
        RequestBody::FileUpload(upload) => format!(
            "        files={{{}: ({}, io.BytesIO(file_data), {})}},\n",
            py_str(&upload.field_name),
            py_str(&upload.filename),
            py_str(&upload.content_type)
        ),
        RequestBody::Opaque { .. } => "        content=payload,\n".to_string(),
    }
}

fn body_assertions(body: &ExpectedBody) -> String {
    match body {
        ExpectedBody::Json { .. } => {
            "    assert json.loads(response.content.decode(\"utf-8\")) == expected\n".to_string()
        }
        ExpectedBody::Text { .. } => {
            "    assert response.content.decode(\"utf-8\") == expected\n".to_string()
        }
        ExpectedBody::Binary { .. } => "    assert response.content == expected\n".to_string(),
        ExpectedBody::File { filename, content_type, .. } => {
            let mut out = String::from(
                "    assert \"attachment\" in response.headers[\"content-disposition\"]\n",
            );
            out.push_str(&format!(
                "    assert {} in response.headers[\"content-disposition\"]\n",
                py_str(filename)
            ));
            if let Some(content_type) = content_type {
                out.push_str(&format!(
                    "    assert response.headers[\"content-type\"] == {}\n",
                    py_str(content_type)
                ));
            }
            out.push_str("    assert response.content == expected\n");
            out
        }
    }
}

fn params_literal(params: &BTreeMap<String, ParsedValue>) -> String {
    py_dict(params.iter().map(|(k, v)| (k.as_str(), py_scalar(v))), 2 * INDENT)
}

fn py_scalar(value: &ParsedValue) -> String {
    match value {
        ParsedValue::String(s) => py_str(s),
        other => other.to_string(),
    }
}

/// Renders a JSON value as a Python literal whose closing bracket sits at
/// `indent` columns.
fn py_literal(value: &Value, indent: usize) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => py_str(s),
        Value::Array(items) if items.is_empty() => "[]".to_string(),
        Value::Array(items) => {
            let pad = " ".repeat(indent + INDENT);
            let mut out = String::from("[\n");
            for item in items {
                out.push_str(&format!("{pad}{},\n", py_literal(item, indent + INDENT)));
            }
            out.push_str(&" ".repeat(indent));
            out.push(']');
            out
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&str, &Value> = map.iter().map(|(k, v)| (k.as_str(), v)).collect();
            py_dict(sorted.into_iter().map(|(k, v)| (k, py_literal(v, indent + INDENT))), indent)
        }
    }
}

fn py_dict<'a>(entries: impl Iterator<Item = (&'a str, String)>, indent: usize) -> String {
    let pad = " ".repeat(indent + INDENT);
    let mut body = String::new();
    for (key, value) in entries {
        body.push_str(&format!("{pad}{}: {value},\n", py_str(key)));
    }
    if body.is_empty() {
        return "{}".to_string();
    }
    format!("{{\n{body}{}}}", " ".repeat(indent))
}

/// Double-quoted Python string literal.
fn py_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
