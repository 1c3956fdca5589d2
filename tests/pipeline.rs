//! End-to-end generation runs against real files.

use std::fs;
use std::path::Path;

use goldentrace::commands::generate;
use goldentrace::config::{Config, OutputFormat};
use goldentrace::context::ServiceContext;
use serde_json::json;

fn proxy_flow(
    method: &str,
    url: &str,
    request_headers: serde_json::Value,
    body: Option<&str>,
) -> serde_json::Value {
    json!({
        "request": {"method": method, "url": url, "headers": request_headers, "body_text": body},
        "response": {
            "status_code": 200,
            "headers": {"content-type": "application/json"},
            "body_text": "{\"ok\": true}"
        }
    })
}

fn generate_from(
    dir: &Path,
    capture: &serde_json::Value,
    format: OutputFormat,
) -> generate::Summary {
    let input = dir.join("capture.json");
    fs::write(&input, capture.to_string()).unwrap();
    let config = Config { output_dir: dir.join("out"), format, ..Config::default() };
    generate::run(&ServiceContext::live(), &input, &config, None).unwrap()
}

#[test]
fn differing_query_values_become_separate_tests() {
    let dir = tempfile::tempdir().unwrap();
    let greetings = "http://localhost:8000/api/greetings";
    let mut bob = proxy_flow("GET", &format!("{greetings}?name=Bob"), json!({}), None);
    bob["response"]["body_text"] = json!("{\"message\": \"Hello, Bob\"}");
    let mut alice = proxy_flow("GET", &format!("{greetings}?name=Alice"), json!({}), None);
    alice["response"]["body_text"] = json!("{\"message\": \"Hello, Alice\"}");

    let capture = json!({"metadata": {}, "transactions": [bob, alice]});
    let summary = generate_from(dir.path(), &capture, OutputFormat::Pytest);
    assert_eq!(summary.groups, 2);

    let text = fs::read_to_string(dir.path().join("out/greetings/test_greetings.py")).unwrap();
    assert_eq!(text.matches("@pytest.mark.asyncio").count(), 2);
    assert!(text.contains("\"name\": \"Alice\""));
    assert!(text.contains("\"name\": \"Bob\""));
    assert!(text.contains("\"message\": \"Hello, Bob\""));
    assert!(text.contains("\"message\": \"Hello, Alice\""));
}

#[test]
fn identical_requests_collapse_and_first_response_wins() {
    let dir = tempfile::tempdir().unwrap();
    let first = proxy_flow("GET", "http://h/api/items?limit=10&search=", json!({}), None);
    let mut second = proxy_flow("GET", "http://h/api/items?search=&limit=10", json!({}), None);
    second["response"]["body_text"] = json!("{\"ok\": false}");

    let summary = generate_from(dir.path(), &json!([first, second]), OutputFormat::Pytest);
    assert_eq!(summary.transactions, 2);
    assert_eq!(summary.groups, 1);

    let text = fs::read_to_string(dir.path().join("out/items/test_items.py")).unwrap();
    assert!(text.contains("async def test_items_limit_10(fast_api_client):"));
    assert!(text.contains("\"ok\": True"));
    assert!(!text.contains("\"ok\": False"));
}

#[test]
fn json_and_multipart_requests_render_payloads() {
    let dir = tempfile::tempdir().unwrap();
    let json_post = proxy_flow(
        "POST",
        "http://h/api/v1/users",
        json!({"Content-Type": "application/json"}),
        Some("{\"name\": \"x\", \"age\": 3}"),
    );
    let upload = proxy_flow(
        "POST",
        "http://h/api/v1/uploads",
        json!({"Content-Type": "multipart/form-data; boundary=XyZ"}),
        Some(
            "--XyZ\r\nContent-Disposition: form-data; name=\"doc\"; filename=\"notes.txt\"\r\n\
             Content-Type: text/plain\r\n\r\nhello\r\n--XyZ--\r\n",
        ),
    );

    let summary = generate_from(dir.path(), &json!([json_post, upload]), OutputFormat::Pytest);
    let users = summary.resources.iter().find(|r| r.name == "users").unwrap();
    assert_eq!(users.json_bodies, 1);
    let uploads = summary.resources.iter().find(|r| r.name == "uploads").unwrap();
    assert_eq!(uploads.uploads, 1);

    let users_text = fs::read_to_string(dir.path().join("out/users/test_users.py")).unwrap();
    assert!(users_text.contains("async def test_users_with_age_name(fast_api_client):"));
    assert!(users_text.contains("        json=payload,\n"));

    let uploads_text = fs::read_to_string(dir.path().join("out/uploads/test_uploads.py")).unwrap();
    assert!(uploads_text.contains("async def test_uploads_upload_notes(fast_api_client):"));
    assert!(uploads_text.contains("    file_data = \"hello\".encode(\"utf-8\")\n"));
    assert!(uploads_text
        .contains("files={\"doc\": (\"notes.txt\", io.BytesIO(file_data), \"text/plain\")}"));
}

#[test]
fn recorder_download_renders_as_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let capture = json!([{
        "timestamp": "2024-05-01T10:00:00",
        "url": "http://h/api/reports/export?status=done",
        "method": "GET",
        "request": {"headers": {}},
        "response": {
            "status": 200,
            "headers": {"content-disposition": "attachment; filename=\"r.csv\""},
            "content_type": "text/csv",
            "body": "YSxiCg==",
            "is_binary": true
        }
    }]);

    let summary = generate_from(dir.path(), &capture, OutputFormat::Yaml);
    assert_eq!(summary.source.to_string(), "recorder");

    let text = fs::read_to_string(dir.path().join("out/reports/test_reports.yaml")).unwrap();
    assert!(text.contains("name: test_export_status_done"));
    assert!(text.contains("kind: file"));
    assert!(text.contains("filename: r.csv"));
    assert!(text.contains("base64: YSxiCg=="));

    let manifest = fs::read_to_string(dir.path().join("out/manifest.yaml")).unwrap();
    assert!(manifest.contains("source_kind: recorder"));
    assert!(manifest.contains("test_export_status_done"));
}
