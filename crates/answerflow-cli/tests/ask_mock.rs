//! Integration tests for `answerflow ask` against a mock backend.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANSWER_STREAM: &str = include_str!("fixtures/answer_stream.sse");

/// Creates a temp ANSWERFLOW_HOME directory for test isolation.
fn temp_home() -> TempDir {
    TempDir::new().expect("create temp answerflow home")
}

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body.to_string())
}

#[tokio::test]
async fn test_ask_streams_answer_and_references() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ask/stream"))
        .and(query_param("query", "How do I avoid stacking?"))
        .respond_with(sse_response(ANSWER_STREAM))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("answerflow")
        .env("ANSWERFLOW_HOME", home.path())
        .env("ANSWERFLOW_BASE_URL", server.uri())
        .args(["ask", "How do I avoid stacking?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Avoid stacking insulin doses [1]."))
        .stdout(predicate::str::contains("doses (Manual A").not())
        .stdout(predicate::str::contains("References:"))
        .stdout(predicate::str::contains("[1] Manual A, Page 3"))
        .stdout(predicate::str::contains("may contain errors"));
}

#[tokio::test]
async fn test_ask_html_prints_sanitized_markup() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ask/stream"))
        .respond_with(sse_response(
            "data: **Wait** first (Manual A, Page 3)<script>alert(1)</script>\n\nevent: end\ndata:\n\n",
        ))
        .mount(&server)
        .await;

    cargo_bin_cmd!("answerflow")
        .env("ANSWERFLOW_HOME", home.path())
        .env("ANSWERFLOW_BASE_URL", server.uri())
        .args(["ask", "--html", "q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<strong>Wait</strong>"))
        .stdout(predicate::str::contains(r#"<sup class="citation" data-citation="1""#))
        .stdout(predicate::str::contains("<script>").not())
        .stdout(predicate::str::contains(r#"<ol class="references">"#));
}

#[tokio::test]
async fn test_ask_reports_backend_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ask/stream"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"detail": "index is rebuilding"})),
        )
        .mount(&server)
        .await;

    cargo_bin_cmd!("answerflow")
        .env("ANSWERFLOW_HOME", home.path())
        .env("ANSWERFLOW_BASE_URL", server.uri())
        .args(["ask", "q"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error: HTTP 503: index is rebuilding"));
}

#[tokio::test]
async fn test_ask_without_streaming() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": "basal rates?",
            "answer": "Basal rates vary by hour (Guide B).",
            "sources": [{"source": "Guide B", "excerpt": "Rates vary."}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("answerflow")
        .env("ANSWERFLOW_HOME", home.path())
        .env("ANSWERFLOW_BASE_URL", server.uri())
        .args(["ask", "--no-stream", "basal rates?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Basal rates vary by hour [1]."))
        .stdout(predicate::str::contains("[1] Guide B"))
        .stdout(predicate::str::contains("Rates vary."))
        .stdout(predicate::str::contains("may contain errors"));
}
