//! Tests for HTTP probe handling

use std::time::Duration;

use probekit::{Assertion, ExecutorConfig, Operator, ProbeExecutor, ProbeRequest};

use crate::common::{StubResponse, closed_port, spawn_http_stub, spawn_silent_server};

fn executor() -> ProbeExecutor {
    let _ = tracing_subscriber::fmt::try_init();
    ProbeExecutor::new(ExecutorConfig::default()).expect("Failed to build executor")
}

#[tokio::test]
async fn test_http_probe_up_without_assertions() {
    let (addr, _) = spawn_http_stub(StubResponse::new(200).body("hello")).await;

    let response = executor().execute(&ProbeRequest::http(format!("http://{addr}/"))).await;

    assert!(response.is_up);
    assert_eq!(response.status_code, 200);
    assert!(response.error.is_none());
    assert!(response.assertion_results.is_none());
    // No assertions, so the body is not captured.
    assert!(response.body.is_none());
}

#[tokio::test]
async fn test_http_probe_status_range_verdict() {
    let (server_error, _) = spawn_http_stub(StubResponse::new(503)).await;
    let (redirect, _) =
        spawn_http_stub(StubResponse::new(301).header("location", "http://127.0.0.1:1/")).await;
    let executor = executor();

    let down = executor.execute(&ProbeRequest::http(format!("http://{server_error}/"))).await;
    assert!(!down.is_up);
    assert_eq!(down.status_code, 503);

    // Redirects are reported as-is, not followed.
    let up = executor.execute(&ProbeRequest::http(format!("http://{redirect}/"))).await;
    assert!(up.is_up);
    assert_eq!(up.status_code, 301);
}

#[tokio::test]
async fn test_http_probe_status_assertion() {
    let (ok_addr, _) = spawn_http_stub(StubResponse::new(200)).await;
    let (missing_addr, _) = spawn_http_stub(StubResponse::new(404)).await;
    let executor = executor();
    let assertion = Assertion::status(Operator::Equals, 200u16);

    let ok = executor
        .execute(&ProbeRequest::http(format!("http://{ok_addr}/")).with_assertion(assertion.clone()))
        .await;
    assert!(ok.is_up);

    let missing = executor
        .execute(&ProbeRequest::http(format!("http://{missing_addr}/")).with_assertion(assertion))
        .await;
    assert!(!missing.is_up);
    let results = missing.assertion_results.expect("assertion results");
    assert_eq!(results.len(), 1);
    assert!(!results[0].passed);
    assert_eq!(results[0].message, "Status 404 equals 200");
}

#[tokio::test]
async fn test_http_probe_header_and_body_assertions() {
    let (addr, _) = spawn_http_stub(
        StubResponse::new(200).header("content-type", "application/json").body(r#"{"ok":true}"#),
    )
    .await;

    let request = ProbeRequest::http(format!("http://{addr}/health"))
        .with_assertion(Assertion::header("content-type", Operator::Contains, "application/json"))
        .with_assertion(Assertion::body(Operator::Matches, r#""ok"\s*:\s*true"#));

    let response = executor().execute(&request).await;
    assert!(response.is_up, "{:?}", response.assertion_results);
    assert_eq!(response.body.as_deref(), Some(r#"{"ok":true}"#));
}

#[tokio::test]
async fn test_http_probe_missing_header_assertion() {
    let (addr, _) = spawn_http_stub(StubResponse::new(200).body("plain")).await;

    let request = ProbeRequest::http(format!("http://{addr}/"))
        .with_assertion(Assertion::header("content-type", Operator::Contains, "application/json"));

    let response = executor().execute(&request).await;
    assert!(!response.is_up);
    let results = response.assertion_results.unwrap();
    assert_eq!(results[0].message, "Header content-type not found");
}

#[tokio::test]
async fn test_http_probe_body_capture_is_bounded() {
    let (addr, _) = spawn_http_stub(StubResponse::new(200).body("a".repeat(50_000))).await;
    let executor = ProbeExecutor::new(ExecutorConfig {
        body_capture_limit: 100,
        ..ExecutorConfig::default()
    })
    .unwrap();

    let request = ProbeRequest::http(format!("http://{addr}/"))
        .with_assertion(Assertion::body(Operator::Contains, "a"));

    let response = executor.execute(&request).await;
    assert!(response.is_up);
    assert_eq!(response.body.map(|body| body.chars().count()), Some(100));
}

#[tokio::test]
async fn test_http_probe_sends_method_headers_and_body() {
    let (addr, log) = spawn_http_stub(StubResponse::new(201)).await;

    let request = ProbeRequest::http(format!("http://{addr}/items"))
        .with_method("post")
        .with_header("x-token", "secret")
        .with_body(r#"{"name":"probe"}"#);

    let response = executor().execute(&request).await;
    assert!(response.is_up);

    let raw = log.lock().unwrap().first().cloned().expect("request recorded");
    assert!(raw.starts_with("POST /items HTTP/1.1"), "{raw}");
    assert!(raw.to_lowercase().contains("x-token: secret"), "{raw}");
    assert!(raw.contains("user-agent: downwatch-probe/"), "{raw}");
    assert!(raw.ends_with(r#"{"name":"probe"}"#), "{raw}");
}

#[tokio::test]
async fn test_http_probe_get_does_not_send_body() {
    let (addr, log) = spawn_http_stub(StubResponse::new(200)).await;

    let request = ProbeRequest::http(format!("http://{addr}/")).with_body("ignored");
    executor().execute(&request).await;

    let raw = log.lock().unwrap().first().cloned().expect("request recorded");
    assert!(raw.starts_with("GET / HTTP/1.1"));
    assert!(!raw.contains("ignored"));
}

#[tokio::test]
async fn test_http_probe_timeout() {
    let addr = spawn_silent_server().await;

    let request = ProbeRequest::http(format!("http://{addr}/")).with_timeout_ms(300);
    let response = executor().execute(&request).await;

    assert!(!response.is_up);
    assert_eq!(response.status_code, 0);
    assert_eq!(response.error.as_deref(), Some("timed out"));
    assert!(response.response_time_ms >= 250, "elapsed {}", response.response_time_ms);
}

#[tokio::test]
async fn test_http_probe_executor_default_timeout() {
    let addr = spawn_silent_server().await;
    let executor = ProbeExecutor::new(ExecutorConfig {
        timeout: Duration::from_millis(200),
        ..ExecutorConfig::default()
    })
    .unwrap();

    let response = executor.execute(&ProbeRequest::http(format!("http://{addr}/"))).await;
    assert_eq!(response.error.as_deref(), Some("timed out"));
}

#[tokio::test]
async fn test_http_probe_connection_refused() {
    let addr = closed_port().await;

    let response = executor().execute(&ProbeRequest::http(format!("http://{addr}/"))).await;

    assert!(!response.is_up);
    assert_eq!(response.status_code, 0);
    let error = response.error.expect("error message");
    assert!(!error.is_empty());
    assert_ne!(error, "timed out");
}

#[tokio::test]
async fn test_http_probe_verdict_is_stable() {
    let (addr, _) = spawn_http_stub(StubResponse::new(200).body("stable")).await;
    let executor = executor();
    let request = ProbeRequest::http(format!("http://{addr}/"))
        .with_assertion(Assertion::body(Operator::Equals, "stable"));

    let first = executor.execute(&request).await;
    let second = executor.execute(&request).await;
    assert!(first.is_up);
    assert_eq!(first.is_up, second.is_up);
    assert_eq!(first.status_code, second.status_code);
}
