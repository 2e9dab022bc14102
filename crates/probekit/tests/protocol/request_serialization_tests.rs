//! Tests for probe request JSON

use probekit::{Assertion, AssertionKind, Operator, ProbeRequest, Protocol};

#[test]
fn test_request_uses_camel_case_contract() {
    let request = ProbeRequest::http("https://example.com/api")
        .with_method("POST")
        .with_header("authorization", "Bearer token")
        .with_body("{}")
        .with_timeout_ms(5000)
        .with_assertion(Assertion::header("content-type", Operator::Contains, "json"));

    let value = serde_json::to_value(&request).unwrap();

    assert_eq!(value["target"], "https://example.com/api");
    assert_eq!(value["protocol"], "http");
    assert_eq!(value["method"], "POST");
    assert_eq!(value["headers"]["authorization"], "Bearer token");
    assert_eq!(value["timeoutMs"], 5000);
    assert_eq!(value["assertions"][0]["type"], "header");
    assert_eq!(value["assertions"][0]["condition"], "contains");
    assert_eq!(value["assertions"][0]["property"], "content-type");
}

#[test]
fn test_minimal_request_gets_defaults() {
    let request: ProbeRequest =
        serde_json::from_str(r#"{"target":"db.example.com:5432","protocol":"tcp"}"#).unwrap();

    assert_eq!(request.protocol, Protocol::Tcp);
    assert_eq!(request.method, "GET");
    assert!(request.headers.is_empty());
    assert!(request.body.is_none());
    assert!(request.assertions.is_empty());
    assert!(request.timeout_ms.is_none());
}

#[test]
fn test_assertion_value_accepts_number_or_string() {
    let request: ProbeRequest = serde_json::from_str(
        r#"{
            "target": "https://example.com",
            "protocol": "http",
            "assertions": [
                {"type": "status", "condition": "equals", "value": 200},
                {"type": "body", "condition": "notContains", "value": "error"},
                {"type": "responseTime", "condition": "lessThanOrEqual", "value": "750"}
            ]
        }"#,
    )
    .unwrap();

    let kinds: Vec<AssertionKind> = request.assertions.iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![AssertionKind::Status, AssertionKind::Body, AssertionKind::ResponseTime]
    );
    assert_eq!(request.assertions[0].value.as_number(), Some(200.0));
    assert_eq!(request.assertions[0].value.as_text(), "200");
    assert_eq!(request.assertions[1].operator, Operator::NotContains);
    assert_eq!(request.assertions[2].value.as_number(), Some(750.0));
}
