//! Tests for probe response JSON

use probekit::ProbeResponse;

#[test]
fn test_failure_response_shape() {
    let response = ProbeResponse::failure("timed out", 15_000);
    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(value["statusCode"], 0);
    assert_eq!(value["responseTimeMs"], 15_000);
    assert_eq!(value["isUp"], false);
    assert_eq!(value["error"], "timed out");
    assert!(value["timestamp"].is_string());
    // Absent optional fields are omitted rather than null.
    assert!(value.get("headers").is_none());
    assert!(value.get("assertionResults").is_none());
}

#[test]
fn test_response_without_status_code_defaults_to_zero() {
    let response: ProbeResponse = serde_json::from_str(
        r#"{"responseTimeMs":12,"isUp":false,"timestamp":"2024-05-01T10:00:00Z","error":"refused"}"#,
    )
    .unwrap();

    assert_eq!(response.status_code, 0);
    assert_eq!(response.response_time_ms, 12);
    assert_eq!(response.error.as_deref(), Some("refused"));
}
