//! Response utilities for probe handlers.
//!
//! This module turns what a probe observed into a `ProbeResponse`,
//! applying the assertion rules and the default status verdict.

use chrono::Utc;

use crate::assertion::{Assertion, AssertionResult, Observed, evaluate_all};
use crate::error::ProbeError;
use crate::protocol::ProbeResponse;

use super::http::CapturedResponse;

/// Default verdict for HTTP responses when no assertions are configured
pub fn is_success_status(status: u16) -> bool {
    (200..400).contains(&status)
}

/// Derive the verdict: AND of all assertions, or `default_up` when there are none
pub fn verdict(
    assertions: &[Assertion],
    observed: &Observed<'_>,
    default_up: bool,
) -> (bool, Option<Vec<AssertionResult>>) {
    if assertions.is_empty() {
        return (default_up, None);
    }

    let results = evaluate_all(assertions, observed);
    let is_up = results.iter().all(|result| result.passed);
    (is_up, Some(results))
}

/// Build the response for a completed HTTP exchange
pub fn build_http_response(
    assertions: &[Assertion],
    captured: CapturedResponse,
    response_time_ms: u64,
) -> ProbeResponse {
    let observed = Observed {
        status_code: Some(captured.status),
        headers: Some(&captured.headers),
        body: captured.body.as_deref(),
        response_time_ms: Some(response_time_ms),
    };
    let (is_up, assertion_results) =
        verdict(assertions, &observed, is_success_status(captured.status));

    ProbeResponse {
        status_code: captured.status,
        response_time_ms,
        is_up,
        timestamp: Utc::now(),
        headers: Some(captured.headers),
        body: captured.body,
        error: None,
        assertion_results,
    }
}

/// Build the response for an established TCP connection
pub fn build_tcp_response(assertions: &[Assertion], response_time_ms: u64) -> ProbeResponse {
    let observed = Observed { response_time_ms: Some(response_time_ms), ..Observed::default() };
    let (is_up, assertion_results) = verdict(assertions, &observed, true);

    ProbeResponse {
        status_code: 0,
        response_time_ms,
        is_up,
        timestamp: Utc::now(),
        headers: None,
        body: None,
        error: None,
        assertion_results,
    }
}

/// Build an error probe response
pub fn build_error_response(error: &ProbeError, response_time_ms: u64) -> ProbeResponse {
    ProbeResponse::failure(error.to_string(), response_time_ms)
}

/// Build a timeout probe response
pub fn build_timeout_response(response_time_ms: u64) -> ProbeResponse {
    build_error_response(&ProbeError::Timeout, response_time_ms)
}
