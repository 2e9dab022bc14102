//! HTTP probe request handling implementation.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::Method;
use tracing::debug;

use super::extract::{extract_response_headers, read_bounded_body};
use crate::error::ProbeError;
use crate::handlers::response::{build_error_response, build_http_response, build_timeout_response};
use crate::protocol::{ProbeRequest, ProbeResponse};

/// What came back from a completed HTTP exchange
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

/// Handle an HTTP probe: one request under a hard timeout
pub async fn probe_http(
    client: &reqwest::Client,
    request: &ProbeRequest,
    timeout: Duration,
    body_capture_limit: usize,
) -> ProbeResponse {
    debug!(method = %request.method, target = %request.target, "performing HTTP probe");

    let start = Instant::now();
    let result = tokio::time::timeout(
        timeout,
        perform_http_request(client, request, body_capture_limit),
    )
    .await;
    let elapsed = elapsed_ms(start);

    match result {
        Ok(Ok(captured)) => build_http_response(&request.assertions, captured, elapsed),
        Ok(Err(error)) => {
            debug!(target = %request.target, %error, "HTTP probe failed");
            build_error_response(&error, elapsed)
        }
        Err(_) => {
            debug!(target = %request.target, ?timeout, "HTTP probe timed out");
            build_timeout_response(elapsed)
        }
    }
}

/// Perform the actual HTTP request
///
/// The body is only read when the request carries assertions, and then
/// only up to `body_capture_limit` characters.
pub async fn perform_http_request(
    client: &reqwest::Client,
    request: &ProbeRequest,
    body_capture_limit: usize,
) -> Result<CapturedResponse, ProbeError> {
    let method = Method::from_bytes(request.method.to_uppercase().as_bytes())
        .map_err(|_| ProbeError::UnsupportedMethod(request.method.clone()))?;

    let mut http_request = client.request(method.clone(), &request.target);

    for (key, value) in &request.headers {
        http_request = http_request.header(key, value);
    }

    if let Some(body) = &request.body {
        if sends_body(&method) {
            http_request = http_request.body(body.clone());
        }
    }

    let mut response = http_request.send().await.map_err(ProbeError::from_reqwest)?;

    let status = response.status().as_u16();
    let headers = extract_response_headers(response.headers());
    let body = if request.assertions.is_empty() {
        None
    } else {
        Some(read_bounded_body(&mut response, body_capture_limit).await?)
    };

    Ok(CapturedResponse { status, headers, body })
}

fn sends_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
