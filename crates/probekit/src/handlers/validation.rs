//! Request validation for probe handlers.
//!
//! This module provides validation for incoming probe requests.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use url::Url;

use crate::protocol::{ProbeRequest, Protocol};

const MIN_TIMEOUT_MS: u64 = 100;
const MAX_TIMEOUT_MS: u64 = 300_000; // 5 minutes

/// Validate a probe request
pub fn validate_probe_request(request: &ProbeRequest) -> Result<()> {
    match request.protocol {
        Protocol::Http => {
            validate_url(&request.target)?;
            validate_http_method(&request.method)?;
        }
        Protocol::Tcp => {
            parse_tcp_target(&request.target)?;
        }
    }

    if let Some(timeout_ms) = request.timeout_ms {
        validate_timeout(timeout_ms)?;
    }

    validate_headers(&request.headers)?;

    if let Some(body) = &request.body {
        validate_body_size(body)?;
    }

    Ok(())
}

/// Validate URL format and scheme
fn validate_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url)?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(anyhow!("Unsupported URL scheme: {other}")),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(anyhow!("URL has no host: {url}"));
    }

    Ok(())
}

/// Validate HTTP method
fn validate_http_method(method: &str) -> Result<()> {
    match method.to_uppercase().as_str() {
        "GET" | "POST" | "PUT" | "DELETE" | "HEAD" | "OPTIONS" | "PATCH" => Ok(()),
        _ => Err(anyhow!("Unsupported HTTP method: {method}")),
    }
}

/// Split a TCP target into host and port.
///
/// Accepts `host:port` and `[v6-address]:port`.
pub fn parse_tcp_target(target: &str) -> Result<(String, u16)> {
    let (host, port) = target
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("TCP target must be in format host:port"))?;

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(anyhow!("TCP target has no host: {target}"));
    }

    let port: u16 = port.parse().map_err(|_| anyhow!("Invalid port number: {port}"))?;
    if port == 0 {
        return Err(anyhow!("Port 0 is not valid"));
    }

    Ok((host.to_string(), port))
}

/// Validate timeout value
fn validate_timeout(timeout_ms: u64) -> Result<()> {
    if timeout_ms < MIN_TIMEOUT_MS {
        return Err(anyhow!("Timeout too small: {timeout_ms} ms (min: {MIN_TIMEOUT_MS} ms)"));
    }

    if timeout_ms > MAX_TIMEOUT_MS {
        return Err(anyhow!("Timeout too large: {timeout_ms} ms (max: {MAX_TIMEOUT_MS} ms)"));
    }

    Ok(())
}

/// Validate headers
fn validate_headers(headers: &BTreeMap<String, String>) -> Result<()> {
    const MAX_HEADERS: usize = 20;
    const MAX_HEADER_SIZE: usize = 8192;

    if headers.len() > MAX_HEADERS {
        return Err(anyhow!("Too many headers: {} (max: {})", headers.len(), MAX_HEADERS));
    }

    for (key, value) in headers {
        if key.len() + value.len() > MAX_HEADER_SIZE {
            return Err(anyhow!(
                "Header too large: {} bytes (max: {} bytes)",
                key.len() + value.len(),
                MAX_HEADER_SIZE
            ));
        }
    }

    Ok(())
}

/// Validate body size
fn validate_body_size(body: &str) -> Result<()> {
    const MAX_BODY_SIZE: usize = 1024 * 1024; // 1MB

    if body.len() > MAX_BODY_SIZE {
        return Err(anyhow!(
            "Body too large: {} bytes (max: {} bytes)",
            body.len(),
            MAX_BODY_SIZE
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tcp_target() {
        assert_eq!(parse_tcp_target("example.com:443").unwrap(), ("example.com".to_string(), 443));
        assert_eq!(parse_tcp_target("[::1]:8080").unwrap(), ("::1".to_string(), 8080));

        assert!(parse_tcp_target("example.com").is_err());
        assert!(parse_tcp_target("example.com:").is_err());
        assert!(parse_tcp_target(":80").is_err());
        assert!(parse_tcp_target("example.com:0").is_err());
        assert!(parse_tcp_target("example.com:70000").is_err());
    }

    #[test]
    fn test_validate_timeout_bounds() {
        assert!(validate_timeout(100).is_ok());
        assert!(validate_timeout(300_000).is_ok());
        assert!(validate_timeout(99).is_err());
        assert!(validate_timeout(300_001).is_err());
    }
}
