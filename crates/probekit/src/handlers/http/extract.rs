//! HTTP response extraction and handling.

use std::collections::BTreeMap;

use reqwest::header::HeaderMap;

use crate::error::ProbeError;

/// Extract all response headers.
///
/// Names are lower-case (as `http` stores them); repeated headers are
/// joined with ", " so each name maps to a single string.
pub fn extract_response_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut extracted: BTreeMap<String, String> = BTreeMap::new();

    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        extracted
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }

    extracted
}

/// Read at most `limit` characters of the response body.
///
/// Stops pulling chunks once enough bytes are buffered; the rest of the
/// body is never read.
pub async fn read_bounded_body(
    response: &mut reqwest::Response,
    limit: usize,
) -> Result<String, ProbeError> {
    let mut buffer = Vec::new();

    while buffer.len() < limit {
        match response.chunk().await.map_err(ProbeError::from_reqwest)? {
            Some(chunk) => buffer.extend_from_slice(&chunk),
            None => break,
        }
    }

    Ok(String::from_utf8_lossy(&buffer).chars().take(limit).collect())
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderValue, SET_COOKIE};

    use super::*;

    #[test]
    fn test_multi_valued_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        headers.insert("x-custom", HeaderValue::from_static("yes"));

        let extracted = extract_response_headers(&headers);
        assert_eq!(extracted.get("set-cookie").map(String::as_str), Some("a=1, b=2"));
        assert_eq!(extracted.get("x-custom").map(String::as_str), Some("yes"));
    }
}
