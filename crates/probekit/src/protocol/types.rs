//! Protocol type definitions for Probekit.
//!
//! This module defines the data structures used in the probe contract.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assertion::{Assertion, AssertionResult};

/// Network protocol used to reach a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Tcp => write!(f, "tcp"),
        }
    }
}

fn default_method() -> String {
    "GET".to_string()
}

/// A probe request: one target, one protocol, one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeRequest {
    /// URL for HTTP probes, `host:port` for TCP probes
    pub target: String,

    /// Protocol used to reach the target
    pub protocol: Protocol,

    /// The HTTP method to use (GET, POST, etc.)
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Optional request body, sent for POST/PUT/PATCH only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Assertions evaluated against the observed response
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,

    /// Per-request timeout in milliseconds, overriding the executor default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ProbeRequest {
    /// HTTP GET probe against a URL
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            target: url.into(),
            protocol: Protocol::Http,
            method: default_method(),
            headers: BTreeMap::new(),
            body: None,
            assertions: Vec::new(),
            timeout_ms: None,
        }
    }

    /// TCP connect probe against `host:port`
    pub fn tcp(address: impl Into<String>) -> Self {
        Self { protocol: Protocol::Tcp, ..Self::http(address) }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// The outcome of one probe attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResponse {
    /// HTTP status code, 0 when no response was received (and for TCP)
    #[serde(default)]
    pub status_code: u16,

    /// Time from just before the network call to the terminal event
    pub response_time_ms: u64,

    /// Up/down verdict
    pub is_up: bool,

    /// When the terminal event fired
    pub timestamp: DateTime<Utc>,

    /// Response headers, lower-case names, multiple values joined with ", "
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,

    /// Bounded response body, captured only when assertions are configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Error message if the probe failed at the connection level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Per-assertion detail, present when the request carried assertions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_results: Option<Vec<AssertionResult>>,
}

impl ProbeResponse {
    /// A down verdict without a response
    pub fn failure(error: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            status_code: 0,
            response_time_ms,
            is_up: false,
            timestamp: Utc::now(),
            headers: None,
            body: None,
            error: Some(error.into()),
            assertion_results: None,
        }
    }
}
