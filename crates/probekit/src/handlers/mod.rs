//! Protocol handlers for Probekit.
//!
//! This module contains the per-protocol probe implementations and the
//! helpers that turn raw observations into probe responses.

pub mod http;
pub mod response;
pub mod tcp;
pub mod validation;

pub use http::probe_http;
pub use response::{
    build_error_response, build_http_response, build_tcp_response, build_timeout_response,
    is_success_status,
};
pub use tcp::probe_tcp;
pub use validation::validate_probe_request;
