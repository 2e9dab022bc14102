//! HTTP probe handling.
//!
//! This module performs HTTP probes and captures their responses.

mod extract;
mod request;

pub use extract::{extract_response_headers, read_bounded_body};
pub use request::{CapturedResponse, perform_http_request, probe_http};
pub(crate) use request::elapsed_ms;
