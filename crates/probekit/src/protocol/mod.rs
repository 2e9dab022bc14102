//! Protocol module for Probekit.
//!
//! This module contains the JSON request/response contract spoken between
//! the engine and a probe executor, whether in-process or remote.

pub mod types;

pub use types::{ProbeRequest, ProbeResponse, Protocol};

/// HTTP path on which regional agents accept probe requests
pub const PROBE_PATH: &str = "/probe";
