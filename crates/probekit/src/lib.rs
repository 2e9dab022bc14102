//! Probekit - stateless probe execution for Downwatch
//!
//! This library performs a single HTTP or TCP probe against a target,
//! evaluates the configured assertions against what was observed and
//! derives an up/down verdict. The same request/response contract is used
//! in-process by the engine and over HTTP by regional probe agents.

pub mod assertion;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod protocol;

use std::time::Duration;

// Re-export main types
pub use assertion::{
    Assertion, AssertionKind, AssertionResult, ExpectedValue, Observed, Operator, evaluate,
};
pub use error::ProbeError;
pub use executor::{ExecutorConfig, ProbeExecutor};
pub use protocol::{PROBE_PATH, ProbeRequest, ProbeResponse, Protocol};

/// The version of the probe request/response contract
pub const PROTOCOL_VERSION: &str = "1.0";

/// Hard timeout applied to a probe when the request does not carry one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum number of response body characters captured for assertions
pub const DEFAULT_BODY_CAPTURE_LIMIT: usize = 1000;

/// User agent sent with HTTP probes unless the check overrides it
pub const DEFAULT_USER_AGENT: &str = concat!("downwatch-probe/", env!("CARGO_PKG_VERSION"));
