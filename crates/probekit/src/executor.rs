use std::time::Duration;

use reqwest::redirect::Policy;
use tracing::debug;

use crate::error::ProbeError;
use crate::handlers::{build_error_response, probe_http, probe_tcp, validate_probe_request};
use crate::protocol::{ProbeRequest, ProbeResponse, Protocol};
use crate::{DEFAULT_BODY_CAPTURE_LIMIT, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

/// Executor settings shared by every probe it runs
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Hard timeout per attempt, unless the request carries its own
    pub timeout: Duration,
    /// Maximum number of body characters captured for assertions
    pub body_capture_limit: usize,
    pub user_agent: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            body_capture_limit: DEFAULT_BODY_CAPTURE_LIMIT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Runs single probe attempts.
///
/// The executor holds a pooled HTTP client (keep-alive connections are
/// reused across probes) but no state about previous probes, so it can be
/// shared freely between concurrent tasks.
#[derive(Debug, Clone)]
pub struct ProbeExecutor {
    client: reqwest::Client,
    config: ExecutorConfig,
}

impl ProbeExecutor {
    pub fn new(config: ExecutorConfig) -> Result<Self, ProbeError> {
        // Redirects are not followed: a 3xx is the observed status.
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute one probe. Never fails; every problem becomes a down verdict.
    pub async fn execute(&self, request: &ProbeRequest) -> ProbeResponse {
        if let Err(error) = validate_probe_request(request) {
            debug!(target = %request.target, %error, "rejecting invalid probe request");
            return build_error_response(&ProbeError::InvalidRequest(error.to_string()), 0);
        }

        let timeout = request.timeout_ms.map_or(self.config.timeout, Duration::from_millis);

        match request.protocol {
            Protocol::Http => {
                probe_http(&self.client, request, timeout, self.config.body_capture_limit).await
            }
            Protocol::Tcp => probe_tcp(request, timeout).await,
        }
    }
}
