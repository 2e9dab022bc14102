use std::time::Duration;

use anyhow::{Context, Result};
use probekit::{PROBE_PATH, ProbeExecutor, ProbeRequest, ProbeResponse};
use url::Url;

/// Extra time allowed for an agent round trip on top of the probe timeout
const REMOTE_GRACE: Duration = Duration::from_secs(5);

/// Something that can run a probe from one region.
///
/// An `Err` means no verdict could be obtained at all (the agent was
/// unreachable, answered garbage, the task died). Down targets are an
/// `Ok` response with `is_up == false`.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, request: &ProbeRequest) -> Result<ProbeResponse>;
}

/// Runs probes in this process
pub struct LocalProber {
    executor: ProbeExecutor,
}

impl LocalProber {
    pub fn new(executor: ProbeExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait::async_trait]
impl Prober for LocalProber {
    async fn probe(&self, request: &ProbeRequest) -> Result<ProbeResponse> {
        Ok(self.executor.execute(request).await)
    }
}

/// Sends probes to a regional probe agent over HTTP
pub struct RemoteProber {
    client: reqwest::Client,
    endpoint: Url,
    default_timeout: Duration,
}

impl RemoteProber {
    /// `base` is the agent's base URL; `default_timeout` is the probe timeout
    /// the agent applies when the request carries none
    pub fn new(client: reqwest::Client, base: &str, default_timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(base)
            .and_then(|url| url.join(PROBE_PATH))
            .with_context(|| format!("Invalid agent endpoint: {base}"))?;

        Ok(Self { client, endpoint, default_timeout })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl Prober for RemoteProber {
    async fn probe(&self, request: &ProbeRequest) -> Result<ProbeResponse> {
        let probe_timeout = request.timeout_ms.map_or(self.default_timeout, Duration::from_millis);

        // Sent explicitly so the agent applies the same limit
        let mut request = request.clone();
        request.timeout_ms = Some(u64::try_from(probe_timeout.as_millis()).unwrap_or(u64::MAX));

        let response = self
            .client
            .post(self.endpoint.clone())
            .timeout(probe_timeout + REMOTE_GRACE)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<ProbeResponse>()
            .await?;

        Ok(response)
    }
}
