use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use probekit::ProbeExecutor;
use tracing::{debug, warn};

use super::checker::{LocalProber, Prober, RemoteProber};
use super::types::{Check, ProbeOutcome};
use crate::config::{Config, RegionKind};

/// Fans a check out to every region it names, one probe per region
#[derive(Clone, Default)]
pub struct RegionDispatcher {
    probers: BTreeMap<String, Arc<dyn Prober>>,
}

impl RegionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, name: impl Into<String>, prober: Arc<dyn Prober>) -> Self {
        self.probers.insert(name.into(), prober);
        self
    }

    /// Build one prober per configured region. Local regions share the
    /// executor (and so its connection pool); remote regions share one client.
    pub fn from_config(config: &Config, executor: ProbeExecutor) -> Result<Self> {
        let local: Arc<dyn Prober> = Arc::new(LocalProber::new(executor));
        let client = reqwest::Client::new();
        let mut dispatcher = Self::new();

        for (name, region) in &config.regions {
            let prober: Arc<dyn Prober> = match region.kind {
                RegionKind::Local => local.clone(),
                RegionKind::Remote => {
                    let endpoint = region.endpoint.as_deref().unwrap_or_default();
                    Arc::new(RemoteProber::new(client.clone(), endpoint, config.probe.timeout())?)
                }
            };
            dispatcher = dispatcher.with_region(name.clone(), prober);
        }

        Ok(dispatcher)
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.probers.keys().map(String::as_str)
    }

    pub fn has_region(&self, name: &str) -> bool {
        self.probers.contains_key(name)
    }

    /// Probe the check from each of its regions concurrently.
    ///
    /// Always returns exactly one outcome per listed region. A region that
    /// fails to produce a verdict gets an error outcome; the others are
    /// neither cancelled nor delayed by it.
    pub async fn dispatch_all(&self, check: &Check) -> Vec<ProbeOutcome> {
        let request = Arc::new(check.probe_request());
        let protocol = check.protocol.to_string().to_uppercase();

        let tasks = check.regions.iter().map(|region| {
            let region = region.clone();
            let prober = self.probers.get(&region).cloned();
            let request = request.clone();
            let protocol = protocol.clone();

            let handle = prober.map(|prober| {
                tokio::spawn(async move { prober.probe(&request).await })
            });

            async move {
                let Some(handle) = handle else {
                    warn!(%region, "No prober configured for region");
                    return ProbeOutcome::failed(region.clone(), format!("Unknown region: {region}"));
                };

                match handle.await {
                    Ok(Ok(response)) => ProbeOutcome::new(region, response),
                    Ok(Err(e)) => {
                        debug!(%region, "Region probe failed: {e:#}");
                        ProbeOutcome::failed(region, format!("Failed to check {protocol} endpoint: {e}"))
                    }
                    Err(join_error) => {
                        warn!(%region, "Region probe task died: {join_error}");
                        ProbeOutcome::failed(
                            region,
                            format!("Failed to check {protocol} endpoint: {join_error}"),
                        )
                    }
                }
            }
        });

        join_all(tasks).await
    }
}
