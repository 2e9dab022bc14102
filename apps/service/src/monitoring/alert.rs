use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use super::types::{Check, ProbeOutcome, TickBatch};
use crate::config::{Notification, NotifierKind};

/// A down alert for one check on one tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub check_id: Uuid,
    pub recipients: Vec<String>,
    pub target: String,
    pub subject: String,
    pub checked_at: DateTime<Utc>,
    /// Outcomes of the regions that reported down
    pub failing: Vec<ProbeOutcome>,
}

impl Alert {
    /// `None` when every region is up
    pub fn for_batch(check: &Check, batch: &TickBatch) -> Option<Self> {
        if !batch.any_down() {
            return None;
        }

        Some(Self {
            check_id: check.id,
            recipients: check.alert_emails.clone(),
            target: check.target.clone(),
            subject: format!("Alert: {} is down", check.target),
            checked_at: batch.checked_at,
            failing: batch.failing().cloned().collect(),
        })
    }
}

/// Outbound notification channel, send and forget
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<()>;
}

/// Writes alerts to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        let regions: Vec<&str> = alert.failing.iter().map(|o| o.region.as_str()).collect();
        warn!(
            check_id = %alert.check_id,
            target = %alert.target,
            recipients = ?alert.recipients,
            regions = ?regions,
            "{}",
            alert.subject
        );
        Ok(())
    }
}

/// Used when the trigger is not given a deadline of its own
const DEFAULT_NOTIFY_DEADLINE: Duration = Duration::from_secs(10);

/// POSTs alerts as JSON to a webhook
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Url,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, url: Url, timeout: Duration) -> Self {
        Self { client, url, timeout }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        self.client
            .post(self.url.clone())
            .timeout(self.timeout)
            .json(alert)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Build the notifier selected in the configuration
pub fn notifier_from_config(config: &Notification) -> Result<Arc<dyn Notifier>> {
    match config.kind {
        NotifierKind::Log => Ok(Arc::new(LogNotifier)),
        NotifierKind::Webhook => {
            let url = config
                .webhook_url
                .as_deref()
                .ok_or_else(|| anyhow!("webhook notifier needs a webhook_url"))?;
            Ok(Arc::new(WebhookNotifier::new(
                reqwest::Client::new(),
                Url::parse(url)?,
                config.timeout(),
            )))
        }
    }
}

/// Fires one notification per tick in which any region of a check is down
#[derive(Clone)]
pub struct AlertTrigger {
    notifier: Arc<dyn Notifier>,
    deadline: Duration,
}

impl AlertTrigger {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier, deadline: DEFAULT_NOTIFY_DEADLINE }
    }

    /// Give up on a notification attempt after `deadline`
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Returns whether an alert was sent (or attempted). A failing or stuck
    /// notifier is logged and otherwise ignored.
    pub async fn fire(&self, check: &Check, batch: &TickBatch) -> bool {
        let Some(alert) = Alert::for_batch(check, batch) else {
            return false;
        };

        info!(check_id = %check.id, failing = alert.failing.len(), "Check is down, notifying");
        match tokio::time::timeout(self.deadline, self.notifier.notify(&alert)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(check_id = %check.id, "Failed to send alert: {e:#}"),
            Err(_) => {
                error!(check_id = %check.id, deadline = ?self.deadline, "Alert notification timed out");
            }
        }
        true
    }
}
