use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use probekit::{Assertion, ProbeRequest, ProbeResponse, Protocol};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::CheckLogRow;

fn default_method() -> String {
    "GET".to_string()
}

fn default_frequency() -> u64 {
    60
}

fn default_enabled() -> bool {
    true
}

/// A user-defined check, as read from the check store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub id: Uuid,

    #[serde(default)]
    pub name: String,

    /// URL for HTTP checks, `host:port` for TCP checks
    pub target: String,

    pub protocol: Protocol,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub assertions: Vec<Assertion>,

    /// Regions the check is probed from on every due tick
    pub regions: Vec<String>,

    /// Recipients of down alerts
    #[serde(default)]
    pub alert_emails: Vec<String>,

    #[serde(default = "default_frequency")]
    pub frequency_seconds: u64,

    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Check {
    pub fn frequency(&self) -> Duration {
        Duration::from_secs(self.frequency_seconds)
    }

    /// Name for log lines, falling back to the target
    pub fn label(&self) -> &str {
        if self.name.is_empty() { &self.target } else { &self.name }
    }

    /// The probe every region runs for this check
    pub fn probe_request(&self) -> ProbeRequest {
        ProbeRequest {
            target: self.target.clone(),
            protocol: self.protocol,
            method: self.method.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            assertions: self.assertions.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}

/// One region's answer for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    pub region: String,
    #[serde(flatten)]
    pub response: ProbeResponse,
}

impl ProbeOutcome {
    pub fn new(region: impl Into<String>, response: ProbeResponse) -> Self {
        Self { region: region.into(), response }
    }

    /// Error-bearing outcome for a region that could not produce a verdict
    pub fn failed(region: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(region, ProbeResponse::failure(error, 0))
    }

    pub fn is_up(&self) -> bool {
        self.response.is_up
    }
}

/// Every region's outcome for one check on one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickBatch {
    pub checked_at: DateTime<Utc>,
    pub outcomes: Vec<ProbeOutcome>,
}

impl TickBatch {
    pub fn new(checked_at: DateTime<Utc>, outcomes: Vec<ProbeOutcome>) -> Self {
        Self { checked_at, outcomes }
    }

    pub fn any_down(&self) -> bool {
        self.outcomes.iter().any(|outcome| !outcome.is_up())
    }

    pub fn failing(&self) -> impl Iterator<Item = &ProbeOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_up())
    }

    /// Flatten into one log row per region
    pub fn to_rows(&self, check_id: Uuid) -> impl Iterator<Item = CheckLogRow> + '_ {
        self.outcomes.iter().map(move |outcome| CheckLogRow {
            id: None,
            check_id,
            region: outcome.region.clone(),
            is_up: outcome.response.is_up,
            status_code: outcome.response.status_code,
            response_time_ms: outcome.response.response_time_ms,
            error: outcome.response.error.clone(),
            checked_at: self.checked_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use probekit::Operator;

    use super::*;

    #[test]
    fn test_check_json_defaults() {
        let check: Check = serde_json::from_str(
            r#"{
                "id": "6f1c2a8e-4d2b-4c8f-9a3e-1b2c3d4e5f60",
                "target": "https://example.com/health",
                "protocol": "http",
                "regions": ["us-east", "eu-west"],
                "assertions": [{"type": "status", "condition": "equals", "value": 200}]
            }"#,
        )
        .unwrap();

        assert_eq!(check.method, "GET");
        assert_eq!(check.frequency_seconds, 60);
        assert!(check.enabled);
        assert_eq!(check.label(), "https://example.com/health");

        let request = check.probe_request();
        assert_eq!(request.protocol, Protocol::Http);
        assert_eq!(request.assertions[0].operator, Operator::Equals);
    }

    #[test]
    fn test_outcome_flattens_response() {
        let outcome = ProbeOutcome::failed("ap-south", "connection refused");
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["region"], "ap-south");
        assert_eq!(value["isUp"], false);
        assert_eq!(value["statusCode"], 0);
        assert_eq!(value["error"], "connection refused");
    }

    #[test]
    fn test_batch_rows_use_tick_time() {
        let checked_at = Utc::now();
        let check_id = Uuid::new_v4();
        let mut up = ProbeResponse::failure("unused", 42);
        up.is_up = true;
        up.status_code = 200;
        up.error = None;

        let batch = TickBatch::new(
            checked_at,
            vec![ProbeOutcome::new("us-east", up), ProbeOutcome::failed("eu-west", "timed out")],
        );

        assert!(batch.any_down());
        assert_eq!(batch.failing().count(), 1);

        let rows: Vec<_> = batch.to_rows(check_id).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.checked_at == checked_at && row.check_id == check_id));
        assert_eq!(rows[0].status_code, 200);
        assert_eq!(rows[1].error.as_deref(), Some("timed out"));
    }
}
