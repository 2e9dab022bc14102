use std::collections::BTreeMap;
use std::time::Duration;
use std::{env, fmt, fs, io, path};

use probekit::{DEFAULT_BODY_CAPTURE_LIMIT, DEFAULT_USER_AGENT, ExecutorConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::monitoring::cache::FlushPolicy;

/// Longest timeout a probe request may carry
const MAX_PROBE_TIMEOUT_SECONDS: u64 = 300;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read {}: {source}", path.display())]
    ReadFailed { path: path::PathBuf, source: io::Error },
    #[error("Failed to write {}: {source}", path.display())]
    WriteFailed { path: path::PathBuf, source: io::Error },
    #[error("Failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("No config path available, set XDG_CONFIG_HOME or HOME")]
    ConfigPathUnavailable,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: Scheduler,
    pub probe: Probe,
    pub database: Database,
    pub notification: Notification,
    pub logging: Logging,
    pub validation: Validation,
    pub regions: BTreeMap<String, Region>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scheduler {
    /// Global tick cadence, the resolution floor for every check frequency
    pub tick_seconds: u64,
    /// Buffered batches per check that trigger a flush
    pub flush_threshold: usize,
    pub flush_policy: FlushPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Probe {
    pub timeout_seconds: u64,
    pub body_capture_limit: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierKind {
    #[default]
    Log,
    Webhook,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Notification {
    pub kind: NotifierKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Upper bound on one notification attempt
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    /// `compact` or `json`
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Validation {
    /// Skip checks whose target is loopback, private or link-local
    pub deny_private_targets: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    /// Probes run in this process
    #[default]
    Local,
    /// Probes are sent to a probe agent
    Remote,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Region {
    #[serde(default)]
    pub kind: RegionKind,
    /// Base URL of the probe agent, required for remote regions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self { tick_seconds: 30, flush_threshold: 10, flush_policy: FlushPolicy::default() }
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            body_capture_limit: DEFAULT_BODY_CAPTURE_LIMIT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self { path: "downwatch.db".into() }
    }
}

impl Default for Notification {
    fn default() -> Self {
        Self { kind: NotifierKind::default(), webhook_url: None, timeout_seconds: 10 }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self { level: "info".into(), format: "compact".into() }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut regions = BTreeMap::new();
        regions.insert("local".to_string(), Region::default());

        Self {
            scheduler: Scheduler::default(),
            probe: Probe::default(),
            database: Database::default(),
            notification: Notification::default(),
            logging: Logging::default(),
            validation: Validation::default(),
            regions,
        }
    }
}

impl Scheduler {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_seconds)
    }
}

impl Notification {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Probe {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            timeout: self.timeout(),
            body_capture_limit: self.body_capture_limit,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().is_none_or(|ext| ext != "toml") {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/downwatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("downwatch/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_title_2 = write_title_indented(2);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Scheduler")?;
        write_1(f, "Tick (s)", &self.scheduler.tick_seconds)?;
        write_1(f, "Flush Threshold", &self.scheduler.flush_threshold)?;
        write_1(f, "Flush Policy", &self.scheduler.flush_policy)?;

        write_title_1(f, "Probe")?;
        write_1(f, "Timeout (s)", &self.probe.timeout_seconds)?;
        write_1(f, "Body Capture Limit", &self.probe.body_capture_limit)?;
        write_1(f, "User Agent", &self.probe.user_agent)?;

        write_title_1(f, "Database")?;
        write_1(f, "Path", &self.database.path)?;

        write_title_1(f, "Notification")?;
        write_1(f, "Kind", &format!("{:?}", self.notification.kind).to_lowercase())?;
        if let Some(url) = &self.notification.webhook_url {
            write_1(f, "Webhook URL", url)?;
        }
        write_1(f, "Timeout (s)", &self.notification.timeout_seconds)?;

        write_title_1(f, "Logging")?;
        write_1(f, "Level", &self.logging.level)?;
        write_1(f, "Format", &self.logging.format)?;

        write_title_1(f, "Validation")?;
        write_1(f, "Deny Private Targets", &self.validation.deny_private_targets)?;

        write_title_1(f, "Regions")?;
        for (name, region) in &self.regions {
            write_title_2(f, name)?;
            write_2(f, "Kind", &format!("{:?}", region.kind).to_lowercase())?;
            if let Some(endpoint) = &region.endpoint {
                write_2(f, "Endpoint", endpoint)?;
            }
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/downwatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```rust,ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| Error::ReadFailed { path: config_path.clone(), source })?;
            toml::from_str(raw_string.as_str())?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| Error::WriteFailed { path: parent.to_path_buf(), source })?;
        }

        fs::write(path, config_str)
            .map_err(|source| Error::WriteFailed { path: path.to_path_buf(), source })
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        if self.scheduler.tick_seconds == 0 {
            return Err(Error::Invalid("scheduler.tick_seconds must be at least 1".into()));
        }
        if self.scheduler.flush_threshold == 0 {
            return Err(Error::Invalid("scheduler.flush_threshold must be at least 1".into()));
        }
        if self.probe.timeout_seconds == 0 {
            return Err(Error::Invalid("probe.timeout_seconds must be at least 1".into()));
        }
        // Remote regions send this as the request timeout, which agents cap
        if self.probe.timeout_seconds > MAX_PROBE_TIMEOUT_SECONDS {
            return Err(Error::Invalid(format!(
                "probe.timeout_seconds must be at most {MAX_PROBE_TIMEOUT_SECONDS}"
            )));
        }
        if self.notification.timeout_seconds == 0 {
            return Err(Error::Invalid("notification.timeout_seconds must be at least 1".into()));
        }
        if self.regions.is_empty() {
            return Err(Error::Invalid("at least one region must be configured".into()));
        }

        for (name, region) in &self.regions {
            if region.kind == RegionKind::Remote {
                let endpoint = region.endpoint.as_deref().ok_or_else(|| {
                    Error::Invalid(format!("remote region '{name}' needs an endpoint"))
                })?;
                Url::parse(endpoint).map_err(|e| {
                    Error::Invalid(format!("region '{name}' endpoint is not a URL: {e}"))
                })?;
            }
        }

        if self.notification.kind == NotifierKind::Webhook {
            let url = self.notification.webhook_url.as_deref().ok_or_else(|| {
                Error::Invalid("webhook notifier needs notification.webhook_url".into())
            })?;
            Url::parse(url)
                .map_err(|e| Error::Invalid(format!("webhook_url is not a URL: {e}")))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_missing_file_writes_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config::from_config(Some(&path)).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        // Reading it back gives the same configuration
        let reread = Config::from_config(Some(&path)).unwrap();
        assert_eq!(reread, config);
    }

    #[test]
    fn test_extension_is_normalized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings");

        Config::from_config(Some(&path)).unwrap();
        assert!(dir.path().join("settings.toml").exists());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[scheduler]
tick_seconds = 10
flush_policy = "write_then_clear"

[regions.eu-west]
kind = "remote"
endpoint = "http://10.0.0.5:8080"
"#,
        )
        .unwrap();

        let config = Config::from_config(Some(&path)).unwrap();
        assert_eq!(config.scheduler.tick_seconds, 10);
        assert_eq!(config.scheduler.flush_threshold, 10);
        assert_eq!(config.scheduler.flush_policy, FlushPolicy::WriteThenClear);
        assert_eq!(config.probe.timeout_seconds, 15);
        assert_eq!(config.regions.len(), 1);
        assert_eq!(config.regions["eu-west"].kind, RegionKind::Remote);
    }

    #[test]
    fn test_remote_region_requires_endpoint() {
        let mut config = Config::default();
        config.regions.insert("us-east".into(), Region { kind: RegionKind::Remote, endpoint: None });

        assert!(matches!(config.validate(), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_webhook_requires_url() {
        let mut config = Config::default();
        config.notification.kind = NotifierKind::Webhook;
        assert!(config.validate().is_err());

        config.notification.webhook_url = Some("https://hooks.example.com/alerts".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_notification_timeout() {
        let mut config = Config::default();
        assert_eq!(config.notification.timeout(), Duration::from_secs(10));

        config.notification.timeout_seconds = 0;
        assert!(matches!(config.validate(), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_probe_timeout_bounds() {
        let mut config = Config::default();
        config.probe.timeout_seconds = 300;
        assert!(config.validate().is_ok());

        config.probe.timeout_seconds = 301;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = Config::default();
        config.scheduler.flush_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_display_lists_regions() {
        let rendered = Config::default().to_string();
        assert!(rendered.starts_with("Current Internal Configuration State:"));
        assert!(rendered.contains("Flush Policy: clear_then_write"));
        assert!(rendered.contains("local"));
    }
}
