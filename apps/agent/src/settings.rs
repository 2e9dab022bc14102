use std::env::var;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use probekit::ExecutorConfig;

use crate::error::AppError;

/// Agent settings, read from the environment (a `.env` file is honoured)
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: IpAddr,
    pub port: u16,
    /// Region label attached to every log line
    pub region: String,
    pub executor: ExecutorConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| var(name).ok())
    }

    /// Build settings from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let bind = lookup("AGENT_BIND").unwrap_or_else(|| "0.0.0.0".to_string()).parse()?;
        let port = parse_or("AGENT_PORT", lookup("AGENT_PORT"), 8080)?;
        let region = lookup("AGENT_REGION").unwrap_or_else(|| "local".to_string());

        let mut executor = ExecutorConfig::default();
        if let Some(seconds) = lookup("PROBE_TIMEOUT_SECONDS") {
            let parsed: u64 = parse_or("PROBE_TIMEOUT_SECONDS", Some(seconds.clone()), 0)?;
            if parsed == 0 {
                return Err(AppError::InvalidEnv { name: "PROBE_TIMEOUT_SECONDS", value: seconds });
            }
            executor.timeout = Duration::from_secs(parsed);
        }
        executor.body_capture_limit = parse_or(
            "PROBE_BODY_CAPTURE_LIMIT",
            lookup("PROBE_BODY_CAPTURE_LIMIT"),
            executor.body_capture_limit,
        )?;

        Ok(Self { bind, port, region, executor })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, AppError> {
    match value {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| AppError::InvalidEnv { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.addr().to_string(), "0.0.0.0:8080");
        assert_eq!(settings.region, "local");
        assert_eq!(settings.executor.timeout, probekit::DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("AGENT_BIND", "127.0.0.1"),
            ("AGENT_PORT", "9000"),
            ("AGENT_REGION", "eu-west"),
            ("PROBE_TIMEOUT_SECONDS", "5"),
            ("PROBE_BODY_CAPTURE_LIMIT", "250"),
        ]))
        .unwrap();

        assert_eq!(settings.addr().to_string(), "127.0.0.1:9000");
        assert_eq!(settings.region, "eu-west");
        assert_eq!(settings.executor.timeout, Duration::from_secs(5));
        assert_eq!(settings.executor.body_capture_limit, 250);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let error = Settings::from_lookup(lookup(&[("PROBE_TIMEOUT_SECONDS", "0")])).unwrap_err();
        assert!(matches!(error, AppError::InvalidEnv { name: "PROBE_TIMEOUT_SECONDS", .. }));
    }

    #[test]
    fn test_invalid_port() {
        let error = Settings::from_lookup(lookup(&[("AGENT_PORT", "eighty")])).unwrap_err();
        assert!(matches!(error, AppError::InvalidEnv { name: "AGENT_PORT", .. }));
    }
}
