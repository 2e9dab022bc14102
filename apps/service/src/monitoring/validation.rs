//! Check validation applied when the store is scanned.
//!
//! A check that fails here is skipped for the tick with a warning; the rest
//! of the scan carries on.

use std::net::IpAddr;

use anyhow::{Result, anyhow};
use probekit::handlers::validation::parse_tcp_target;
use probekit::handlers::validate_probe_request;
use probekit::{AssertionKind, Protocol};
use url::Url;

use super::types::Check;

const MIN_INTERVAL: u64 = 10; // 10 seconds
const MAX_INTERVAL: u64 = 86400; // 24 hours

/// Validate a check before it is scheduled
pub fn validate_check(check: &Check, deny_private_targets: bool) -> Result<()> {
    validate_probe_request(&check.probe_request())?;
    validate_check_interval(check.frequency_seconds)?;

    if check.regions.is_empty() {
        return Err(anyhow!("Check has no regions"));
    }

    if let Some(assertion) = check
        .assertions
        .iter()
        .find(|a| a.kind == AssertionKind::Header && a.property.as_deref().is_none_or(str::is_empty))
    {
        return Err(anyhow!("Header assertion on '{}' is missing a property", assertion.value.as_text()));
    }

    if deny_private_targets {
        let host = target_host(check)?;
        if is_private_or_local(&host) {
            return Err(anyhow!("Private/local addresses are not allowed: {host}"));
        }
    }

    Ok(())
}

fn target_host(check: &Check) -> Result<String> {
    match check.protocol {
        Protocol::Http => {
            let url = Url::parse(&check.target).map_err(|e| anyhow!("Invalid URL: {e}"))?;
            url.host_str()
                .map(|host| host.trim_start_matches('[').trim_end_matches(']').to_string())
                .ok_or_else(|| anyhow!("URL has no host"))
        }
        Protocol::Tcp => Ok(parse_tcp_target(&check.target)?.0),
    }
}

/// Check if hostname/IP is private or localhost
fn is_private_or_local(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        match ip {
            IpAddr::V4(ipv4) => {
                ipv4.is_private()
                    || ipv4.is_loopback()
                    || ipv4.is_link_local()
                    || ipv4.is_broadcast()
                    || ipv4.is_unspecified()
            }
            IpAddr::V6(ipv6) => {
                ipv6.is_loopback() || ipv6.is_unspecified() || ipv6.is_unique_local()
            }
        }
    } else {
        let host = host.to_ascii_lowercase();
        host.ends_with(".localhost") || host.ends_with(".local") || host.ends_with(".internal")
    }
}

/// Validate check interval
pub fn validate_check_interval(interval_seconds: u64) -> Result<()> {
    if interval_seconds < MIN_INTERVAL {
        return Err(anyhow!(
            "Check interval too short: {} seconds (minimum: {})",
            interval_seconds,
            MIN_INTERVAL
        ));
    }

    if interval_seconds > MAX_INTERVAL {
        return Err(anyhow!(
            "Check interval too long: {} seconds (maximum: {})",
            interval_seconds,
            MAX_INTERVAL
        ));
    }

    Ok(())
}
