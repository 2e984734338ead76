//! Format-level validation shared by the admission validators.

use anyhow::{bail, ensure, Result};
use ipnet::IpNet;
use regex::Regex;
use std::{net::IpAddr, sync::OnceLock};

fn hostname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\*\.)?([a-zA-Z0-9]([-a-zA-Z0-9]*[a-zA-Z0-9])?\.)*[a-zA-Z0-9]([-a-zA-Z0-9]*[a-zA-Z0-9])?$")
            .expect("hostname regex must parse")
    })
}

fn retry_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[1-9][0-9x]{2}$").expect("retry code regex must parse"))
}

/// Validates a single access-control list entry as an IPv4/IPv6 address or
/// CIDR block.
pub fn validate_ip_or_cidr(entry: &str) -> Result<()> {
    if entry.parse::<IpAddr>().is_ok() || entry.parse::<IpNet>().is_ok() {
        return Ok(());
    }
    bail!("{entry} is not a valid IP address or CIDR");
}

/// Validates a DNS hostname, optionally with a single leading wildcard
/// label (`*.example.com`).
pub fn validate_hostname(hostname: &str) -> Result<()> {
    ensure!(!hostname.is_empty(), "hostname must not be empty");
    ensure!(
        hostname.len() <= 253,
        "{hostname} exceeds the maximum hostname length"
    );
    ensure!(
        hostname_regex().is_match(hostname),
        "{hostname} is not a valid DNS hostname"
    );
    Ok(())
}

/// Validates a retry status code token: exactly three characters, a leading
/// digit 1-9 followed by digits or `x` wildcards (e.g. `500`, `5xx`).
pub fn validate_retry_code(code: &str) -> Result<()> {
    ensure!(
        code.len() == 3 && retry_code_regex().is_match(code),
        "{code} is not a valid status code matcher; expected e.g. 500 or 5xx"
    );
    Ok(())
}
