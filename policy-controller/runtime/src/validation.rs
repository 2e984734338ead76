//! Semantic validation shared by the admission validators. Each helper
//! reports the offending field path in its error so rejections point the
//! user at the exact entry.

use anyhow::{bail, ensure, Result};
use gateway_policy_controller_core::validators;
use gateway_policy_controller_k8s_api::policy::{
    AccessControlConfig, CircuitBreakingConfig, FaultInjectionConfig, HealthCheckConfig,
    L7RateLimit, RetryConfig,
};
use gateway_policy_controller_k8s_index::SecretSnapshot;

/// Service-scoped kinds accept at most this many port entries.
pub(crate) const MAX_PORT_ENTRIES: usize = 16;

/// Access control lists accept at most this many entries apiece.
pub(crate) const MAX_ACL_ENTRIES: usize = 32;

pub(crate) fn validate_port_entries<T>(path: &str, ports: Option<&Vec<T>>) -> Result<()> {
    let count = ports.map(|p| p.len()).unwrap_or(0);
    ensure!(count > 0, "{path} cannot be empty");
    ensure!(
        count <= MAX_PORT_ENTRIES,
        "{path} cannot have more than {MAX_PORT_ENTRIES} entries",
    );
    Ok(())
}

/// Every override entry without its own config needs a policy-level default
/// to fall back to.
pub(crate) fn validate_completeness(
    path: &str,
    has_default: bool,
    entries: impl IntoIterator<Item = bool>,
) -> Result<()> {
    if has_default {
        return Ok(());
    }
    for (i, has_config) in entries.into_iter().enumerate() {
        ensure!(
            has_config,
            "{path}[{i}].config must be set, as there is no default config",
        );
    }
    Ok(())
}

pub(crate) fn validate_hostname(path: &str, hostname: &str) -> Result<()> {
    validators::validate_hostname(hostname).map_err(|error| anyhow::anyhow!("{path}: {error}"))
}

pub(crate) fn validate_acl_config(path: &str, config: &AccessControlConfig) -> Result<()> {
    for (field, list) in [
        ("blacklist", config.blacklist.as_deref()),
        ("whitelist", config.whitelist.as_deref()),
    ] {
        let entries = list.unwrap_or_default();
        ensure!(
            entries.len() <= MAX_ACL_ENTRIES,
            "{path}.{field} cannot have more than {MAX_ACL_ENTRIES} entries",
        );
        for entry in entries {
            validators::validate_ip_or_cidr(entry)
                .map_err(|error| anyhow::anyhow!("{path}.{field}: {error}"))?;
        }
    }
    if let Some(code) = config.status_code {
        ensure!(
            (1..=10000).contains(&code),
            "{path}.statusCode must be within 1-10000",
        );
    }
    Ok(())
}

pub(crate) fn validate_l7_rate_limit(path: &str, config: &L7RateLimit) -> Result<()> {
    ensure!(config.requests > 0, "{path}.requests must be greater than 0");
    ensure!(
        config.stat_time_window > 0,
        "{path}.statTimeWindow must be greater than 0",
    );
    if let Some(burst) = config.burst {
        ensure!(
            burst >= config.requests,
            "{path}.burst must be greater than or equal to requests",
        );
    }
    if let Some(backlog) = config.backlog {
        ensure!(backlog > 0, "{path}.backlog must be greater than 0");
    }
    Ok(())
}

pub(crate) fn validate_fault_injection(path: &str, config: &FaultInjectionConfig) -> Result<()> {
    match (&config.delay, &config.abort) {
        (None, None) => bail!("{path} must set one of delay, abort"),
        (Some(_), Some(_)) => bail!("{path} cannot set both delay and abort"),
        (Some(delay), None) => {
            ensure!(
                (0..=100).contains(&delay.percent),
                "{path}.delay.percent must be within 0-100",
            );
            ensure!(
                delay.fixed.is_some() || delay.range.is_some(),
                "{path}.delay must set one of fixed, range",
            );
            if let Some(range) = &delay.range {
                ensure!(
                    range.min < range.max,
                    "{path}.delay.range.min must be less than max",
                );
            }
        }
        (None, Some(abort)) => {
            ensure!(
                (0..=100).contains(&abort.percent),
                "{path}.abort.percent must be within 0-100",
            );
        }
    }
    Ok(())
}

pub(crate) fn validate_health_check(path: &str, config: &HealthCheckConfig) -> Result<()> {
    ensure!(config.interval > 0, "{path}.interval must be greater than 0");
    ensure!(config.max_fails > 0, "{path}.maxFails must be greater than 0");

    let matches = config.matches.as_deref().unwrap_or_default();
    if config.path.is_some() {
        ensure!(
            !matches.is_empty(),
            "{path}.matches cannot be empty when path is set",
        );
    } else {
        ensure!(
            matches.is_empty(),
            "{path}.path must be set when matches are present",
        );
    }
    for (i, m) in matches.iter().enumerate() {
        let has_any = m.status_codes.as_deref().map(|s| !s.is_empty()).unwrap_or(false)
            || m.body.is_some()
            || m.headers.as_deref().map(|h| !h.is_empty()).unwrap_or(false);
        ensure!(
            has_any,
            "{path}.matches[{i}] must set at least one of statusCodes, body, headers",
        );
    }
    Ok(())
}

pub(crate) fn validate_circuit_breaking(path: &str, config: &CircuitBreakingConfig) -> Result<()> {
    ensure!(
        config.min_request_amount > 0,
        "{path}.minRequestAmount must be greater than 0",
    );
    ensure!(
        config.stat_time_window > 0,
        "{path}.statTimeWindow must be greater than 0",
    );
    let has_threshold = config.slow_amount_threshold.is_some()
        || config.slow_ratio_threshold.is_some()
        || config.error_amount_threshold.is_some()
        || config.error_ratio_threshold.is_some();
    ensure!(
        has_threshold,
        "{path} must set at least one slow or error threshold",
    );
    if config.slow_amount_threshold.is_some() || config.slow_ratio_threshold.is_some() {
        ensure!(
            config.slow_time_threshold.is_some(),
            "{path}.slowTimeThreshold must be set when slow thresholds are used",
        );
    }
    Ok(())
}

pub(crate) fn validate_retry(path: &str, config: &RetryConfig) -> Result<()> {
    let codes = config.retry_on.as_deref().unwrap_or_default();
    ensure!(!codes.is_empty(), "{path}.retryOn cannot be empty");
    for code in codes {
        validators::validate_retry_code(code)
            .map_err(|error| anyhow::anyhow!("{path}.retryOn: {error}"))?;
    }
    if let Some(retries) = config.num_retries {
        ensure!(retries > 0, "{path}.numRetries must be greater than 0");
    }
    if let Some(interval) = config.backoff_base_interval {
        ensure!(
            interval > 0.0,
            "{path}.backoffBaseInterval must be greater than 0",
        );
    }
    Ok(())
}

/// Checks that a fetched certificate Secret carries the keys TLS policies
/// require: `tls.crt` and `tls.key`, plus `ca.crt` when client certificates
/// are validated.
pub(crate) fn validate_certificate_secret(
    path: &str,
    secret_name: &str,
    secret: Option<&SecretSnapshot>,
    requires_client_ca: bool,
) -> Result<()> {
    let Some(secret) = secret else {
        bail!("{path}: secret {secret_name} not found");
    };
    let mut required = vec!["tls.crt", "tls.key"];
    if requires_client_ca {
        required.push("ca.crt");
    }
    for key in required {
        ensure!(
            secret.has_key(key),
            "{path}: secret {secret_name} must contain a non-empty {key}",
        );
    }
    Ok(())
}
