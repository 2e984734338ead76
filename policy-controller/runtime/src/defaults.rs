//! Defaulting applied by the mutating admission webhooks. Defaulting never
//! overwrites a user-supplied value and is idempotent: re-running a
//! defaulted spec produces no further changes.

use gateway_policy_controller_k8s_api::policy::{
    AccessControlConfig, AccessControlPolicySpec, FaultInjectionConfig, FaultInjectionPolicySpec,
    GatewayTLSPolicySpec, L7RateLimit, LoadBalancerPolicySpec, LoadBalancerType,
    RateLimitMode, RateLimitPolicySpec, SessionStickyPolicySpec, UpstreamTLSPolicySpec,
};

pub(crate) fn access_control(spec: &mut AccessControlPolicySpec) {
    if let Some(config) = spec.default_config.as_mut() {
        fill_acl(config, None);
    }
    let default = spec.default_config.clone();
    for entry in spec.ports.iter_mut().flatten() {
        if let Some(config) = entry.config.as_mut() {
            fill_acl(config, default.as_ref());
        }
    }
    for entry in spec.hostnames.iter_mut().flatten() {
        if let Some(config) = entry.config.as_mut() {
            fill_acl(config, default.as_ref());
        }
    }
    for entry in spec.http_access_controls.iter_mut().flatten() {
        if let Some(config) = entry.config.as_mut() {
            fill_acl(config, default.as_ref());
        }
    }
    for entry in spec.grpc_access_controls.iter_mut().flatten() {
        if let Some(config) = entry.config.as_mut() {
            fill_acl(config, default.as_ref());
        }
    }
}

fn fill_acl(config: &mut AccessControlConfig, default: Option<&AccessControlConfig>) {
    if config.enable_xff.is_none() {
        config.enable_xff = default.and_then(|d| d.enable_xff).or(Some(false));
    }
    if config.status_code.is_none() {
        config.status_code = default.and_then(|d| d.status_code).or(Some(403));
    }
    if config.message.is_none() {
        config.message = default
            .and_then(|d| d.message.clone())
            .or_else(|| Some(String::new()));
    }
}

pub(crate) fn rate_limit(spec: &mut RateLimitPolicySpec) {
    if let Some(config) = spec.default_config.as_mut() {
        fill_l7(config, None);
    }
    let default = spec.default_config.clone();
    for entry in spec.hostnames.iter_mut().flatten() {
        if let Some(config) = entry.config.as_mut() {
            fill_l7(config, default.as_ref());
        }
    }
    for entry in spec.http_rate_limits.iter_mut().flatten() {
        if let Some(config) = entry.config.as_mut() {
            fill_l7(config, default.as_ref());
        }
    }
    for entry in spec.grpc_rate_limits.iter_mut().flatten() {
        if let Some(config) = entry.config.as_mut() {
            fill_l7(config, default.as_ref());
        }
    }
    // L4 port limits without their own rate inherit the policy-level bps.
    if let Some(bps) = spec.default_bps {
        for entry in spec.ports.iter_mut().flatten() {
            if entry.bps.is_none() {
                entry.bps = Some(bps);
            }
        }
    }
}

fn fill_l7(config: &mut L7RateLimit, default: Option<&L7RateLimit>) {
    if config.mode.is_none() {
        config.mode = default
            .and_then(|d| d.mode.clone())
            .or(Some(RateLimitMode::Local));
    }
    if config.backlog.is_none() {
        config.backlog = default.and_then(|d| d.backlog).or(Some(10));
    }
    if config.burst.is_none() {
        // Bursting defaults to the configured request budget.
        config.burst = Some(config.requests);
    }
    if config.response_status_code.is_none() {
        config.response_status_code = default.and_then(|d| d.response_status_code).or(Some(429));
    }
}

pub(crate) fn fault_injection(spec: &mut FaultInjectionPolicySpec) {
    if let Some(config) = spec.default_config.as_mut() {
        fill_fault(config);
    }
    for entry in spec.hostnames.iter_mut().flatten() {
        if let Some(config) = entry.config.as_mut() {
            fill_fault(config);
        }
    }
    for entry in spec.http_fault_injections.iter_mut().flatten() {
        if let Some(config) = entry.config.as_mut() {
            fill_fault(config);
        }
    }
    for entry in spec.grpc_fault_injections.iter_mut().flatten() {
        if let Some(config) = entry.config.as_mut() {
            fill_fault(config);
        }
    }
}

fn fill_fault(config: &mut FaultInjectionConfig) {
    if let Some(delay) = config.delay.as_mut() {
        if delay.unit.is_none() {
            delay.unit = Some("ms".to_string());
        }
    }
}

pub(crate) fn load_balancer(spec: &mut LoadBalancerPolicySpec) {
    let default = spec
        .default_type
        .clone()
        .unwrap_or(LoadBalancerType::RoundRobin);
    for entry in spec.ports.iter_mut().flatten() {
        if entry.balancer_type.is_none() {
            entry.balancer_type = Some(default.clone());
        }
    }
}

pub(crate) fn session_sticky(spec: &mut SessionStickyPolicySpec) {
    if let Some(config) = spec.default_config.as_mut() {
        if config.cookie_name.is_none() {
            config.cookie_name = Some("_srv_id".to_string());
        }
        if config.expires.is_none() {
            config.expires = Some(3600);
        }
    }
}

pub(crate) fn upstream_tls(spec: &mut UpstreamTLSPolicySpec) {
    if let Some(config) = spec.default_config.as_mut() {
        if config.m_tls.is_none() {
            config.m_tls = Some(false);
        }
    }
    let default = spec.default_config.clone();
    for entry in spec.ports.iter_mut().flatten() {
        if let Some(config) = entry.config.as_mut() {
            if config.m_tls.is_none() {
                config.m_tls = default.as_ref().and_then(|d| d.m_tls).or(Some(false));
            }
        }
    }
}

pub(crate) fn gateway_tls(spec: &mut GatewayTLSPolicySpec) {
    if let Some(config) = spec.default_config.as_mut() {
        if config.m_tls.is_none() {
            config.m_tls = Some(false);
        }
    }
    let default = spec.default_config.clone();
    for entry in spec.ports.iter_mut().flatten() {
        if let Some(config) = entry.config.as_mut() {
            if config.m_tls.is_none() {
                config.m_tls = default.as_ref().and_then(|d| d.m_tls).or(Some(false));
            }
        }
    }
}
