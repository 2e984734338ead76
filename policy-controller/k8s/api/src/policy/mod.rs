mod access_control;
mod circuit_breaking;
mod fault_injection;
mod gateway_tls;
mod health_check;
mod load_balancer;
mod rate_limit;
mod retry;
mod session_sticky;
mod target_ref;
mod upstream_tls;

pub use self::{
    access_control::{
        AccessControlConfig, AccessControlPolicy, AccessControlPolicySpec, GrpcAccessControl,
        HostnameAccessControl, HttpAccessControl, PortAccessControl,
    },
    circuit_breaking::{
        CircuitBreakingConfig, CircuitBreakingPolicy, CircuitBreakingPolicySpec,
        PortCircuitBreaking,
    },
    fault_injection::{
        FaultInjectionAbort, FaultInjectionConfig, FaultInjectionDelay, FaultInjectionPolicy,
        FaultInjectionPolicySpec, FaultInjectionRange, GrpcFaultInjection, HostnameFaultInjection,
        HttpFaultInjection,
    },
    gateway_tls::{GatewayTlsConfig, GatewayTLSPolicy, GatewayTLSPolicySpec, PortGatewayTls},
    health_check::{
        HealthCheckConfig, HealthCheckMatch, HealthCheckPolicy, HealthCheckPolicySpec,
        PortHealthCheck,
    },
    load_balancer::{
        LoadBalancerPolicy, LoadBalancerPolicySpec, LoadBalancerType, PortLoadBalancer,
    },
    rate_limit::{
        GrpcRateLimit, HostnameRateLimit, HttpRateLimit, L7RateLimit, PortRateLimit,
        RateLimitMode, RateLimitPolicy, RateLimitPolicySpec,
    },
    retry::{PortRetry, RetryConfig, RetryPolicy, RetryPolicySpec},
    session_sticky::{SessionStickyConfig, SessionStickyPolicy, SessionStickyPolicySpec},
    target_ref::{LocalTargetRef, NamespacedTargetRef, SecretObjectReference},
    upstream_tls::{PortUpstreamTls, UpstreamTlsConfig, UpstreamTLSPolicy, UpstreamTLSPolicySpec},
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The observed state shared by every policy attachment kind: a single
/// `Accepted` condition set maintained by the status controller.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyStatus {
    #[serde(default)]
    pub conditions: Vec<crate::Condition>,
}

/// An HTTP header name/value pair carried by rate-limit and health-check
/// configurations.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct HttpHeader {
    pub name: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_control_spec_deserializes_wire_names() {
        let spec: AccessControlPolicySpec = serde_json::from_value(serde_json::json!({
            "targetRef": {
                "group": "gateway.networking.k8s.io",
                "kind": "Gateway",
                "name": "gw"
            },
            "ports": [
                {"port": 80, "config": {"blacklist": ["10.0.0.1"], "enableXFF": true}}
            ],
            "config": {"statusCode": 403, "message": ""}
        }))
        .expect("spec must deserialize");

        assert_eq!(spec.target_ref.kind, "Gateway");
        let ports = spec.ports.as_deref().expect("ports must be set");
        assert_eq!(ports[0].port, 80);
        assert_eq!(
            ports[0].config.as_ref().and_then(|c| c.enable_xff),
            Some(true)
        );
        assert_eq!(
            spec.default_config.as_ref().and_then(|c| c.status_code),
            Some(403)
        );
    }

    #[test]
    fn l7_rate_limit_deserializes_wire_names() {
        let config: L7RateLimit = serde_json::from_value(serde_json::json!({
            "mode": "Local",
            "requests": 100,
            "burst": 200,
            "statTimeWindow": 60,
            "responseStatusCode": 429
        }))
        .expect("config must deserialize");

        assert_eq!(config.mode, Some(RateLimitMode::Local));
        assert_eq!(config.requests, 100);
        assert_eq!(config.burst, Some(200));
        assert_eq!(config.stat_time_window, 60);
        assert_eq!(config.response_status_code, Some(429));
    }

    #[test]
    fn optional_fields_are_omitted_when_unset() {
        let config = SessionStickyConfig::default();
        let value = serde_json::to_value(&config).expect("config must serialize");
        assert_eq!(value, serde_json::json!({}));
    }
}
