use super::{HttpHeader, NamespacedTargetRef, PolicyStatus};
use crate::gateway;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
pub enum RateLimitMode {
    Local,
    Global,
}

/// Rate limiting keyed by listener port (L4, bytes per second) on Gateway
/// targets, or by hostname/route match (L7, requests per window) on route
/// targets.
#[derive(Clone, Debug, kube::CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "policy.gatewaymesh.io",
    version = "v1alpha1",
    kind = "RateLimitPolicy",
    status = "PolicyStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitPolicySpec {
    pub target_ref: NamespacedTargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortRateLimit>>,

    /// Default L4 limit for ports without their own.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "bps")]
    pub default_bps: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostnames: Option<Vec<HostnameRateLimit>>,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "http")]
    pub http_rate_limits: Option<Vec<HttpRateLimit>>,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "grpc")]
    pub grpc_rate_limits: Option<Vec<GrpcRateLimit>>,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "config")]
    pub default_config: Option<L7RateLimit>,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortRateLimit {
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bps: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostnameRateLimit {
    pub hostname: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<L7RateLimit>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpRateLimit {
    #[serde(rename = "match")]
    pub route_match: gateway::HTTPRouteRulesMatches,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<L7RateLimit>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrpcRateLimit {
    #[serde(rename = "match")]
    pub route_match: gateway::GRPCRouteRulesMatches,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<L7RateLimit>,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct L7RateLimit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<RateLimitMode>,

    /// Requests allowed to queue once the limit is reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlog: Option<i32>,

    /// Requests allowed per stat time window.
    pub requests: i32,

    /// Burst allowance; never below `requests`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst: Option<i32>,

    pub stat_time_window: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status_code: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_headers_to_add: Option<Vec<HttpHeader>>,
}
