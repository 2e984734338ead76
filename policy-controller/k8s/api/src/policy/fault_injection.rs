use super::{NamespacedTargetRef, PolicyStatus};
use crate::gateway;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, kube::CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "policy.gatewaymesh.io",
    version = "v1alpha1",
    kind = "FaultInjectionPolicy",
    status = "PolicyStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct FaultInjectionPolicySpec {
    pub target_ref: NamespacedTargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostnames: Option<Vec<HostnameFaultInjection>>,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "http")]
    pub http_fault_injections: Option<Vec<HttpFaultInjection>>,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "grpc")]
    pub grpc_fault_injections: Option<Vec<GrpcFaultInjection>>,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "config")]
    pub default_config: Option<FaultInjectionConfig>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostnameFaultInjection {
    pub hostname: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<FaultInjectionConfig>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpFaultInjection {
    #[serde(rename = "match")]
    pub route_match: gateway::HTTPRouteRulesMatches,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<FaultInjectionConfig>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrpcFaultInjection {
    #[serde(rename = "match")]
    pub route_match: gateway::GRPCRouteRulesMatches,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<FaultInjectionConfig>,
}

/// Exactly one of `delay` and `abort` must be set.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaultInjectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<FaultInjectionDelay>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort: Option<FaultInjectionAbort>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaultInjectionDelay {
    /// Percentage of requests delayed.
    pub percent: i32,

    /// Fixed delay duration, expressed in `unit`s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<FaultInjectionRange>,

    /// Duration unit: `ms` or `s`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaultInjectionRange {
    pub min: i64,
    pub max: i64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaultInjectionAbort {
    /// Percentage of requests aborted.
    pub percent: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
