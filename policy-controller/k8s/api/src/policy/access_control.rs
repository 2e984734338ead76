use super::{NamespacedTargetRef, PolicyStatus};
use crate::gateway;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, kube::CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "policy.gatewaymesh.io",
    version = "v1alpha1",
    kind = "AccessControlPolicy",
    status = "PolicyStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlPolicySpec {
    pub target_ref: NamespacedTargetRef,

    /// Per-listener access control for Gateway targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortAccessControl>>,

    /// Per-hostname access control for route targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostnames: Option<Vec<HostnameAccessControl>>,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "http")]
    pub http_access_controls: Option<Vec<HttpAccessControl>>,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "grpc")]
    pub grpc_access_controls: Option<Vec<GrpcAccessControl>>,

    /// Applied wherever no more specific entry matches.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "config")]
    pub default_config: Option<AccessControlConfig>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortAccessControl {
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<AccessControlConfig>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostnameAccessControl {
    pub hostname: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<AccessControlConfig>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpAccessControl {
    #[serde(rename = "match")]
    pub route_match: gateway::HTTPRouteRulesMatches,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<AccessControlConfig>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrpcAccessControl {
    #[serde(rename = "match")]
    pub route_match: gateway::GRPCRouteRulesMatches,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<AccessControlConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<String>>,

    /// Whether the client address is taken from X-Forwarded-For.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "enableXFF")]
    pub enable_xff: Option<bool>,

    /// Response status when a request is denied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i32>,

    /// Response body when a request is denied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
