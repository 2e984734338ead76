use super::{HttpHeader, NamespacedTargetRef, PolicyStatus};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, kube::CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "policy.gatewaymesh.io",
    version = "v1alpha1",
    kind = "HealthCheckPolicy",
    status = "PolicyStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckPolicySpec {
    pub target_ref: NamespacedTargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortHealthCheck>>,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "config")]
    pub default_config: Option<HealthCheckConfig>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortHealthCheck {
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<HealthCheckConfig>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckConfig {
    /// Seconds between probes.
    pub interval: i32,

    /// Consecutive failures before an endpoint is marked unhealthy.
    pub max_fails: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_timeout: Option<i32>,

    /// HTTP probe path; requires `matches`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<HealthCheckMatch>>,
}

/// A response predicate; at least one of the fields must be set.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_codes: Option<Vec<i32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<HttpHeader>>,
}
