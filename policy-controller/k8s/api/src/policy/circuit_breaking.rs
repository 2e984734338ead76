use super::{NamespacedTargetRef, PolicyStatus};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, kube::CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "policy.gatewaymesh.io",
    version = "v1alpha1",
    kind = "CircuitBreakingPolicy",
    status = "PolicyStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakingPolicySpec {
    pub target_ref: NamespacedTargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortCircuitBreaking>>,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "config")]
    pub default_config: Option<CircuitBreakingConfig>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortCircuitBreaking {
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<CircuitBreakingConfig>,
}

/// At least one of the slow-call or error thresholds must be configured for
/// the breaker to ever trip.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakingConfig {
    pub min_request_amount: i32,

    pub stat_time_window: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_time_threshold: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_amount_threshold: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_ratio_threshold: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_amount_threshold: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_ratio_threshold: Option<f32>,

    pub degraded_time_window: i32,

    pub degraded_status_code: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded_response_content: Option<String>,
}
