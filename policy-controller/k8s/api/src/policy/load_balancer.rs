use super::{NamespacedTargetRef, PolicyStatus};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
pub enum LoadBalancerType {
    RoundRobin,
    Hashing,
    LeastLoad,
}

#[derive(Clone, Debug, PartialEq, kube::CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "policy.gatewaymesh.io",
    version = "v1alpha1",
    kind = "LoadBalancerPolicy",
    status = "PolicyStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerPolicySpec {
    pub target_ref: NamespacedTargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortLoadBalancer>>,

    /// Balancer for ports without their own `type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_type: Option<LoadBalancerType>,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortLoadBalancer {
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub balancer_type: Option<LoadBalancerType>,
}
