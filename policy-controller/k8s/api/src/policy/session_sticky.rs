use super::{NamespacedTargetRef, PolicyStatus};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cookie-based session affinity for a whole Service or ServiceImport.
#[derive(Clone, Debug, PartialEq, kube::CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "policy.gatewaymesh.io",
    version = "v1alpha1",
    kind = "SessionStickyPolicy",
    status = "PolicyStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct SessionStickyPolicySpec {
    pub target_ref: NamespacedTargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "config")]
    pub default_config: Option<SessionStickyConfig>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStickyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_name: Option<String>,

    /// Cookie lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i32>,
}
