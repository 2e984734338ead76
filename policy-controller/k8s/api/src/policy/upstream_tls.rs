use super::{NamespacedTargetRef, PolicyStatus, SecretObjectReference};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// TLS origination towards the endpoints of a Service or ServiceImport.
#[derive(Clone, Debug, PartialEq, kube::CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "policy.gatewaymesh.io",
    version = "v1alpha1",
    kind = "UpstreamTLSPolicy",
    status = "PolicyStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamTLSPolicySpec {
    pub target_ref: NamespacedTargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortUpstreamTls>>,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "config")]
    pub default_config: Option<UpstreamTlsConfig>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortUpstreamTls {
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<UpstreamTlsConfig>,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamTlsConfig {
    /// The Secret holding `tls.crt`/`tls.key`, plus `ca.crt` when `mTLS` is
    /// enabled.
    pub certificate_ref: SecretObjectReference,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "mTLS")]
    pub m_tls: Option<bool>,
}
