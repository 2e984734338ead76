use super::{NamespacedTargetRef, PolicyStatus, SecretObjectReference};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// TLS termination configuration for Gateway listeners.
#[derive(Clone, Debug, PartialEq, kube::CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "policy.gatewaymesh.io",
    version = "v1alpha1",
    kind = "GatewayTLSPolicy",
    status = "PolicyStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct GatewayTLSPolicySpec {
    pub target_ref: NamespacedTargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<PortGatewayTls>>,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "config")]
    pub default_config: Option<GatewayTlsConfig>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortGatewayTls {
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<GatewayTlsConfig>,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayTlsConfig {
    /// The Secret holding `tls.crt`/`tls.key`, plus `ca.crt` when `mTLS` is
    /// enabled.
    pub certificate_ref: SecretObjectReference,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "mTLS")]
    pub m_tls: Option<bool>,
}
