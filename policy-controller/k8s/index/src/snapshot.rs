//! Uniform cached representations of attachments, targets, and secrets.
//!
//! Every policy kind is reduced to the same shape before indexing: a target
//! reference, a default-config flag, and a list of scope selectors. The
//! per-kind knowledge lives in the `PolicyResource` impls; everything
//! downstream is kind-agnostic.

use crate::resource_id::ResourceId;
use chrono::{DateTime, Utc};
use gateway_policy_controller_core::PolicyKind;
use gateway_policy_controller_k8s_api::{
    self as k8s, gateway,
    multicluster::ServiceImport,
    policy::{self, NamespacedTargetRef, SecretObjectReference},
    Condition, ResourceExt,
};

/// Renders a route match as its canonical scope key: the JSON encoding with
/// object keys sorted. Structurally equal matches map to the same key
/// regardless of manifest field order.
pub fn canonical_match_key<M: serde::Serialize>(route_match: &M) -> String {
    serde_json::to_value(route_match)
        .map(|value| value.to_string())
        .unwrap_or_default()
}

/// A Secret a TLS policy depends on, and whether client-certificate
/// validation material (`ca.crt`) must be present as well.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateRef {
    pub secret: SecretObjectReference,
    pub requires_client_ca: bool,
}

/// One concrete scope selector carried by an attachment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Selector {
    Port { port: u16, has_config: bool },
    Hostname { hostname: String, has_config: bool },
    HttpRouteMatch { key: String, has_config: bool },
    GrpcRouteMatch { key: String, has_config: bool },
    ServicePort { port: u16, has_config: bool },
}

impl Selector {
    pub fn has_config(&self) -> bool {
        match *self {
            Selector::Port { has_config, .. }
            | Selector::Hostname { has_config, .. }
            | Selector::HttpRouteMatch { has_config, .. }
            | Selector::GrpcRouteMatch { has_config, .. }
            | Selector::ServicePort { has_config, .. } => has_config,
        }
    }
}

/// The kind-independent form of one attachment resource.
#[derive(Clone, Debug)]
pub struct AttachmentSnapshot {
    pub kind: PolicyKind,
    pub id: ResourceId,
    pub created_at: DateTime<Utc>,
    pub generation: i64,
    pub target_ref: NamespacedTargetRef,
    pub has_default: bool,
    pub selectors: Vec<Selector>,
    pub certificate_refs: Vec<CertificateRef>,
    /// The `Accepted` condition currently recorded on the resource, used to
    /// preserve transition times across rewrites.
    pub accepted_condition: Option<Condition>,
}

/// Per-kind extraction of the pieces the index cares about.
pub trait PolicyResource: kube::Resource<DynamicType = ()> {
    const KIND: PolicyKind;

    fn target_ref(&self) -> &NamespacedTargetRef;
    fn has_default(&self) -> bool;
    fn selectors(&self) -> Vec<Selector>;
    fn conditions(&self) -> &[Condition];

    fn certificate_refs(&self) -> Vec<CertificateRef> {
        Vec::new()
    }
}

/// Builds the uniform snapshot for any policy resource.
pub fn snapshot<P: PolicyResource>(resource: &P) -> AttachmentSnapshot {
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_unchecked();
    AttachmentSnapshot {
        kind: P::KIND,
        id: ResourceId::new(namespace, name),
        created_at: resource
            .meta()
            .creation_timestamp
            .as_ref()
            .map(|k8s::Time(t)| *t)
            .unwrap_or(DateTime::<Utc>::MIN_UTC),
        generation: resource.meta().generation.unwrap_or_default(),
        target_ref: resource.target_ref().clone(),
        has_default: resource.has_default(),
        selectors: resource.selectors(),
        certificate_refs: resource.certificate_refs(),
        accepted_condition: resource
            .conditions()
            .iter()
            .find(|c| c.type_ == "Accepted")
            .cloned(),
    }
}

fn status_conditions(status: Option<&policy::PolicyStatus>) -> &[Condition] {
    status.map(|s| &*s.conditions).unwrap_or(&[])
}

// === per-kind impls ===

impl PolicyResource for policy::AccessControlPolicy {
    const KIND: PolicyKind = PolicyKind::AccessControl;

    fn target_ref(&self) -> &NamespacedTargetRef {
        &self.spec.target_ref
    }

    fn has_default(&self) -> bool {
        self.spec.default_config.is_some()
    }

    fn selectors(&self) -> Vec<Selector> {
        let mut selectors = Vec::new();
        for p in self.spec.ports.iter().flatten() {
            selectors.push(Selector::Port {
                port: p.port,
                has_config: p.config.is_some(),
            });
        }
        for h in self.spec.hostnames.iter().flatten() {
            selectors.push(Selector::Hostname {
                hostname: h.hostname.clone(),
                has_config: h.config.is_some(),
            });
        }
        for m in self.spec.http_access_controls.iter().flatten() {
            selectors.push(Selector::HttpRouteMatch {
                key: canonical_match_key(&m.route_match),
                has_config: m.config.is_some(),
            });
        }
        for m in self.spec.grpc_access_controls.iter().flatten() {
            selectors.push(Selector::GrpcRouteMatch {
                key: canonical_match_key(&m.route_match),
                has_config: m.config.is_some(),
            });
        }
        selectors
    }

    fn conditions(&self) -> &[Condition] {
        status_conditions(self.status.as_ref())
    }
}

impl PolicyResource for policy::RateLimitPolicy {
    const KIND: PolicyKind = PolicyKind::RateLimit;

    fn target_ref(&self) -> &NamespacedTargetRef {
        &self.spec.target_ref
    }

    fn has_default(&self) -> bool {
        // L4 and L7 rate limits carry distinct default fields.
        self.spec.default_config.is_some() || self.spec.default_bps.is_some()
    }

    fn selectors(&self) -> Vec<Selector> {
        let mut selectors = Vec::new();
        for p in self.spec.ports.iter().flatten() {
            selectors.push(Selector::Port {
                port: p.port,
                has_config: p.bps.is_some(),
            });
        }
        for h in self.spec.hostnames.iter().flatten() {
            selectors.push(Selector::Hostname {
                hostname: h.hostname.clone(),
                has_config: h.config.is_some(),
            });
        }
        for m in self.spec.http_rate_limits.iter().flatten() {
            selectors.push(Selector::HttpRouteMatch {
                key: canonical_match_key(&m.route_match),
                has_config: m.config.is_some(),
            });
        }
        for m in self.spec.grpc_rate_limits.iter().flatten() {
            selectors.push(Selector::GrpcRouteMatch {
                key: canonical_match_key(&m.route_match),
                has_config: m.config.is_some(),
            });
        }
        selectors
    }

    fn conditions(&self) -> &[Condition] {
        status_conditions(self.status.as_ref())
    }
}

impl PolicyResource for policy::FaultInjectionPolicy {
    const KIND: PolicyKind = PolicyKind::FaultInjection;

    fn target_ref(&self) -> &NamespacedTargetRef {
        &self.spec.target_ref
    }

    fn has_default(&self) -> bool {
        self.spec.default_config.is_some()
    }

    fn selectors(&self) -> Vec<Selector> {
        let mut selectors = Vec::new();
        for h in self.spec.hostnames.iter().flatten() {
            selectors.push(Selector::Hostname {
                hostname: h.hostname.clone(),
                has_config: h.config.is_some(),
            });
        }
        for m in self.spec.http_fault_injections.iter().flatten() {
            selectors.push(Selector::HttpRouteMatch {
                key: canonical_match_key(&m.route_match),
                has_config: m.config.is_some(),
            });
        }
        for m in self.spec.grpc_fault_injections.iter().flatten() {
            selectors.push(Selector::GrpcRouteMatch {
                key: canonical_match_key(&m.route_match),
                has_config: m.config.is_some(),
            });
        }
        selectors
    }

    fn conditions(&self) -> &[Condition] {
        status_conditions(self.status.as_ref())
    }
}

impl PolicyResource for policy::HealthCheckPolicy {
    const KIND: PolicyKind = PolicyKind::HealthCheck;

    fn target_ref(&self) -> &NamespacedTargetRef {
        &self.spec.target_ref
    }

    fn has_default(&self) -> bool {
        self.spec.default_config.is_some()
    }

    fn selectors(&self) -> Vec<Selector> {
        self.spec
            .ports
            .iter()
            .flatten()
            .map(|p| Selector::ServicePort {
                port: p.port,
                has_config: p.config.is_some(),
            })
            .collect()
    }

    fn conditions(&self) -> &[Condition] {
        status_conditions(self.status.as_ref())
    }
}

impl PolicyResource for policy::LoadBalancerPolicy {
    const KIND: PolicyKind = PolicyKind::LoadBalancer;

    fn target_ref(&self) -> &NamespacedTargetRef {
        &self.spec.target_ref
    }

    fn has_default(&self) -> bool {
        self.spec.default_type.is_some()
    }

    fn selectors(&self) -> Vec<Selector> {
        self.spec
            .ports
            .iter()
            .flatten()
            .map(|p| Selector::ServicePort {
                port: p.port,
                has_config: p.balancer_type.is_some(),
            })
            .collect()
    }

    fn conditions(&self) -> &[Condition] {
        status_conditions(self.status.as_ref())
    }
}

impl PolicyResource for policy::CircuitBreakingPolicy {
    const KIND: PolicyKind = PolicyKind::CircuitBreaking;

    fn target_ref(&self) -> &NamespacedTargetRef {
        &self.spec.target_ref
    }

    fn has_default(&self) -> bool {
        self.spec.default_config.is_some()
    }

    fn selectors(&self) -> Vec<Selector> {
        self.spec
            .ports
            .iter()
            .flatten()
            .map(|p| Selector::ServicePort {
                port: p.port,
                has_config: p.config.is_some(),
            })
            .collect()
    }

    fn conditions(&self) -> &[Condition] {
        status_conditions(self.status.as_ref())
    }
}

impl PolicyResource for policy::SessionStickyPolicy {
    const KIND: PolicyKind = PolicyKind::SessionSticky;

    fn target_ref(&self) -> &NamespacedTargetRef {
        &self.spec.target_ref
    }

    fn has_default(&self) -> bool {
        self.spec.default_config.is_some()
    }

    fn selectors(&self) -> Vec<Selector> {
        Vec::new()
    }

    fn conditions(&self) -> &[Condition] {
        status_conditions(self.status.as_ref())
    }
}

impl PolicyResource for policy::RetryPolicy {
    const KIND: PolicyKind = PolicyKind::Retry;

    fn target_ref(&self) -> &NamespacedTargetRef {
        &self.spec.target_ref
    }

    fn has_default(&self) -> bool {
        self.spec.default_config.is_some()
    }

    fn selectors(&self) -> Vec<Selector> {
        self.spec
            .ports
            .iter()
            .flatten()
            .map(|p| Selector::ServicePort {
                port: p.port,
                has_config: p.config.is_some(),
            })
            .collect()
    }

    fn conditions(&self) -> &[Condition] {
        status_conditions(self.status.as_ref())
    }
}

impl PolicyResource for policy::UpstreamTLSPolicy {
    const KIND: PolicyKind = PolicyKind::UpstreamTls;

    fn target_ref(&self) -> &NamespacedTargetRef {
        &self.spec.target_ref
    }

    fn has_default(&self) -> bool {
        self.spec.default_config.is_some()
    }

    fn selectors(&self) -> Vec<Selector> {
        self.spec
            .ports
            .iter()
            .flatten()
            .map(|p| Selector::ServicePort {
                port: p.port,
                has_config: p.config.is_some(),
            })
            .collect()
    }

    fn conditions(&self) -> &[Condition] {
        status_conditions(self.status.as_ref())
    }

    fn certificate_refs(&self) -> Vec<CertificateRef> {
        self.spec
            .default_config
            .iter()
            .map(|c| CertificateRef {
                secret: c.certificate_ref.clone(),
                requires_client_ca: c.m_tls == Some(true),
            })
            .chain(
                self.spec
                    .ports
                    .iter()
                    .flatten()
                    .filter_map(|p| p.config.as_ref())
                    .map(|c| CertificateRef {
                        secret: c.certificate_ref.clone(),
                        requires_client_ca: c.m_tls == Some(true),
                    }),
            )
            .collect()
    }
}

impl PolicyResource for policy::GatewayTLSPolicy {
    const KIND: PolicyKind = PolicyKind::GatewayTls;

    fn target_ref(&self) -> &NamespacedTargetRef {
        &self.spec.target_ref
    }

    fn has_default(&self) -> bool {
        self.spec.default_config.is_some()
    }

    fn selectors(&self) -> Vec<Selector> {
        self.spec
            .ports
            .iter()
            .flatten()
            .map(|p| Selector::Port {
                port: p.port,
                has_config: p.config.is_some(),
            })
            .collect()
    }

    fn conditions(&self) -> &[Condition] {
        status_conditions(self.status.as_ref())
    }

    fn certificate_refs(&self) -> Vec<CertificateRef> {
        self.spec
            .default_config
            .iter()
            .map(|c| CertificateRef {
                secret: c.certificate_ref.clone(),
                requires_client_ca: c.m_tls == Some(true),
            })
            .chain(
                self.spec
                    .ports
                    .iter()
                    .flatten()
                    .filter_map(|p| p.config.as_ref())
                    .map(|c| CertificateRef {
                        secret: c.certificate_ref.clone(),
                        requires_client_ca: c.m_tls == Some(true),
                    }),
            )
            .collect()
    }
}

// === targets ===

/// The declared sub-scopes of a target object.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TargetSnapshot {
    pub ports: Vec<u16>,
    pub hostnames: Vec<String>,
    pub http_matches: Vec<String>,
    pub grpc_matches: Vec<String>,
}

impl TargetSnapshot {
    pub fn from_gateway(gateway: &gateway::Gateway) -> Self {
        Self {
            ports: gateway
                .spec
                .listeners
                .iter()
                .filter_map(|l| u16::try_from(l.port).ok())
                .collect(),
            ..Default::default()
        }
    }

    pub fn from_service(service: &k8s::Service) -> Self {
        Self {
            ports: service
                .spec
                .iter()
                .flat_map(|spec| spec.ports.iter().flatten())
                .filter_map(|p| u16::try_from(p.port).ok())
                .collect(),
            ..Default::default()
        }
    }

    pub fn from_service_import(import: &ServiceImport) -> Self {
        Self {
            ports: import
                .spec
                .ports
                .iter()
                .filter_map(|p| u16::try_from(p.port).ok())
                .collect(),
            ..Default::default()
        }
    }

    pub fn from_http_route(route: &gateway::HTTPRoute) -> Self {
        Self {
            hostnames: route.spec.hostnames.clone().unwrap_or_default(),
            http_matches: route
                .spec
                .rules
                .iter()
                .flatten()
                .flat_map(|rule| rule.matches.iter().flatten())
                .map(canonical_match_key)
                .collect(),
            ..Default::default()
        }
    }

    pub fn from_grpc_route(route: &gateway::GRPCRoute) -> Self {
        Self {
            hostnames: route.spec.hostnames.clone().unwrap_or_default(),
            grpc_matches: route
                .spec
                .rules
                .iter()
                .flatten()
                .flat_map(|rule| rule.matches.iter().flatten())
                .map(canonical_match_key)
                .collect(),
            ..Default::default()
        }
    }
}

// === secrets ===

/// The data keys of a Secret that hold non-empty values.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SecretSnapshot {
    keys: Vec<String>,
}

impl SecretSnapshot {
    pub fn has_key(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

impl From<&k8s::Secret> for SecretSnapshot {
    fn from(secret: &k8s::Secret) -> Self {
        let mut keys: Vec<String> = secret
            .data
            .iter()
            .flatten()
            .filter(|(_, v)| !v.0.is_empty())
            .map(|(k, _)| k.clone())
            .collect();
        keys.extend(
            secret
                .string_data
                .iter()
                .flatten()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, _)| k.clone()),
        );
        keys.sort();
        keys.dedup();
        Self { keys }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_policy_controller_k8s_api::ObjectMeta;

    #[test]
    fn canonical_match_key_is_field_order_independent() {
        let a = serde_json::json!({"path": {"type": "Exact", "value": "/v1"}, "method": "GET"});
        let b = serde_json::json!({"method": "GET", "path": {"value": "/v1", "type": "Exact"}});
        assert_eq!(canonical_match_key(&a), canonical_match_key(&b));

        let c = serde_json::json!({"path": {"type": "Exact", "value": "/v2"}});
        assert_ne!(canonical_match_key(&a), canonical_match_key(&c));
    }

    #[test]
    fn snapshot_captures_metadata_and_selectors() {
        let policy = policy::AccessControlPolicy {
            metadata: ObjectMeta {
                namespace: Some("default".to_string()),
                name: Some("acl".to_string()),
                generation: Some(4),
                ..Default::default()
            },
            spec: policy::AccessControlPolicySpec {
                target_ref: policy::NamespacedTargetRef {
                    group: Some("gateway.networking.k8s.io".to_string()),
                    kind: "Gateway".to_string(),
                    name: "gw".to_string(),
                    namespace: None,
                },
                ports: Some(vec![policy::PortAccessControl {
                    port: 80,
                    config: None,
                }]),
                hostnames: None,
                http_access_controls: None,
                grpc_access_controls: None,
                default_config: Some(Default::default()),
            },
            status: None,
        };

        let snap = snapshot(&policy);
        assert_eq!(snap.kind, PolicyKind::AccessControl);
        assert_eq!(snap.id, ResourceId::new("default".into(), "acl".into()));
        assert_eq!(snap.generation, 4);
        assert!(snap.has_default);
        assert_eq!(
            snap.selectors,
            vec![Selector::Port {
                port: 80,
                has_config: false
            }]
        );
        assert!(snap.certificate_refs.is_empty());
    }

    #[test]
    fn secret_snapshot_ignores_empty_values() {
        let secret = k8s::Secret {
            metadata: ObjectMeta::default(),
            data: Some(
                [
                    (
                        "tls.crt".to_string(),
                        k8s_openapi::ByteString(b"cert".to_vec()),
                    ),
                    ("tls.key".to_string(), k8s_openapi::ByteString(Vec::new())),
                ]
                .into_iter()
                .collect(),
            ),
            ..Default::default()
        };

        let snap = SecretSnapshot::from(&secret);
        assert!(snap.has_key("tls.crt"));
        assert!(!snap.has_key("tls.key"));
        assert!(!snap.has_key("ca.crt"));
    }
}
