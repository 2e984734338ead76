//! Resolution of target and secret references against the cached cluster
//! state. The resolver returns typed outcomes; mapping them onto status
//! conditions is the caller's concern.

use crate::{
    authz::AuthorizationCache,
    index::target_key_of,
    resource_id::{ResourceId, TargetKey},
    snapshot::{AttachmentSnapshot, SecretSnapshot, TargetSnapshot},
};
use ahash::AHashMap as HashMap;
use gateway_policy_controller_core::registry::KindSpec;
use gateway_policy_controller_k8s_api::{policy::SecretObjectReference, POLICY_API_GROUP};
use thiserror::Error;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ResolveError {
    #[error("{0}")]
    InvalidKind(String),

    #[error("{0}")]
    NoAccess(String),

    #[error("{0}")]
    NotFound(String),
}

/// Resolves an attachment's target reference: kind allowed by the registry,
/// cross-namespace access authorized, object present in the cache.
pub fn resolve_target<'t>(
    attachment: &AttachmentSnapshot,
    spec: &'static KindSpec,
    targets: &'t HashMap<TargetKey, TargetSnapshot>,
    grants: &AuthorizationCache,
) -> Result<(TargetKey, &'t TargetSnapshot), ResolveError> {
    let key = target_key_of(attachment).ok_or_else(|| {
        ResolveError::InvalidKind(format!(
            "unsupported target kind {}",
            attachment.target_ref.canonical_kind(),
        ))
    })?;

    if !spec.allowed_targets.contains(&key.kind) {
        let supported = spec
            .allowed_targets
            .iter()
            .map(|t| t.kind())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ResolveError::InvalidKind(format!(
            "invalid target kind {}, only {supported} are supported",
            attachment.target_ref.canonical_kind(),
        )));
    }

    if key.namespace != attachment.id.namespace
        && !grants.allowed(
            POLICY_API_GROUP,
            attachment.kind.resource_kind(),
            &attachment.id.namespace,
            key.kind.group(),
            key.kind.kind(),
            &key.namespace,
            &key.name,
        )
    {
        return Err(ResolveError::NoAccess(format!(
            "target {key} is in another namespace and no ReferenceGrant allows the reference",
        )));
    }

    let target = targets
        .get(&key)
        .ok_or_else(|| ResolveError::NotFound(format!("cannot find target {key}")))?;
    Ok((key, target))
}

/// Resolves a Secret reference with the same cross-namespace rule as
/// targets.
pub fn resolve_secret<'s>(
    secret_ref: &SecretObjectReference,
    owner_ns: &str,
    owner_kind: &str,
    secrets: &'s HashMap<ResourceId, SecretSnapshot>,
    grants: &AuthorizationCache,
) -> Result<&'s SecretSnapshot, ResolveError> {
    let ns = secret_ref.namespace.as_deref().unwrap_or(owner_ns);

    if ns != owner_ns
        && !grants.allowed(
            POLICY_API_GROUP,
            owner_kind,
            owner_ns,
            "",
            "Secret",
            ns,
            &secret_ref.name,
        )
    {
        return Err(ResolveError::NoAccess(format!(
            "secret {ns}/{} is in another namespace and no ReferenceGrant allows the reference",
            secret_ref.name,
        )));
    }

    let id = ResourceId::new(ns.to_string(), secret_ref.name.clone());
    secrets
        .get(&id)
        .ok_or_else(|| ResolveError::NotFound(format!("cannot find secret {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use gateway_policy_controller_core::{registry, PolicyKind, TargetKind};
    use gateway_policy_controller_k8s_api::{gateway, policy::NamespacedTargetRef};

    fn attachment(kind: PolicyKind, ns: &str, target: NamespacedTargetRef) -> AttachmentSnapshot {
        AttachmentSnapshot {
            kind,
            id: ResourceId::new(ns.into(), "policy".into()),
            created_at: DateTime::<Utc>::MIN_UTC,
            generation: 1,
            target_ref: target,
            has_default: true,
            selectors: Vec::new(),
            certificate_refs: Vec::new(),
            accepted_condition: None,
        }
    }

    fn service_ref(name: &str, namespace: Option<&str>) -> NamespacedTargetRef {
        NamespacedTargetRef {
            group: None,
            kind: "Service".to_string(),
            name: name.to_string(),
            namespace: namespace.map(Into::into),
        }
    }

    #[test]
    fn resolves_local_target() {
        let spec = registry::lookup("HealthCheck").unwrap();
        let mut targets = HashMap::new();
        targets.insert(
            TargetKey::new(TargetKind::Service, "ns", "svc"),
            TargetSnapshot::default(),
        );

        let attachment = attachment(PolicyKind::HealthCheck, "ns", service_ref("svc", None));
        let (key, _) = resolve_target(
            &attachment,
            spec,
            &targets,
            &AuthorizationCache::default(),
        )
        .expect("reference must resolve");
        assert_eq!(key, TargetKey::new(TargetKind::Service, "ns", "svc"));
    }

    #[test]
    fn missing_target_is_not_found() {
        let spec = registry::lookup("HealthCheck").unwrap();
        let attachment = attachment(
            PolicyKind::HealthCheck,
            "example",
            service_ref("does-not-exist", None),
        );

        let err = resolve_target(
            &attachment,
            spec,
            &HashMap::new(),
            &AuthorizationCache::default(),
        )
        .expect_err("reference must not resolve");
        assert!(matches!(err, ResolveError::NotFound(_)), "{err:?}");
    }

    #[test]
    fn disallowed_target_kind_is_invalid() {
        // HealthCheck cannot attach to a Gateway.
        let spec = registry::lookup("HealthCheck").unwrap();
        let attachment = attachment(
            PolicyKind::HealthCheck,
            "ns",
            NamespacedTargetRef {
                group: Some("gateway.networking.k8s.io".to_string()),
                kind: "Gateway".to_string(),
                name: "gw".to_string(),
                namespace: None,
            },
        );

        let err = resolve_target(
            &attachment,
            spec,
            &HashMap::new(),
            &AuthorizationCache::default(),
        )
        .expect_err("kind must be rejected");
        assert!(matches!(err, ResolveError::InvalidKind(_)), "{err:?}");
    }

    #[test]
    fn cross_namespace_requires_grant() {
        let spec = registry::lookup("HealthCheck").unwrap();
        let mut targets = HashMap::new();
        targets.insert(
            TargetKey::new(TargetKind::Service, "ns-b", "svc"),
            TargetSnapshot::default(),
        );
        let attachment = attachment(
            PolicyKind::HealthCheck,
            "ns-a",
            service_ref("svc", Some("ns-b")),
        );

        let err = resolve_target(&attachment, spec, &targets, &AuthorizationCache::default())
            .expect_err("ungranted cross-namespace reference must be rejected");
        assert!(matches!(err, ResolveError::NoAccess(_)), "{err:?}");

        let mut grants = AuthorizationCache::default();
        grants.apply(
            ResourceId::new("ns-b".into(), "grant".into()),
            &gateway::ReferenceGrant {
                metadata: Default::default(),
                spec: gateway::ReferenceGrantSpec {
                    from: vec![gateway::ReferenceGrantFrom {
                        group: POLICY_API_GROUP.to_string(),
                        kind: "HealthCheckPolicy".to_string(),
                        namespace: "ns-a".to_string(),
                    }],
                    to: vec![gateway::ReferenceGrantTo {
                        group: "".to_string(),
                        kind: "Service".to_string(),
                        name: None,
                    }],
                },
            },
        );

        let (key, _) = resolve_target(&attachment, spec, &targets, &grants)
            .expect("granted reference must resolve");
        assert_eq!(key.namespace, "ns-b");
    }

    #[test]
    fn secret_resolution_checks_namespace_and_presence() {
        let mut secrets = HashMap::new();
        secrets.insert(
            ResourceId::new("ns".into(), "tls-a".into()),
            SecretSnapshot::default(),
        );

        let local = SecretObjectReference {
            name: "tls-a".to_string(),
            namespace: None,
        };
        assert!(resolve_secret(
            &local,
            "ns",
            "UpstreamTLSPolicy",
            &secrets,
            &AuthorizationCache::default(),
        )
        .is_ok());

        let missing = SecretObjectReference {
            name: "tls-b".to_string(),
            namespace: None,
        };
        assert!(matches!(
            resolve_secret(
                &missing,
                "ns",
                "UpstreamTLSPolicy",
                &secrets,
                &AuthorizationCache::default(),
            ),
            Err(ResolveError::NotFound(_))
        ));

        let foreign = SecretObjectReference {
            name: "tls-a".to_string(),
            namespace: Some("other".to_string()),
        };
        assert!(matches!(
            resolve_secret(
                &foreign,
                "ns",
                "UpstreamTLSPolicy",
                &secrets,
                &AuthorizationCache::default(),
            ),
            Err(ResolveError::NoAccess(_))
        ));
    }
}
