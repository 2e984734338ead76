//! Turns one attachment into the set of scopes it claims on its resolved
//! target.

use crate::snapshot::{AttachmentSnapshot, Selector, TargetSnapshot};
use gateway_policy_controller_core::{registry::KindSpec, Scope, TargetKind};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Decomposition {
    pub claims: Vec<Scope>,
    /// Selectors referring to values the target does not declare. Non-fatal:
    /// the attachment still counts if any other claim survives.
    pub dropped: Vec<String>,
}

pub fn decompose(
    spec: &KindSpec,
    target_kind: TargetKind,
    target: &TargetSnapshot,
    attachment: &AttachmentSnapshot,
) -> Decomposition {
    let mut decomposition = Decomposition::default();

    if attachment.has_default {
        decomposition.claims.push(Scope::WholeTarget);
    }

    for selector in &attachment.selectors {
        let scope = match selector {
            Selector::Port { port, .. } => Scope::Port(*port),
            Selector::Hostname { hostname, .. } => Scope::Hostname(hostname.clone()),
            Selector::HttpRouteMatch { key, .. } => Scope::HttpRouteMatch(key.clone()),
            Selector::GrpcRouteMatch { key, .. } => Scope::GrpcRouteMatch(key.clone()),
            Selector::ServicePort { port, .. } => Scope::ServicePort(*port),
        };

        let axis = scope.axis();
        if !spec.scope_axes.contains(&axis) || !axis.applies_to(target_kind) {
            decomposition
                .dropped
                .push(format!("selector {scope} does not apply to {}", target_kind.kind()));
            continue;
        }

        let present = match &scope {
            Scope::WholeTarget => true,
            Scope::Port(port) | Scope::ServicePort(port) => target.ports.contains(port),
            Scope::Hostname(hostname) => target.hostnames.contains(hostname),
            Scope::HttpRouteMatch(key) => target.http_matches.contains(key),
            Scope::GrpcRouteMatch(key) => target.grpc_matches.contains(key),
        };
        if present {
            decomposition.claims.push(scope);
        } else {
            decomposition
                .dropped
                .push(format!("{scope} is not declared by the target"));
        }
    }

    decomposition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_id::ResourceId;
    use chrono::{DateTime, Utc};
    use gateway_policy_controller_core::{registry, PolicyKind};
    use gateway_policy_controller_k8s_api::policy::NamespacedTargetRef;

    fn attachment(
        kind: PolicyKind,
        has_default: bool,
        selectors: Vec<Selector>,
    ) -> AttachmentSnapshot {
        AttachmentSnapshot {
            kind,
            id: ResourceId::new("ns".into(), "policy".into()),
            created_at: DateTime::<Utc>::MIN_UTC,
            generation: 1,
            target_ref: NamespacedTargetRef {
                group: None,
                kind: "Service".to_string(),
                name: "svc".to_string(),
                namespace: None,
            },
            has_default,
            selectors,
            certificate_refs: Vec::new(),
            accepted_condition: None,
        }
    }

    #[test]
    fn default_config_claims_whole_target() {
        let spec = registry::lookup("SessionSticky").unwrap();
        let target = TargetSnapshot {
            ports: vec![80],
            ..Default::default()
        };
        let decomposition = decompose(
            spec,
            TargetKind::Service,
            &target,
            &attachment(PolicyKind::SessionSticky, true, Vec::new()),
        );
        assert_eq!(decomposition.claims, vec![Scope::WholeTarget]);
        assert!(decomposition.dropped.is_empty());
    }

    #[test]
    fn selectors_missing_from_target_are_dropped() {
        let spec = registry::lookup("HealthCheck").unwrap();
        let target = TargetSnapshot {
            ports: vec![8080],
            ..Default::default()
        };
        let decomposition = decompose(
            spec,
            TargetKind::Service,
            &target,
            &attachment(
                PolicyKind::HealthCheck,
                false,
                vec![
                    Selector::ServicePort {
                        port: 8080,
                        has_config: true,
                    },
                    Selector::ServicePort {
                        port: 9090,
                        has_config: true,
                    },
                ],
            ),
        );
        assert_eq!(decomposition.claims, vec![Scope::ServicePort(8080)]);
        assert_eq!(decomposition.dropped.len(), 1);
    }

    #[test]
    fn all_dropped_without_default_leaves_no_claims() {
        let spec = registry::lookup("HealthCheck").unwrap();
        let target = TargetSnapshot::default();
        let decomposition = decompose(
            spec,
            TargetKind::Service,
            &target,
            &attachment(
                PolicyKind::HealthCheck,
                false,
                vec![Selector::ServicePort {
                    port: 9090,
                    has_config: true,
                }],
            ),
        );
        assert!(decomposition.claims.is_empty());
        assert_eq!(decomposition.dropped.len(), 1);
    }

    #[test]
    fn axis_not_applicable_to_target_is_dropped() {
        // A hostname selector is meaningless on a Gateway target.
        let spec = registry::lookup("AccessControl").unwrap();
        let target = TargetSnapshot {
            ports: vec![80],
            ..Default::default()
        };
        let decomposition = decompose(
            spec,
            TargetKind::Gateway,
            &target,
            &attachment(
                PolicyKind::AccessControl,
                false,
                vec![
                    Selector::Port {
                        port: 80,
                        has_config: true,
                    },
                    Selector::Hostname {
                        hostname: "api.example.com".to_string(),
                        has_config: true,
                    },
                ],
            ),
        );
        assert_eq!(decomposition.claims, vec![Scope::Port(80)]);
        assert_eq!(decomposition.dropped.len(), 1);
    }

    #[test]
    fn route_match_claims_use_canonical_keys() {
        let spec = registry::lookup("RateLimit").unwrap();
        let key = r#"{"path":{"type":"Exact","value":"/v1"}}"#.to_string();
        let target = TargetSnapshot {
            hostnames: vec!["api.example.com".to_string()],
            http_matches: vec![key.clone()],
            ..Default::default()
        };
        let decomposition = decompose(
            spec,
            TargetKind::HttpRoute,
            &target,
            &attachment(
                PolicyKind::RateLimit,
                false,
                vec![Selector::HttpRouteMatch {
                    key: key.clone(),
                    has_config: true,
                }],
            ),
        );
        assert_eq!(decomposition.claims, vec![Scope::HttpRouteMatch(key)]);
    }
}
