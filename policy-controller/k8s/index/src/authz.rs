//! Cache of ReferenceGrant-style authorization records.
//!
//! A grant lives in the namespace of the referenced objects and allows
//! references *from* a class of resources in another namespace *to* a class
//! of local resources, optionally restricted to a single name.

use crate::resource_id::ResourceId;
use ahash::AHashMap as HashMap;
use gateway_policy_controller_k8s_api::gateway;

#[derive(Clone, Debug, Default)]
pub struct AuthorizationCache {
    grants: HashMap<ResourceId, GrantSnapshot>,
}

#[derive(Clone, Debug)]
struct GrantSnapshot {
    namespace: String,
    from: Vec<(String, String, String)>,
    to: Vec<(String, String, Option<String>)>,
}

fn norm_group(group: &str) -> &str {
    if group.eq_ignore_ascii_case("core") {
        ""
    } else {
        group
    }
}

impl AuthorizationCache {
    pub fn apply(&mut self, id: ResourceId, grant: &gateway::ReferenceGrant) {
        let snapshot = GrantSnapshot {
            namespace: id.namespace.clone(),
            from: grant
                .spec
                .from
                .iter()
                .map(|f| (f.group.clone(), f.kind.clone(), f.namespace.clone()))
                .collect(),
            to: grant
                .spec
                .to
                .iter()
                .map(|t| (t.group.clone(), t.kind.clone(), t.name.clone()))
                .collect(),
        };
        self.grants.insert(id, snapshot);
    }

    pub fn delete(&mut self, id: &ResourceId) {
        self.grants.remove(id);
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Whether a reference from `(from_group, from_kind, from_ns)` to the
    /// object `(to_group, to_kind, to_ns, to_name)` is authorized by any
    /// grant in the target namespace.
    #[allow(clippy::too_many_arguments)]
    pub fn allowed(
        &self,
        from_group: &str,
        from_kind: &str,
        from_ns: &str,
        to_group: &str,
        to_kind: &str,
        to_ns: &str,
        to_name: &str,
    ) -> bool {
        self.grants.values().any(|grant| {
            grant.namespace == to_ns
                && grant.from.iter().any(|(g, k, ns)| {
                    norm_group(g).eq_ignore_ascii_case(norm_group(from_group))
                        && k.eq_ignore_ascii_case(from_kind)
                        && ns == from_ns
                })
                && grant.to.iter().any(|(g, k, name)| {
                    norm_group(g).eq_ignore_ascii_case(norm_group(to_group))
                        && k.eq_ignore_ascii_case(to_kind)
                        && name.as_deref().map(|n| n == to_name).unwrap_or(true)
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_policy_controller_k8s_api::POLICY_API_GROUP;

    fn grant(
        from: Vec<(&str, &str, &str)>,
        to: Vec<(&str, &str, Option<&str>)>,
    ) -> gateway::ReferenceGrant {
        gateway::ReferenceGrant {
            metadata: Default::default(),
            spec: gateway::ReferenceGrantSpec {
                from: from
                    .into_iter()
                    .map(|(g, k, n)| gateway::ReferenceGrantFrom {
                        group: g.to_string(),
                        kind: k.to_string(),
                        namespace: n.to_string(),
                    })
                    .collect(),
                to: to
                    .into_iter()
                    .map(|(g, k, n)| gateway::ReferenceGrantTo {
                        group: g.to_string(),
                        kind: k.to_string(),
                        name: n.map(Into::into),
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn allows_matching_cross_namespace_reference() {
        let mut cache = AuthorizationCache::default();
        cache.apply(
            ResourceId::new("ns-b".into(), "grant".into()),
            &grant(
                vec![(POLICY_API_GROUP, "HealthCheckPolicy", "ns-a")],
                vec![("", "Service", None)],
            ),
        );

        assert!(cache.allowed(
            POLICY_API_GROUP,
            "HealthCheckPolicy",
            "ns-a",
            "",
            "Service",
            "ns-b",
            "svc",
        ));
        // Wrong source namespace.
        assert!(!cache.allowed(
            POLICY_API_GROUP,
            "HealthCheckPolicy",
            "ns-c",
            "",
            "Service",
            "ns-b",
            "svc",
        ));
        // Wrong policy kind.
        assert!(!cache.allowed(
            POLICY_API_GROUP,
            "RetryPolicy",
            "ns-a",
            "",
            "Service",
            "ns-b",
            "svc",
        ));
    }

    #[test]
    fn name_restricted_grant_only_allows_that_name() {
        let mut cache = AuthorizationCache::default();
        cache.apply(
            ResourceId::new("ns-b".into(), "grant".into()),
            &grant(
                vec![(POLICY_API_GROUP, "RetryPolicy", "ns-a")],
                vec![("", "Service", Some("svc"))],
            ),
        );

        assert!(cache.allowed(
            POLICY_API_GROUP,
            "RetryPolicy",
            "ns-a",
            "",
            "Service",
            "ns-b",
            "svc",
        ));
        assert!(!cache.allowed(
            POLICY_API_GROUP,
            "RetryPolicy",
            "ns-a",
            "",
            "Service",
            "ns-b",
            "other",
        ));
    }

    #[test]
    fn deleting_a_grant_revokes_access() {
        let mut cache = AuthorizationCache::default();
        let id = ResourceId::new("ns-b".into(), "grant".into());
        cache.apply(
            id.clone(),
            &grant(
                vec![(POLICY_API_GROUP, "RetryPolicy", "ns-a")],
                vec![("", "Service", None)],
            ),
        );
        cache.delete(&id);
        assert!(!cache.allowed(
            POLICY_API_GROUP,
            "RetryPolicy",
            "ns-a",
            "",
            "Service",
            "ns-b",
            "svc",
        ));
    }
}
